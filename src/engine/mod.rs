//! Run orchestration: quote preparation, canonical keys, market aggregates,
//! matching and scoring for one batch of inputs.
//!
//! A run is a pure transformation. Each call receives its own configuration
//! and data; nothing is shared between runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::canonical::{normalize_name, normalize_team, projection_key, quote_key};
use crate::matching::overrides::OverrideTable;
use crate::matching::{MatchConfig, Matcher};
use crate::strategy::aggregate::MarketBook;
use crate::strategy::{EdgeScorer, Guardrails, ScoringConfig, SkipReason};
use crate::types::{CanonicalKey, EdgeRecord, Keyed, OddsQuote, ProjectionRecord};

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub projections: usize,
    pub quotes_in: usize,
    pub quotes_prepared: usize,
    pub positions_backfilled: usize,
    pub market_groups: usize,
    pub matched_exact: usize,
    pub matched_manual: usize,
    pub matched_fuzzy: usize,
    pub unmatched: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub edges: usize,
}

impl RunReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projections={} quotes={} prepared={} matched={}/{}/{} (exact/manual/fuzzy) unmatched={} skipped={} edges={}",
            self.projections,
            self.quotes_in,
            self.quotes_prepared,
            self.matched_exact,
            self.matched_manual,
            self.matched_fuzzy,
            self.unmatched,
            self.skipped_total(),
            self.edges,
        )
    }
}

/// Result of a run: ranked edges, quotes nothing matched, and counters.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub edges: Vec<EdgeRecord>,
    pub unmatched: Vec<OddsQuote>,
    pub report: RunReport,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct EdgeEngine {
    scorer: EdgeScorer,
    matcher: Matcher,
}

impl EdgeEngine {
    pub fn new(scoring: ScoringConfig, matching: MatchConfig) -> Self {
        Self::with_matcher(scoring, Matcher::new(matching))
    }

    pub fn with_matcher(scoring: ScoringConfig, matcher: Matcher) -> Self {
        Self {
            scorer: EdgeScorer::new(scoring),
            matcher,
        }
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        self.scorer.config()
    }

    /// Reconcile quotes against projections and return ranked edges.
    pub fn run(
        &self,
        projections: &[ProjectionRecord],
        quotes: &[OddsQuote],
        overrides: &OverrideTable,
    ) -> RunOutput {
        let mut report = RunReport {
            projections: projections.len(),
            quotes_in: quotes.len(),
            ..RunReport::default()
        };

        let mut prepared = prepare_quotes(quotes, &self.scorer.config().guardrails, &mut report);
        report.positions_backfilled = backfill_positions(&mut prepared, projections);
        report.quotes_prepared = prepared.len();

        let projection_keys: Vec<CanonicalKey> = projections.iter().map(projection_key).collect();
        let quote_keys: Vec<CanonicalKey> = prepared.iter().map(quote_key).collect();

        let book = MarketBook::build(quote_keys.iter().zip(&prepared));
        report.market_groups = book.len();

        let keyed_projections: Vec<Keyed<'_, ProjectionRecord>> = projections
            .iter()
            .zip(&projection_keys)
            .map(|(record, key)| Keyed { key, record })
            .collect();
        let keyed_quotes: Vec<Keyed<'_, OddsQuote>> = prepared
            .iter()
            .zip(&quote_keys)
            .map(|(record, key)| Keyed { key, record })
            .collect();

        let matched = self
            .matcher
            .match_quotes(&keyed_projections, &keyed_quotes, overrides);
        report.matched_exact = matched.stats.exact;
        report.matched_manual = matched.stats.manual;
        report.matched_fuzzy = matched.stats.fuzzy;
        report.unmatched = matched.stats.unmatched;

        let scored = self.scorer.score_all(&matched.pairs, &book);
        for (reason, count) in scored.skipped {
            *report.skipped.entry(reason).or_insert(0) += count;
        }
        report.edges = scored.edges.len();

        info!(
            projections = report.projections,
            quotes_in = report.quotes_in,
            prepared = report.quotes_prepared,
            exact = report.matched_exact,
            manual = report.matched_manual,
            fuzzy = report.matched_fuzzy,
            unmatched = report.unmatched,
            skipped = report.skipped_total(),
            edges = report.edges,
            "Run complete"
        );

        RunOutput {
            edges: scored.edges,
            unmatched: matched.unmatched.into_iter().cloned().collect(),
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// Quote preparation
// ---------------------------------------------------------------------------

/// Drop quotes outside the price band, from excluded books, or on markets
/// the model does not cover. Survivors keep input order.
fn prepare_quotes(
    quotes: &[OddsQuote],
    guardrails: &Guardrails,
    report: &mut RunReport,
) -> Vec<OddsQuote> {
    let mut prepared = Vec::with_capacity(quotes.len());
    for quote in quotes {
        let reason = if !guardrails.price_in_range(quote.price) {
            Some(SkipReason::PriceOutOfRange)
        } else if guardrails.is_excluded_book(&quote.bookmaker) {
            Some(SkipReason::ExcludedBook)
        } else if quote.market_kind().is_none() {
            Some(SkipReason::UnsupportedMarket)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                debug!(quote = %quote, %reason, "Quote dropped during preparation");
                report.skip(reason);
            }
            None => prepared.push(quote.clone()),
        }
    }
    prepared
}

/// Fill blank quote positions from the first projection with the same
/// normalised player and team. Returns how many quotes were filled.
fn backfill_positions(quotes: &mut [OddsQuote], projections: &[ProjectionRecord]) -> usize {
    let mut lookup: HashMap<(String, String), &str> = HashMap::new();
    for projection in projections {
        lookup
            .entry((normalize_name(&projection.player), normalize_team(&projection.team)))
            .or_insert(projection.position.as_str());
    }

    let mut filled = 0;
    for quote in quotes.iter_mut() {
        let blank = quote.position.as_deref().map_or(true, |p| p.trim().is_empty());
        if !blank {
            continue;
        }
        let key = (normalize_name(&quote.player), normalize_team(&quote.team));
        if let Some(position) = lookup.get(&key) {
            quote.position = Some((*position).to_string());
            filled += 1;
        }
    }
    filled
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
