//! Quote-to-projection matching.
//!
//! Quotes sharing a canonical triple form one identity (every book and both
//! sides for the same listed player). Each identity resolves to at most one
//! projection through three phases, in priority order:
//!
//! 1. exact triple join,
//! 2. manual overrides,
//! 3. fuzzy name similarity within the same team and position bucket.
//!
//! Exact matches never consume a projection. Manual and fuzzy matches do, so
//! a projection claimed that way is unavailable to any other identity.
//! Matching never fails; it only narrows the set of quotes that get scored.

pub mod overrides;
pub mod similarity;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    CanonicalKey, Keyed, MatchMethod, MatchedPair, OddsQuote, ProjectionRecord,
    CERTAIN_MATCH_SCORE,
};
use overrides::OverrideTable;
use similarity::{Similarity, SimilarityKind};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Run-scoped matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum similarity (0..=100) for a fuzzy match.
    pub fuzzy_cutoff: f64,
    pub similarity: SimilarityKind,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: 90.0,
            similarity: SimilarityKind::TokenSort,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-quote counts by resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub exact: usize,
    pub manual: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
}

impl MatchStats {
    fn record(&mut self, method: Option<MatchMethod>) {
        match method {
            Some(MatchMethod::Exact) => self.exact += 1,
            Some(MatchMethod::Manual) => self.manual += 1,
            Some(MatchMethod::Fuzzy) => self.fuzzy += 1,
            None => self.unmatched += 1,
        }
    }
}

/// Matched pairs in quote input order plus the quotes nothing claimed.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome<'a> {
    pub pairs: Vec<MatchedPair<'a>>,
    pub unmatched: Vec<&'a OddsQuote>,
    pub stats: MatchStats,
}

#[derive(Debug, Clone, Copy)]
struct Resolution {
    projection: usize,
    method: MatchMethod,
    score: f64,
}

/// Distinct canonical triples among the quotes, in first-seen order.
struct Identities<'k> {
    keys: Vec<&'k CanonicalKey>,
    /// Identity index of each quote.
    of_quote: Vec<usize>,
}

impl<'k> Identities<'k> {
    fn group<T>(quotes: &[Keyed<'k, T>]) -> Self {
        let mut index: HashMap<&'k CanonicalKey, usize> = HashMap::new();
        let mut keys = Vec::new();
        let mut of_quote = Vec::with_capacity(quotes.len());
        for quote in quotes {
            let id = *index.entry(quote.key).or_insert_with(|| {
                keys.push(quote.key);
                keys.len() - 1
            });
            of_quote.push(id);
        }
        Self { keys, of_quote }
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

pub struct Matcher {
    config: MatchConfig,
    similarity: Box<dyn Similarity>,
}

impl Matcher {
    /// Matcher using the configured similarity algorithm.
    pub fn new(config: MatchConfig) -> Self {
        let similarity = config.similarity.build();
        Self { config, similarity }
    }

    /// Matcher with an explicit scorer.
    pub fn with_similarity(config: MatchConfig, similarity: Box<dyn Similarity>) -> Self {
        Self { config, similarity }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Bind quotes to projections. Pairs come back in quote input order.
    pub fn match_quotes<'a>(
        &self,
        projections: &[Keyed<'a, ProjectionRecord>],
        quotes: &[Keyed<'a, OddsQuote>],
        overrides: &OverrideTable,
    ) -> MatchOutcome<'a> {
        let identities = Identities::group(quotes);
        let mut resolved: Vec<Option<Resolution>> = vec![None; identities.keys.len()];

        // First projection per triple wins.
        let mut by_triple: HashMap<&CanonicalKey, usize> = HashMap::new();
        for (idx, projection) in projections.iter().enumerate() {
            by_triple.entry(projection.key).or_insert(idx);
        }

        self.exact_phase(&identities, &by_triple, &mut resolved);

        let mut claimed: HashSet<usize> = HashSet::new();
        self.manual_phase(&identities, &by_triple, overrides, &mut claimed, &mut resolved);
        self.fuzzy_phase(&identities, projections, &mut claimed, &mut resolved);

        let mut outcome = MatchOutcome::default();
        for (quote, identity) in quotes.iter().zip(&identities.of_quote) {
            let resolution = resolved[*identity];
            outcome.stats.record(resolution.map(|r| r.method));
            match resolution {
                Some(r) => outcome.pairs.push(MatchedPair {
                    projection: projections[r.projection].record,
                    quote: quote.record,
                    quote_key: quote.key,
                    method: r.method,
                    score: r.score,
                }),
                None => outcome.unmatched.push(quote.record),
            }
        }
        outcome
    }

    fn exact_phase(
        &self,
        identities: &Identities<'_>,
        by_triple: &HashMap<&CanonicalKey, usize>,
        resolved: &mut [Option<Resolution>],
    ) {
        for (id, key) in identities.keys.iter().enumerate() {
            if let Some(&projection) = by_triple.get(*key) {
                resolved[id] = Some(Resolution {
                    projection,
                    method: MatchMethod::Exact,
                    score: CERTAIN_MATCH_SCORE,
                });
            }
        }
    }

    fn manual_phase(
        &self,
        identities: &Identities<'_>,
        by_triple: &HashMap<&CanonicalKey, usize>,
        overrides: &OverrideTable,
        claimed: &mut HashSet<usize>,
        resolved: &mut [Option<Resolution>],
    ) {
        if overrides.is_empty() {
            return;
        }
        let rules = overrides.resolved();
        for (id, key) in identities.keys.iter().enumerate() {
            if resolved[id].is_some() {
                continue;
            }
            let target = rules
                .iter()
                .filter(|(left, _)| left == *key)
                .filter_map(|(_, right)| by_triple.get(right).copied())
                .find(|projection| !claimed.contains(projection));

            if let Some(projection) = target {
                debug!(quote_key = %key, projection, "Manual override applied");
                claimed.insert(projection);
                resolved[id] = Some(Resolution {
                    projection,
                    method: MatchMethod::Manual,
                    score: CERTAIN_MATCH_SCORE,
                });
            }
        }
    }

    fn fuzzy_phase(
        &self,
        identities: &Identities<'_>,
        projections: &[Keyed<'_, ProjectionRecord>],
        claimed: &mut HashSet<usize>,
        resolved: &mut [Option<Resolution>],
    ) {
        let mut buckets: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
        for (idx, projection) in projections.iter().enumerate() {
            buckets
                .entry((projection.key.team.as_str(), projection.key.position.as_str()))
                .or_default()
                .push(idx);
        }

        for (id, key) in identities.keys.iter().enumerate() {
            if resolved[id].is_some() || key.team.is_empty() || key.position.is_empty() {
                continue;
            }
            let Some(bucket) = buckets.get(&(key.team.as_str(), key.position.as_str())) else {
                continue;
            };

            let mut best: Option<(usize, f64)> = None;
            for &candidate in bucket.iter().filter(|idx| !claimed.contains(*idx)) {
                let score = self
                    .similarity
                    .similarity(&key.player, &projections[candidate].key.player);
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((candidate, score));
                }
            }

            match best {
                Some((projection, score)) if score >= self.config.fuzzy_cutoff => {
                    debug!(
                        quote_key = %key,
                        matched = %projections[projection].key,
                        score = format!("{score:.1}"),
                        "Fuzzy match"
                    );
                    claimed.insert(projection);
                    resolved[id] = Some(Resolution {
                        projection,
                        method: MatchMethod::Fuzzy,
                        score,
                    });
                }
                Some((_, score)) => {
                    debug!(quote_key = %key, best = format!("{score:.1}"), "Fuzzy match below cutoff");
                }
                None => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
