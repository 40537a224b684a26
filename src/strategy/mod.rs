//! Scoring pipeline: market-quality gates, outcome model, EV, Kelly sizing,
//! injury adjustment and tiering for matched quotes.

pub mod aggregate;
pub mod kelly;
pub mod odds;
pub mod probability;
pub mod tier;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{EdgeRecord, MatchedPair};
use aggregate::MarketBook;
use kelly::{BankrollConfig, KellyCalculator};
use tier::TierThresholds;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Market-quality guardrails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guardrails {
    /// Shortest acceptable American price.
    pub odds_min: i32,
    /// Longest acceptable American price.
    pub odds_max: i32,
    /// Minimum distinct books posting the prop.
    pub min_books: usize,
    /// Maximum combined hold of the best two-way prices.
    pub max_vig: f64,
    /// Bookmaker titles containing this (case-insensitive) are ignored.
    /// Empty disables the filter.
    pub excluded_book_keyword: String,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            odds_min: -200,
            odds_max: 500,
            min_books: 3,
            max_vig: 0.06,
            excluded_book_keyword: "boost".to_string(),
        }
    }
}

impl Guardrails {
    pub fn price_in_range(&self, price: i32) -> bool {
        (self.odds_min..=self.odds_max).contains(&price)
    }

    pub fn is_excluded_book(&self, title: &str) -> bool {
        let keyword = self.excluded_book_keyword.trim().to_lowercase();
        !keyword.is_empty() && title.to_lowercase().contains(&keyword)
    }
}

/// What an injury designation means for a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjuryAction {
    Play,
    Caution,
    Drop,
}

/// Injury statuses that drop a quote or shrink its stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjuryPolicy {
    pub drop: Vec<String>,
    pub caution: Vec<String>,
    /// Multiplier applied to Kelly fraction and units under caution.
    pub caution_factor: f64,
}

impl Default for InjuryPolicy {
    fn default() -> Self {
        Self {
            drop: vec!["OUT".into(), "SUSP".into()],
            caution: vec!["Q".into(), "D".into()],
            caution_factor: 0.5,
        }
    }
}

impl InjuryPolicy {
    pub fn action(&self, status: &str) -> InjuryAction {
        let status = status.trim();
        let listed = |set: &[String]| set.iter().any(|s| s.trim().eq_ignore_ascii_case(status));
        if listed(&self.drop) {
            InjuryAction::Drop
        } else if listed(&self.caution) {
            InjuryAction::Caution
        } else {
            InjuryAction::Play
        }
    }
}

/// Everything the scorer needs for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub guardrails: Guardrails,
    pub thresholds: TierThresholds,
    pub bankroll: BankrollConfig,
    pub injury: InjuryPolicy,
}

// ---------------------------------------------------------------------------
// Skip reasons
// ---------------------------------------------------------------------------

/// Why a quote produced no edge. Skips are counted and logged, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("market not supported")]
    UnsupportedMarket,
    #[error("price outside accepted range")]
    PriceOutOfRange,
    #[error("excluded bookmaker")]
    ExcludedBook,
    #[error("projection has no mean/spread for market")]
    MissingProjection,
    #[error("line is not a number")]
    InvalidLine,
    #[error("too few books")]
    InsufficientBooks,
    #[error("hold above maximum")]
    ExcessiveVig,
    #[error("invalid price")]
    InvalidPrice,
    #[error("model probability undefined")]
    UndefinedProbability,
    #[error("injury status excludes player")]
    InjuryDrop,
}

/// Scored edges (best EV first) and per-reason skip counts.
#[derive(Debug, Clone, Default)]
pub struct ScoreOutcome {
    pub edges: Vec<EdgeRecord>,
    pub skipped: BTreeMap<SkipReason, usize>,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct EdgeScorer {
    config: ScoringConfig,
    kelly: KellyCalculator,
}

impl EdgeScorer {
    pub fn new(config: ScoringConfig) -> Self {
        let kelly = KellyCalculator::new(config.bankroll.clone());
        Self { config, kelly }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every matched pair and rank the survivors by descending EV.
    /// Ties keep matched-pair order.
    pub fn score_all(&self, pairs: &[MatchedPair<'_>], book: &MarketBook) -> ScoreOutcome {
        let mut outcome = ScoreOutcome::default();
        for pair in pairs {
            match self.score(pair, book) {
                Ok(edge) => outcome.edges.push(edge),
                Err(reason) => {
                    debug!(
                        player = %pair.quote.player,
                        market = %pair.quote.market,
                        side = %pair.quote.side,
                        book = %pair.quote.bookmaker,
                        %reason,
                        "Quote skipped"
                    );
                    *outcome.skipped.entry(reason).or_insert(0) += 1;
                }
            }
        }

        outcome.edges.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));

        info!(
            pairs_in = pairs.len(),
            edges = outcome.edges.len(),
            skipped = pairs.len() - outcome.edges.len(),
            "Scoring complete"
        );
        outcome
    }

    /// Score a single matched quote.
    pub fn score(&self, pair: &MatchedPair<'_>, book: &MarketBook) -> Result<EdgeRecord, SkipReason> {
        let quote = pair.quote;
        let projection = pair.projection;

        // 1. projection fields for the market
        let market = quote.market_kind().ok_or(SkipReason::UnsupportedMarket)?;
        let stat = projection.stats.get(market);
        let (mean, sd) = match (stat.mean, stat.sd) {
            (Some(mean), Some(sd)) if !mean.is_nan() && !sd.is_nan() => (mean, sd),
            _ => return Err(SkipReason::MissingProjection),
        };
        if !quote.line.is_finite() {
            return Err(SkipReason::InvalidLine);
        }

        // 2. market-quality gates
        let quality = book
            .quality(pair.quote_key, market)
            .ok_or(SkipReason::InsufficientBooks)?;
        if quality.book_count < self.config.guardrails.min_books {
            return Err(SkipReason::InsufficientBooks);
        }
        if quality.vig > self.config.guardrails.max_vig {
            return Err(SkipReason::ExcessiveVig);
        }

        // 3. price
        let implied_prob = odds::implied_probability(quote.price).ok_or(SkipReason::InvalidPrice)?;
        let payout = odds::payout_multiple(quote.price).ok_or(SkipReason::InvalidPrice)?;

        // 4-6. model probability, EV, z
        let model_prob = probability::side_probability(quote.side, mean, sd, quote.line)
            .ok_or(SkipReason::UndefinedProbability)?
            .clamp(0.0, 1.0);
        let expected_value = odds::expected_value(model_prob, payout);
        let z_score = probability::z_score(quote.side, mean, sd, quote.line);

        // 7-10. injury and stake
        let injury = self.config.injury.action(&projection.injury_status);
        if injury == InjuryAction::Drop {
            return Err(SkipReason::InjuryDrop);
        }
        let mut stake = self.kelly.size(model_prob, payout);
        if injury == InjuryAction::Caution {
            stake = stake.scaled(self.config.injury.caution_factor);
        }

        // 11. tier
        let tier = self.config.thresholds.classify(expected_value, z_score, market);

        let player = if quote.player.trim().is_empty() { &projection.player } else { &quote.player };
        let team = if quote.team.trim().is_empty() { &projection.team } else { &quote.team };
        let position = if projection.position.trim().is_empty() {
            quote.position.clone().unwrap_or_default()
        } else {
            projection.position.clone()
        };

        Ok(EdgeRecord {
            player: player.trim().to_string(),
            team: team.trim().to_string(),
            position: position.trim().to_string(),
            market: market.key().to_string(),
            side: quote.side,
            line: quote.line,
            proj_mean: mean,
            proj_sd: sd,
            price: quote.price,
            implied_prob,
            model_prob,
            expected_value,
            z_score,
            kelly_raw: stake.kelly_raw,
            kelly_fraction: stake.kelly_fraction,
            unit_size: stake.units,
            bookmaker: quote.bookmaker.clone(),
            event_id: quote.event_id.clone(),
            event_start: quote.event_start.clone(),
            injury_status: projection.injury_status.clone(),
            match_method: pair.method,
            match_score: pair.score,
            tier,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
