//! Shared types for PROPEDGE.
//!
//! The data model used across ingestion, matching, scoring and reporting.
//! Records are immutable once constructed; everything downstream of the
//! input boundary works with these typed values rather than raw rows.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// A supported player-prop market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    PassYds,
    PassTds,
    PassInt,
    RushYds,
    RushTds,
    Receptions,
    ReceptionYds,
    ReceptionTds,
}

impl Market {
    /// All supported markets (useful for iteration).
    pub const ALL: &'static [Market] = &[
        Market::PassYds,
        Market::PassTds,
        Market::PassInt,
        Market::RushYds,
        Market::RushTds,
        Market::Receptions,
        Market::ReceptionYds,
        Market::ReceptionTds,
    ];

    /// Canonical market key, e.g. `pass_yds`.
    pub fn key(&self) -> &'static str {
        match self {
            Market::PassYds => "pass_yds",
            Market::PassTds => "pass_tds",
            Market::PassInt => "pass_int",
            Market::RushYds => "rush_yds",
            Market::RushTds => "rush_tds",
            Market::Receptions => "receptions",
            Market::ReceptionYds => "reception_yds",
            Market::ReceptionTds => "reception_tds",
        }
    }

    /// Market identifier as requested from the odds provider.
    pub fn provider_key(&self) -> String {
        match self {
            Market::PassInt => "player_pass_interceptions".to_string(),
            other => format!("player_{}", other.key()),
        }
    }

    /// Projection column holding the mean for this market. The spread
    /// column is the same name with an `_sd` suffix.
    pub fn projection_column(&self) -> &'static str {
        match self {
            Market::PassYds => "pass_yds",
            Market::PassTds => "pass_tds",
            Market::PassInt => "pass_int",
            Market::RushYds => "rush_yds",
            Market::RushTds => "rush_tds",
            Market::Receptions => "rec",
            Market::ReceptionYds => "rec_yds",
            Market::ReceptionTds => "rec_tds",
        }
    }

    /// Yardage markets use their own z-score thresholds.
    pub fn is_yardage(&self) -> bool {
        matches!(self, Market::PassYds | Market::RushYds | Market::ReceptionYds)
    }

    /// Resolve a bookmaker market identifier (`player_pass_yds`,
    /// `Pass Yds`, `player_pass_interceptions`, ...) to a supported market.
    pub fn from_key(raw: &str) -> Option<Market> {
        let mut key = raw.trim().to_lowercase().replace(' ', "_");
        if let Some(stripped) = key.strip_prefix("player_") {
            key = stripped.to_string();
        }
        match key.as_str() {
            "pass_yds" => Some(Market::PassYds),
            "pass_tds" => Some(Market::PassTds),
            "pass_int" | "pass_interceptions" => Some(Market::PassInt),
            "rush_yds" => Some(Market::RushYds),
            "rush_tds" => Some(Market::RushTds),
            "receptions" => Some(Market::Receptions),
            "reception_yds" => Some(Market::ReceptionYds),
            "reception_tds" => Some(Market::ReceptionTds),
            _ => None,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Wagered side of a two-way prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Over => Side::Under,
            Side::Under => Side::Over,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => write!(f, "over"),
            Side::Under => write!(f, "under"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "over" => Ok(Side::Over),
            "under" => Ok(Side::Under),
            _ => Err(anyhow::anyhow!("Unknown side: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Projected (mean, standard deviation) pair for one stat category.
/// Either half may be missing when the source left the cell blank.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatLine {
    pub mean: Option<f64>,
    pub sd: Option<f64>,
}

impl StatLine {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean: Some(mean), sd: Some(sd) }
    }
}

/// Per-market projections for a single player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionStats {
    pub pass_yds: StatLine,
    pub pass_tds: StatLine,
    pub pass_int: StatLine,
    pub rush_yds: StatLine,
    pub rush_tds: StatLine,
    pub rec: StatLine,
    pub rec_yds: StatLine,
    pub rec_tds: StatLine,
}

impl ProjectionStats {
    /// The stat line backing a market.
    pub fn get(&self, market: Market) -> StatLine {
        match market {
            Market::PassYds => self.pass_yds,
            Market::PassTds => self.pass_tds,
            Market::PassInt => self.pass_int,
            Market::RushYds => self.rush_yds,
            Market::RushTds => self.rush_tds,
            Market::Receptions => self.rec,
            Market::ReceptionYds => self.rec_yds,
            Market::ReceptionTds => self.rec_tds,
        }
    }

    pub fn set(&mut self, market: Market, line: StatLine) {
        let slot = match market {
            Market::PassYds => &mut self.pass_yds,
            Market::PassTds => &mut self.pass_tds,
            Market::PassInt => &mut self.pass_int,
            Market::RushYds => &mut self.rush_yds,
            Market::RushTds => &mut self.rush_tds,
            Market::Receptions => &mut self.rec,
            Market::ReceptionYds => &mut self.rec_yds,
            Market::ReceptionTds => &mut self.rec_tds,
        };
        *slot = line;
    }

    /// Builder-style setter, handy for fixtures.
    pub fn with(mut self, market: Market, mean: f64, sd: f64) -> Self {
        self.set(market, StatLine::new(mean, sd));
        self
    }
}

/// Injury designation used when the source omits one.
pub const DEFAULT_INJURY_STATUS: &str = "OK";

/// One player's projection from one source for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub player: String,
    pub team: String,
    pub position: String,
    /// Source-specific player identifier.
    pub source_id: String,
    pub season_year: i32,
    pub week: u32,
    /// Averaging methodology label (mean, median, ...).
    pub avg_type: String,
    pub stats: ProjectionStats,
    pub injury_status: String,
}

impl ProjectionRecord {
    /// Minimal record with an empty stat table and a healthy status.
    pub fn new(player: &str, team: &str, position: &str) -> Self {
        Self {
            player: player.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            source_id: String::new(),
            season_year: 0,
            week: 0,
            avg_type: "mean".to_string(),
            stats: ProjectionStats::default(),
            injury_status: DEFAULT_INJURY_STATUS.to_string(),
        }
    }

    pub fn with_stat(mut self, market: Market, mean: f64, sd: f64) -> Self {
        self.stats.set(market, StatLine::new(mean, sd));
        self
    }

    pub fn with_injury(mut self, status: &str) -> Self {
        self.injury_status = status.to_string();
        self
    }
}

impl fmt::Display for ProjectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}) [{} wk{} {}] status={}",
            self.player,
            self.team,
            self.position,
            self.season_year,
            self.week,
            self.avg_type,
            self.injury_status,
        )
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// A single bookmaker price on one side of a player prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub event_id: String,
    pub event_start: String,
    /// Player name as listed by the book.
    pub player: String,
    pub team: String,
    /// Books rarely list positions; filled from projections when absent.
    pub position: Option<String>,
    /// Market identifier as listed by the book.
    pub market: String,
    pub side: Side,
    pub line: f64,
    /// American-format price.
    pub price: i32,
    pub bookmaker: String,
    pub last_update: String,
}

impl OddsQuote {
    /// The supported market this quote prices, if any.
    pub fn market_kind(&self) -> Option<Market> {
        Market::from_key(&self.market)
    }
}

impl fmt::Display for OddsQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) {} {} {} @ {}{}",
            self.bookmaker,
            self.player,
            self.team,
            self.market,
            self.side,
            self.line,
            if self.price > 0 { "+" } else { "" },
            self.price,
        )
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Normalised (player, team, position) join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub player: String,
    pub team: String,
    pub position: String,
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.player, self.team, self.position)
    }
}

/// A record paired with its canonical key.
#[derive(Debug, Clone, Copy)]
pub struct Keyed<'a, T> {
    pub key: &'a CanonicalKey,
    pub record: &'a T,
}

/// How a quote was bound to its projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Manual,
    Fuzzy,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Exact => write!(f, "exact"),
            MatchMethod::Manual => write!(f, "manual"),
            MatchMethod::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Score assigned to exact and manual matches.
pub const CERTAIN_MATCH_SCORE: f64 = 100.0;

/// A quote bound to a projection.
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair<'a> {
    pub projection: &'a ProjectionRecord,
    pub quote: &'a OddsQuote,
    /// The quote's own canonical key (market-group lookups use it).
    pub quote_key: &'a CanonicalKey,
    pub method: MatchMethod,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Scored output
// ---------------------------------------------------------------------------

/// Recommendation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Pass,
    Shortlist,
    Recommend,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Pass => write!(f, "PASS"),
            Tier::Shortlist => write!(f, "SHORTLIST"),
            Tier::Recommend => write!(f, "RECOMMEND"),
        }
    }
}

/// A fully scored quote. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub player: String,
    pub team: String,
    pub position: String,
    pub market: String,
    pub side: Side,
    pub line: f64,
    pub proj_mean: f64,
    pub proj_sd: f64,
    #[serde(rename = "price_american")]
    pub price: i32,
    pub implied_prob: f64,
    #[serde(rename = "prob_model")]
    pub model_prob: f64,
    #[serde(rename = "ev_per_dollar")]
    pub expected_value: f64,
    pub z_score: f64,
    /// Full-Kelly fraction before scaling and injury adjustment.
    pub kelly_raw: f64,
    /// Scaled, injury-adjusted Kelly fraction.
    pub kelly_fraction: f64,
    pub unit_size: f64,
    #[serde(rename = "bookmaker_title")]
    pub bookmaker: String,
    pub event_id: String,
    pub event_start: String,
    pub injury_status: String,
    pub match_method: MatchMethod,
    pub match_score: f64,
    pub tier: Tier,
}

impl fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} @ {}{} | model={:.1}% implied={:.1}% ev={:+.1}% z={:.2} | kelly={:.2}% units={:.2} | {} [{}]",
            self.player,
            self.market,
            self.side,
            self.line,
            if self.price > 0 { "+" } else { "" },
            self.price,
            self.model_prob * 100.0,
            self.implied_prob * 100.0,
            self.expected_value * 100.0,
            self.z_score,
            self.kelly_fraction * 100.0,
            self.unit_size,
            self.bookmaker,
            self.tier,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural input failures. These abort a run; per-record problems are
/// skips, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PropError {
    #[error("Missing required {table} columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Invalid {table} value in row {row}, column '{column}': {value:?}")]
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("No {0} records found")]
    EmptyTable(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_from_provider_keys() {
        assert_eq!(Market::from_key("player_pass_yds"), Some(Market::PassYds));
        assert_eq!(Market::from_key(" Player_Reception_Yds "), Some(Market::ReceptionYds));
        assert_eq!(Market::from_key("player_pass_interceptions"), Some(Market::PassInt));
        assert_eq!(Market::from_key("pass int"), Some(Market::PassInt));
        assert_eq!(Market::from_key("player_goal_scorer_anytime"), None);
        assert_eq!(Market::from_key(""), None);
    }

    #[test]
    fn test_market_provider_key_roundtrip() {
        for market in Market::ALL {
            assert_eq!(Market::from_key(&market.provider_key()), Some(*market));
        }
    }

    #[test]
    fn test_market_yardage_partition() {
        let yardage: Vec<_> = Market::ALL.iter().filter(|m| m.is_yardage()).collect();
        assert_eq!(yardage, vec![&Market::PassYds, &Market::RushYds, &Market::ReceptionYds]);
    }

    #[test]
    fn test_side_parse_and_display() {
        assert_eq!(" OVER ".parse::<Side>().unwrap(), Side::Over);
        assert_eq!("under".parse::<Side>().unwrap(), Side::Under);
        assert!("yes".parse::<Side>().is_err());
        assert_eq!(Side::Over.to_string(), "over");
        assert_eq!(Side::Over.opposite(), Side::Under);
    }

    #[test]
    fn test_projection_stats_lookup() {
        let stats = ProjectionStats::default().with(Market::Receptions, 5.5, 1.2);
        assert_eq!(stats.get(Market::Receptions), StatLine::new(5.5, 1.2));
        assert_eq!(stats.get(Market::PassYds), StatLine::default());
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Recommend).unwrap(), "\"RECOMMEND\"");
        assert_eq!(Tier::Shortlist.to_string(), "SHORTLIST");
        assert!(Tier::Recommend > Tier::Pass);
    }

    #[test]
    fn test_missing_columns_message_names_columns() {
        let err = PropError::MissingColumns {
            table: "projection".into(),
            columns: vec!["rec_sd".into(), "week".into()],
        };
        assert_eq!(err.to_string(), "Missing required projection columns: rec_sd, week");
    }
}
