//! Export layer.
//!
//! Writes the ranked edge table and the unmatched-quote artifact as CSV.
//! The unmatched file uses the odds input columns, so a reviewed copy can be
//! fed straight back in as odds.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::odds::REQUIRED_ODDS_COLUMNS;
use crate::types::{EdgeRecord, OddsQuote, Side};

/// Edge table columns, in serialisation order.
pub const EDGE_COLUMNS: &[&str] = &[
    "player",
    "team",
    "position",
    "market",
    "side",
    "line",
    "proj_mean",
    "proj_sd",
    "price_american",
    "implied_prob",
    "prob_model",
    "ev_per_dollar",
    "z_score",
    "kelly_raw",
    "kelly_fraction",
    "unit_size",
    "bookmaker_title",
    "event_id",
    "event_start",
    "injury_status",
    "match_method",
    "match_score",
    "tier",
];

/// Flat odds row for the unmatched artifact.
#[derive(Debug, Serialize)]
struct UnmatchedRow<'a> {
    event_id: &'a str,
    event_start: &'a str,
    player: &'a str,
    team: &'a str,
    position: &'a str,
    market: &'a str,
    side: Side,
    line: f64,
    price_american: i32,
    bookmaker_title: &'a str,
    last_update: &'a str,
}

impl<'a> From<&'a OddsQuote> for UnmatchedRow<'a> {
    fn from(quote: &'a OddsQuote) -> Self {
        Self {
            event_id: &quote.event_id,
            event_start: &quote.event_start,
            player: &quote.player,
            team: &quote.team,
            position: quote.position.as_deref().unwrap_or(""),
            market: &quote.market,
            side: quote.side,
            line: quote.line,
            price_american: quote.price,
            bookmaker_title: &quote.bookmaker,
            last_update: &quote.last_update,
        }
    }
}

fn unmatched_columns() -> Vec<&'static str> {
    let mut columns = REQUIRED_ODDS_COLUMNS.to_vec();
    columns.insert(4, "position");
    columns
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: impl Iterator<Item = T>) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    writer.write_record(header)?;

    let mut count = 0usize;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
        count += 1;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(count)
}

/// Write the edge table. The header is written even when there are no rows.
pub fn export_edges(path: &Path, edges: &[EdgeRecord]) -> Result<()> {
    let rows = write_rows(path, EDGE_COLUMNS, edges.iter())?;
    info!(path = %path.display(), rows, "Edges exported");
    Ok(())
}

/// Write quotes that matched no projection.
pub fn export_unmatched(path: &Path, quotes: &[OddsQuote]) -> Result<()> {
    let rows = write_rows(path, &unmatched_columns(), quotes.iter().map(UnmatchedRow::from))?;
    info!(path = %path.display(), rows, "Unmatched quotes exported");
    Ok(())
}

/// `dir/stem_YYYYMMDD_HHMM.csv` for the given instant.
pub fn timestamped_path_at(dir: &Path, stem: &str, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{stem}_{}.csv", at.format("%Y%m%d_%H%M")))
}

/// `dir/stem_YYYYMMDD_HHMM.csv` for the current UTC time.
pub fn timestamped_path(dir: &Path, stem: &str) -> PathBuf {
    timestamped_path_at(dir, stem, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::odds::read_odds;
    use crate::types::{MatchMethod, Tier};
    use chrono::TimeZone;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("propedge_test_{}", uuid::Uuid::new_v4()))
    }

    fn make_edge() -> EdgeRecord {
        EdgeRecord {
            player: "Josh Allen".into(),
            team: "BUF".into(),
            position: "QB".into(),
            market: "pass_yds".into(),
            side: Side::Over,
            line: 285.5,
            proj_mean: 300.0,
            proj_sd: 12.0,
            price: -110,
            implied_prob: 0.5238,
            model_prob: 0.886,
            expected_value: 0.69,
            z_score: 1.21,
            kelly_raw: 0.76,
            kelly_fraction: 0.38,
            unit_size: 1.5,
            bookmaker: "Book A".into(),
            event_id: "e1".into(),
            event_start: "2024-09-08T17:00:00Z".into(),
            injury_status: "OK".into(),
            match_method: MatchMethod::Exact,
            match_score: 100.0,
            tier: Tier::Recommend,
        }
    }

    fn make_quote(position: Option<&str>) -> OddsQuote {
        OddsQuote {
            event_id: "e1".into(),
            event_start: "2024-09-08T17:00:00Z".into(),
            player: "Gabe Davis".into(),
            team: "BUF".into(),
            position: position.map(str::to_string),
            market: "player_reception_yds".into(),
            side: Side::Under,
            line: 45.5,
            price: 105,
            bookmaker: "Book B".into(),
            last_update: "2024-09-08T12:00:00Z".into(),
        }
    }

    #[test]
    fn test_edges_header_and_values() {
        let dir = temp_dir();
        let path = dir.join("nested").join("edges.csv");
        export_edges(&path, &[make_edge()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), EDGE_COLUMNS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("Josh Allen,BUF,QB,pass_yds,over,285.5,"));
        assert!(row.ends_with(",OK,exact,100.0,RECOMMEND"));
        assert!(lines.next().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_edges_still_have_header() {
        let dir = temp_dir();
        let path = dir.join("edges.csv");
        export_edges(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), EDGE_COLUMNS.join(","));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unmatched_reloads_as_odds() {
        let dir = temp_dir();
        let path = dir.join("unmatched.csv");
        let quotes = vec![make_quote(None), make_quote(Some("WR"))];
        export_unmatched(&path, &quotes).unwrap();

        let load = read_odds(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(load.dropped, 0);
        assert_eq!(load.quotes, quotes);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_timestamped_path_format() {
        let at = Utc.with_ymd_and_hms(2024, 9, 8, 7, 5, 59).unwrap();
        let path = timestamped_path_at(Path::new("out"), "edges", at);
        assert_eq!(path, PathBuf::from("out/edges_20240908_0705.csv"));
        assert!(timestamped_path(Path::new("out"), "unmatched")
            .to_string_lossy()
            .ends_with(".csv"));
    }
}
