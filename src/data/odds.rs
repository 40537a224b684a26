//! Odds table loading.
//!
//! Unusable rows (bad side, line or price, blank identity fields) are
//! dropped and counted rather than failing the load.

use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use super::{parse_integer, parse_optional_f64, Row, Table};
use crate::types::{OddsQuote, PropError, Side};

const TABLE: &str = "odds";

pub const REQUIRED_ODDS_COLUMNS: &[&str] = &[
    "event_id",
    "event_start",
    "player",
    "team",
    "market",
    "side",
    "line",
    "price_american",
    "bookmaker_title",
    "last_update",
];

/// Loaded quotes plus the number of rows that could not be used.
#[derive(Debug, Clone, Default)]
pub struct OddsLoad {
    pub quotes: Vec<OddsQuote>,
    pub dropped: usize,
}

pub fn load_odds(path: &Path) -> Result<OddsLoad, PropError> {
    let table = Table::read(path, TABLE)?;
    let load = odds_from_table(&table)?;
    info!(
        path = %path.display(),
        quotes = load.quotes.len(),
        dropped = load.dropped,
        "Odds loaded"
    );
    Ok(load)
}

pub fn read_odds<R: Read>(reader: R) -> Result<OddsLoad, PropError> {
    odds_from_table(&Table::from_reader(reader, TABLE)?)
}

fn odds_from_table(table: &Table) -> Result<OddsLoad, PropError> {
    table.require_columns(REQUIRED_ODDS_COLUMNS)?;
    let mut load = OddsLoad::default();
    for row in table.rows() {
        match quote_from_row(&row) {
            Some(quote) => load.quotes.push(quote),
            None => {
                debug!(row = row.number(), player = row.get("player"), "Odds row dropped");
                load.dropped += 1;
            }
        }
    }
    Ok(load)
}

fn quote_from_row(row: &Row<'_>) -> Option<OddsQuote> {
    let side: Side = row.get("side").parse().ok()?;
    let line = parse_optional_f64(row.get("line")).ok().flatten()?;
    let price = i32::try_from(parse_integer(row.get("price_american"))?).ok()?;

    let player = row.get("player");
    let team = row.get("team");
    let market = row.get("market");
    if player.is_empty() || team.is_empty() || market.is_empty() {
        return None;
    }

    let position = row.get("position");
    Some(OddsQuote {
        event_id: row.get("event_id").to_string(),
        event_start: row.get("event_start").to_string(),
        player: player.to_string(),
        team: team.to_string(),
        position: (!position.is_empty()).then(|| position.to_string()),
        market: market.to_string(),
        side,
        line,
        price,
        bookmaker: row.get("bookmaker_title").to_string(),
        last_update: row.get("last_update").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "event_id,event_start,player,team,market,side,line,price_american,bookmaker_title,last_update";

    fn make_csv(rows: &[&str]) -> String {
        let mut text = format!("{HEADER}\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_loads_quotes() {
        let csv = make_csv(&["e1,2024-09-08T17:00Z,Josh Allen,BUF,player_pass_yds,Over,285.5,-110,DraftKings,2024-09-08T12:00Z"]);
        let load = read_odds(csv.as_bytes()).unwrap();
        assert_eq!(load.dropped, 0);
        let q = &load.quotes[0];
        assert_eq!(q.side, Side::Over);
        assert_eq!(q.line, 285.5);
        assert_eq!(q.price, -110);
        assert_eq!(q.bookmaker, "DraftKings");
        assert_eq!(q.position, None);
    }

    #[test]
    fn test_bad_rows_dropped() {
        let csv = make_csv(&[
            "e1,t,Josh Allen,BUF,player_pass_yds,yes,285.5,-110,DK,t",
            "e1,t,Josh Allen,BUF,player_pass_yds,over,abc,-110,DK,t",
            "e1,t,Josh Allen,BUF,player_pass_yds,over,285.5,,DK,t",
            "e1,t,,BUF,player_pass_yds,over,285.5,-110,DK,t",
            "e1,t,Josh Allen,BUF,player_pass_yds,UNDER,285.5,-110.0,DK,t",
        ]);
        let load = read_odds(csv.as_bytes()).unwrap();
        assert_eq!(load.dropped, 4);
        assert_eq!(load.quotes.len(), 1);
        assert_eq!(load.quotes[0].side, Side::Under);
    }

    #[test]
    fn test_optional_position_column() {
        let csv = "event_id,event_start,player,team,position,market,side,line,price_american,bookmaker_title,last_update\n\
                   e1,t,Josh Allen,BUF,QB,player_pass_yds,over,285.5,-110,DK,t\n";
        let load = read_odds(csv.as_bytes()).unwrap();
        assert_eq!(load.quotes[0].position.as_deref(), Some("QB"));
    }

    #[test]
    fn test_missing_columns_fail() {
        let err = read_odds("player,team\nx,y\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("price_american"));
    }
}
