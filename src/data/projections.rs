//! Projection table loading.

use std::io::Read;
use std::path::Path;

use tracing::info;

use super::Table;
use crate::types::{Market, ProjectionRecord, ProjectionStats, PropError, StatLine, DEFAULT_INJURY_STATUS};

const TABLE: &str = "projection";

/// Identity and metadata columns every projection file must carry.
const ID_COLUMNS: &[&str] = &["player", "team", "position", "id", "season_year", "week", "avg_type"];

/// Every required column: identity columns plus a mean and `_sd` column
/// per supported market.
pub fn required_columns() -> Vec<String> {
    let mut columns: Vec<String> = ID_COLUMNS.iter().map(|c| c.to_string()).collect();
    for market in Market::ALL {
        let column = market.projection_column();
        columns.push(column.to_string());
        columns.push(format!("{column}_sd"));
    }
    columns
}

pub fn load_projections(path: &Path) -> Result<Vec<ProjectionRecord>, PropError> {
    let table = Table::read(path, TABLE)?;
    let records = projections_from_table(&table)?;
    info!(path = %path.display(), records = records.len(), "Projections loaded");
    Ok(records)
}

pub fn read_projections<R: Read>(reader: R) -> Result<Vec<ProjectionRecord>, PropError> {
    projections_from_table(&Table::from_reader(reader, TABLE)?)
}

fn projections_from_table(table: &Table) -> Result<Vec<ProjectionRecord>, PropError> {
    let required = required_columns();
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    table.require_columns(&required)?;
    if table.is_empty() {
        return Err(PropError::EmptyTable(TABLE.to_string()));
    }

    let mut records = Vec::with_capacity(table.len());
    for row in table.rows() {
        let season_year = i32::try_from(row.integer("season_year")?).map_err(|_| row.invalid("season_year"))?;
        let week = u32::try_from(row.integer("week")?).map_err(|_| row.invalid("week"))?;

        let mut stats = ProjectionStats::default();
        for market in Market::ALL {
            let column = market.projection_column();
            let line = StatLine {
                mean: row.optional_f64(column)?,
                sd: row.optional_f64(&format!("{column}_sd"))?,
            };
            stats.set(*market, line);
        }

        let injury = row.get("injury_status");
        records.push(ProjectionRecord {
            player: row.get("player").to_string(),
            team: row.get("team").to_string(),
            position: row.get("position").to_string(),
            source_id: row.get("id").to_string(),
            season_year,
            week,
            avg_type: row.get("avg_type").to_string(),
            stats,
            injury_status: if injury.is_empty() {
                DEFAULT_INJURY_STATUS.to_string()
            } else {
                injury.to_string()
            },
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Player,Team,Position,ID,Season Year,Week,Avg Type,\
        Pass Yds,Pass Yds SD,Pass TDs,Pass TDs SD,Pass Int,Pass Int SD,\
        Rush Yds,Rush Yds SD,Rush TDs,Rush TDs SD,Rec,Rec SD,Rec Yds,Rec Yds SD,Rec TDs,Rec TDs SD";

    fn make_csv(rows: &[&str], injury: bool) -> String {
        let mut text = HEADER.to_string();
        if injury {
            text.push_str(",Injury Status");
        }
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    const ALLEN: &str = "Josh Allen,BUF,QB,p1,2024,1,mean,265.2,40.1,1.9,0.8,0.7,0.6,38,15,0.5,0.4,,,,,,";

    #[test]
    fn test_loads_typed_record() {
        let records = read_projections(make_csv(&[ALLEN], false).as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.player, "Josh Allen");
        assert_eq!(r.source_id, "p1");
        assert_eq!(r.season_year, 2024);
        assert_eq!(r.week, 1);
        assert_eq!(r.injury_status, "OK");
        assert_eq!(r.stats.get(Market::PassYds), StatLine::new(265.2, 40.1));
        assert_eq!(r.stats.get(Market::ReceptionYds), StatLine::default());
    }

    #[test]
    fn test_injury_status_blank_defaults() {
        let rows = [format!("{ALLEN},Q"), format!("{ALLEN},")];
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let records = read_projections(make_csv(&rows, true).as_bytes()).unwrap();
        assert_eq!(records[0].injury_status, "Q");
        assert_eq!(records[1].injury_status, "OK");
    }

    #[test]
    fn test_missing_columns_named() {
        let err = read_projections("player,team\nx,y\n".as_bytes()).unwrap_err();
        match err {
            PropError::MissingColumns { columns, .. } => {
                assert!(columns.contains(&"rec_tds_sd".to_string()));
                assert!(columns.contains(&"season_year".to_string()));
                assert!(!columns.contains(&"player".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_table_is_error() {
        let err = read_projections(make_csv(&[], false).as_bytes()).unwrap_err();
        assert!(matches!(err, PropError::EmptyTable(_)));
    }

    #[test]
    fn test_garbage_stat_is_error() {
        let row = ALLEN.replace("265.2", "lots");
        let err = read_projections(make_csv(&[&row], false).as_bytes()).unwrap_err();
        match err {
            PropError::InvalidValue { row, column, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "pass_yds");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_week_is_error() {
        let row = ALLEN.replace(",2024,1,", ",2024,one,");
        let err = read_projections(make_csv(&[&row], false).as_bytes()).unwrap_err();
        assert!(matches!(err, PropError::InvalidValue { .. }));
    }

    #[test]
    fn test_required_columns_cover_markets() {
        let columns = required_columns();
        assert_eq!(columns.len(), 7 + 2 * Market::ALL.len());
        assert!(columns.contains(&"rec_sd".to_string()));
    }
}
