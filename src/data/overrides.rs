//! Manual override file loading. The file is optional.

use std::path::Path;

use tracing::info;

use super::Table;
use crate::matching::overrides::{ManualOverride, OverrideTable, OVERRIDE_COLUMNS};
use crate::types::PropError;

/// Load overrides from `path`; a missing file is an empty table.
pub fn load_overrides(path: &Path) -> Result<OverrideTable, PropError> {
    if !path.exists() {
        info!(path = %path.display(), "No manual override file, continuing without overrides");
        return Ok(OverrideTable::empty());
    }
    let table = Table::read(path, "override")?;
    let overrides = overrides_from_table(&table)?;
    info!(path = %path.display(), rows = overrides.len(), "Manual overrides loaded");
    Ok(overrides)
}

pub fn overrides_from_table(table: &Table) -> Result<OverrideTable, PropError> {
    table.require_columns(OVERRIDE_COLUMNS)?;
    let rows = table
        .rows()
        .map(|row| ManualOverride {
            player_left: row.get("player_left").to_string(),
            team_left: row.get("team_left").to_string(),
            pos_left: row.get("pos_left").to_string(),
            player_right: row.get("player_right").to_string(),
            team_right: row.get("team_right").to_string(),
            pos_right: row.get("pos_right").to_string(),
        })
        .collect();
    Ok(OverrideTable::new(rows))
}
