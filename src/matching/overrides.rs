//! Manual override table: operator-curated pairings between a name as a
//! book lists it (left) and the projection it should bind to (right).

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_key;
use crate::types::CanonicalKey;

/// Column names of the override file, in file order.
pub const OVERRIDE_COLUMNS: &[&str] = &[
    "player_left",
    "team_left",
    "pos_left",
    "player_right",
    "team_right",
    "pos_right",
];

/// One override row as written by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManualOverride {
    pub player_left: String,
    pub team_left: String,
    pub pos_left: String,
    pub player_right: String,
    pub team_right: String,
    pub pos_right: String,
}

impl ManualOverride {
    pub fn new(left: (&str, &str, &str), right: (&str, &str, &str)) -> Self {
        Self {
            player_left: left.0.to_string(),
            team_left: left.1.to_string(),
            pos_left: left.2.to_string(),
            player_right: right.0.to_string(),
            team_right: right.1.to_string(),
            pos_right: right.2.to_string(),
        }
    }

    pub fn left_key(&self) -> CanonicalKey {
        canonical_key(&self.player_left, &self.team_left, &self.pos_left)
    }

    pub fn right_key(&self) -> CanonicalKey {
        canonical_key(&self.player_right, &self.team_right, &self.pos_right)
    }
}

/// Ordered set of overrides for one run. Earlier rows take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    rows: Vec<ManualOverride>,
}

impl OverrideTable {
    pub fn new(rows: Vec<ManualOverride>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ManualOverride] {
        &self.rows
    }

    /// Canonical (left, right) key pairs in table order.
    pub fn resolved(&self) -> Vec<(CanonicalKey, CanonicalKey)> {
        self.rows.iter().map(|r| (r.left_key(), r.right_key())).collect()
    }
}
