//! Canonicalisation of player, team and position strings.
//!
//! Books and projection sources spell the same entity differently
//! ("Patrick Mahomes II", "KC", "qb"). These functions reduce raw strings to
//! deterministic comparison keys. All of them are total and idempotent.

use unicode_normalization::UnicodeNormalization;

use crate::types::{CanonicalKey, OddsQuote, ProjectionRecord};

/// Generational suffixes dropped from the end of player names.
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii"];

/// Position spellings collapsed to a single code.
const POSITION_ALIASES: &[(&str, &str)] = &[
    ("HB", "RB"),
    ("TB", "RB"),
    ("FB", "RB"),
    ("RB", "RB"),
    ("WR", "WR"),
    ("TE", "TE"),
    ("QB", "QB"),
    ("PK", "K"),
    ("K", "K"),
    ("P", "P"),
    ("PR", "ST"),
    ("KR", "ST"),
    ("LS", "ST"),
    ("CB", "CB"),
    ("DB", "DB"),
    ("S", "S"),
    ("SS", "S"),
    ("FS", "S"),
    ("DE", "DL"),
    ("DT", "DL"),
    ("DL", "DL"),
    ("NT", "DL"),
    ("OLB", "LB"),
    ("ILB", "LB"),
    ("MLB", "LB"),
    ("LB", "LB"),
    ("EDGE", "LB"),
    ("OG", "OL"),
    ("OT", "OL"),
    ("OL", "OL"),
    ("C", "OL"),
    ("G", "OL"),
    ("T", "OL"),
    ("DST", "DST"),
    ("DEF", "DST"),
];

/// Decompose and drop everything outside ASCII ("José" -> "Jose").
fn ascii_fold(raw: &str) -> String {
    raw.nfkd().filter(char::is_ascii).collect()
}

/// Blank cells and pandas-style "nan" placeholders carry no value.
fn is_null_like(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Normalise a player name: ASCII-fold, lowercase, punctuation to spaces,
/// collapse whitespace and drop trailing generational suffixes.
pub fn normalize_name(raw: &str) -> String {
    if is_null_like(raw) {
        return String::new();
    }
    let cleaned: String = ascii_fold(raw)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Normalise a team code: ASCII-fold, lowercase, keep only alphanumerics.
pub fn normalize_team(raw: &str) -> String {
    if is_null_like(raw) {
        return String::new();
    }
    ascii_fold(raw)
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Normalise a position: first token (split on `/ , & \` or whitespace)
/// mapped through the alias table. Unknown codes pass through uppercased.
pub fn normalize_position(raw: &str) -> String {
    if is_null_like(raw) {
        return String::new();
    }
    let folded = ascii_fold(raw).to_uppercase();
    folded
        .split(|c: char| matches!(c, '\\' | '/' | ',' | '&') || c.is_whitespace())
        .find(|token| !token.is_empty())
        .map(|token| {
            POSITION_ALIASES
                .iter()
                .find(|(alias, _)| *alias == token)
                .map(|(_, code)| (*code).to_string())
                .unwrap_or_else(|| token.to_string())
        })
        .unwrap_or_default()
}

/// Build a canonical key from raw parts.
pub fn canonical_key(player: &str, team: &str, position: &str) -> CanonicalKey {
    CanonicalKey {
        player: normalize_name(player),
        team: normalize_team(team),
        position: normalize_position(position),
    }
}

pub fn projection_key(record: &ProjectionRecord) -> CanonicalKey {
    canonical_key(&record.player, &record.team, &record.position)
}

/// Key for a quote as listed. A missing position yields an empty position key.
pub fn quote_key(quote: &OddsQuote) -> CanonicalKey {
    canonical_key(&quote.player, &quote.team, quote.position.as_deref().unwrap_or(""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
