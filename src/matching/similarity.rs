//! Name similarity scorers used by the fuzzy matching phase.
//!
//! Scores are on a 0..=100 scale. Both scorers compare token-sorted strings,
//! so word order never matters ("brown amon ra" vs "amon ra brown").

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

/// Narrow interface over a string-similarity algorithm.
#[cfg_attr(test, mockall::automock)]
pub trait Similarity {
    /// Similarity of two normalised names in `0.0..=100.0`.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Which scorer a run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[default]
    TokenSort,
    JaroWinkler,
}

impl SimilarityKind {
    pub fn build(&self) -> Box<dyn Similarity> {
        match self {
            SimilarityKind::TokenSort => Box::new(TokenSortRatio),
            SimilarityKind::JaroWinkler => Box::new(JaroWinkler),
        }
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Length of the longest common subsequence of two char sequences.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Indel ratio over token-sorted strings: `200 * LCS / (len_a + len_b)`.
///
/// This is the rapidfuzz `token_sort_ratio` formula the 90-point cutoff is
/// calibrated against. Indel distance allows insertions and deletions only,
/// so it is `len_a + len_b - 2 * LCS`, normalised by the summed length.
/// strsim ships Levenshtein-family distances (substitutions allowed,
/// normalised by the longer string) but no indel/LCS metric, hence the local
/// `lcs_len`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl Similarity for TokenSortRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = sorted_tokens(a).chars().collect();
        let b: Vec<char> = sorted_tokens(b).chars().collect();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let common = lcs_len(&a, &b);
        200.0 * common as f64 / (a.len() + b.len()) as f64
    }
}

/// Jaro-Winkler over token-sorted strings, scaled to 0..=100.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = sorted_tokens(a);
        let b = sorted_tokens(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        jaro_winkler(&a, &b) * 100.0
    }
}
