//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section is optional and falls back to the built-in defaults. Secrets
//! (API keys, webhooks) are referenced by env-var name in the config and
//! resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::matching::similarity::SimilarityKind;
use crate::matching::MatchConfig;
use crate::strategy::kelly::BankrollConfig;
use crate::strategy::tier::TierThresholds;
use crate::strategy::{Guardrails, InjuryPolicy, ScoringConfig};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunConfig,
    pub odds_api: OddsApiConfig,
    pub guardrails: Guardrails,
    pub thresholds: TierThresholds,
    pub bankroll: BankrollConfig,
    pub injury: InjuryPolicy,
    pub matching: MatchingConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    /// Directory for exported tables.
    pub out_dir: PathBuf,
    /// Rows in the summary table.
    pub top_n: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            top_n: 20,
        }
    }
}

/// The Odds API settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsApiConfig {
    pub base_url: String,
    pub sport: String,
    pub api_key_env: String,
    pub regions: String,
    /// Provider market ids to request.
    pub markets: Vec<String>,
    /// Bookmaker allow-list (case-insensitive substring). Empty allows all.
    pub bookmakers: Vec<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Events fetched in parallel.
    pub concurrency: usize,
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.the-odds-api.com/v4".to_string(),
            sport: "americanfootball_nfl".to_string(),
            api_key_env: "ODDS_API_KEY".to_string(),
            regions: "us".to_string(),
            markets: [
                "player_pass_yds",
                "player_pass_tds",
                "player_pass_interceptions",
                "player_rush_yds",
                "player_rush_tds",
                "player_receptions",
                "player_reception_yds",
                "player_reception_tds",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            bookmakers: [
                "DraftKings",
                "FanDuel",
                "BetMGM",
                "Caesars",
                "ESPN BET",
                "Fanatics",
                "Bally Bet",
            ]
            .iter()
            .map(|b| b.to_string())
            .collect(),
            max_retries: 5,
            timeout_secs: 15,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub fuzzy_cutoff: f64,
    pub similarity: SimilarityKind,
    pub overrides_path: PathBuf,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let defaults = MatchConfig::default();
        Self {
            fuzzy_cutoff: defaults.fuzzy_cutoff,
            similarity: defaults.similarity,
            overrides_path: PathBuf::from("data/manual_overrides.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub slack_webhook_env: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            slack_webhook_env: "SLACK_WEBHOOK_URL".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the file if it exists, otherwise use the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a run misbehave.
    pub fn validate(&self) -> Result<()> {
        self.bankroll.validate()
    }

    /// Scoring settings for one run.
    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            guardrails: self.guardrails.clone(),
            thresholds: self.thresholds.clone(),
            bankroll: self.bankroll.clone(),
            injury: self.injury.clone(),
        }
    }

    /// Matching settings for one run.
    pub fn matching(&self) -> MatchConfig {
        MatchConfig {
            fuzzy_cutoff: self.matching.fuzzy_cutoff,
            similarity: self.matching.similarity,
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve an environment variable holding a secret.
    pub fn resolve_secret(env_name: &str) -> Result<SecretString> {
        Self::resolve_env(env_name).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.guardrails.min_books, 3);
        assert_eq!(cfg.guardrails.odds_min, -200);
        assert_eq!(cfg.thresholds.recommend_ev, 0.05);
        assert_eq!(cfg.bankroll.max_units, 1.5);
        assert_eq!(cfg.injury.drop, vec!["OUT".to_string(), "SUSP".to_string()]);
        assert_eq!(cfg.matching.fuzzy_cutoff, 90.0);
        assert_eq!(cfg.odds_api.bookmakers.len(), 7);
        assert_eq!(cfg.run.top_n, 20);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [guardrails]
            min_books = 2

            [thresholds]
            z_yards_strong = 0.9

            [matching]
            similarity = "jaro_winkler"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.guardrails.min_books, 2);
        assert_eq!(cfg.guardrails.max_vig, 0.06);
        assert_eq!(cfg.thresholds.z_yards_strong, 0.9);
        assert_eq!(cfg.thresholds.z_yards, 0.40);
        assert_eq!(cfg.matching().similarity, SimilarityKind::JaroWinkler);
        assert_eq!(cfg.scoring().guardrails.min_books, 2);
    }

    #[test]
    fn test_load_missing_file_errors_but_default_loader_does_not() {
        assert!(AppConfig::load("/nonexistent/propedge.toml").is_err());
        let cfg = AppConfig::load_or_default("/nonexistent/propedge.toml").unwrap();
        assert_eq!(cfg.run.out_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_repo_config_parses() {
        // config.toml ships at the crate root; cargo runs tests from there.
        if Path::new("config.toml").exists() {
            let cfg = AppConfig::load("config.toml").unwrap();
            assert!(cfg.bankroll.kelly_multiplier > 0.0 && cfg.bankroll.kelly_multiplier <= 1.0);
        }
    }

    #[test]
    fn test_inverted_unit_band_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [bankroll]
            min_units = 2.0
            max_units = 1.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_units <= max_units"), "{err}");
    }

    #[test]
    fn test_invalid_bankroll_file_fails_load() {
        let path = std::env::temp_dir().join(format!("propedge_cfg_{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[bankroll]\nkelly_multiplier = 2.0\n").unwrap();
        assert!(AppConfig::load_or_default(&path).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AppConfig::from_toml("[guardrails]\nmin_books = \"many\"").is_err());
    }
}
