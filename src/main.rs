//! PROPEDGE: player-prop edge finder.
//!
//! Entry point. Loads configuration, initialises structured logging, reads
//! projections and odds (from a CSV or the live feed), runs the engine and
//! exports the ranked edges plus the unmatched-quote artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use propedge::config::AppConfig;
use propedge::data::odds::load_odds;
use propedge::data::overrides::load_overrides;
use propedge::data::projections::load_projections;
use propedge::engine::{EdgeEngine, RunOutput};
use propedge::feeds::fetch_all_props;
use propedge::feeds::odds_api::OddsApiClient;
use propedge::report::format_top_table;
use propedge::report::slack::SlackNotifier;
use propedge::storage;
use propedge::types::{Market, OddsQuote};

#[derive(Debug, Parser)]
#[command(name = "propedge", version, about = "Find +EV player props from projections and sportsbook odds")]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct LogArgs {
    /// Log level for this crate when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines.
    #[arg(long, global = true, env = "PROPEDGE_LOG_JSON")]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile projections with odds and export ranked edges.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Projection table (CSV).
    #[arg(long)]
    projections: PathBuf,

    /// Odds table (CSV). Fetched from the odds feed when omitted.
    #[arg(long)]
    odds: Option<PathBuf>,

    /// Markets to request from the feed (e.g. pass_yds,receptions).
    #[arg(long, value_delimiter = ',')]
    markets: Vec<String>,

    /// Manual override table (CSV). Defaults to `matching.overrides_path`.
    #[arg(long)]
    overrides: Option<PathBuf>,

    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Rows in the summary table.
    #[arg(long)]
    top_n: Option<usize>,

    /// Accept every bookmaker the feed returns.
    #[arg(long)]
    all_books: bool,

    /// Post the summary to Slack.
    #[arg(long)]
    slack: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let cfg = AppConfig::load_or_default(&args.config)?;
    let top_n = args.top_n.unwrap_or(cfg.run.top_n);

    info!(
        projections = %args.projections.display(),
        odds = ?args.odds,
        config = %args.config.display(),
        "PROPEDGE starting"
    );

    let projections = load_projections(&args.projections)?;

    let quotes = match &args.odds {
        Some(path) => load_odds(path)?.quotes,
        None => fetch_quotes(&cfg, &args).await?,
    };

    let overrides_path = args
        .overrides
        .clone()
        .unwrap_or_else(|| cfg.matching.overrides_path.clone());
    let overrides = load_overrides(&overrides_path)?;

    let engine = EdgeEngine::new(cfg.scoring(), cfg.matching());
    let output = engine.run(&projections, &quotes, &overrides);

    info!("Top {top_n} by EV:\n{}", format_top_table(&output.edges, top_n));
    for (reason, count) in &output.report.skipped {
        info!(%reason, count, "Skipped");
    }

    export(&cfg, &output)?;

    if args.slack {
        match AppConfig::resolve_secret(&cfg.alerts.slack_webhook_env) {
            Ok(webhook) => {
                SlackNotifier::new(webhook)?.notify(&output.edges, top_n).await;
            }
            Err(e) => warn!(error = %e, "Slack requested but no webhook configured"),
        }
    }

    info!(report = %output.report, "PROPEDGE finished");
    Ok(())
}

/// Pull props for every upcoming event from the configured feed.
async fn fetch_quotes(cfg: &AppConfig, args: &RunArgs) -> Result<Vec<OddsQuote>> {
    let markets = provider_markets(&args.markets, &cfg.odds_api.markets)?;
    let api_key = AppConfig::resolve_secret(&cfg.odds_api.api_key_env)
        .context("No --odds file given and no odds API key available")?;

    let mut client = OddsApiClient::new(api_key, cfg.odds_api.clone())?;
    if args.all_books {
        client = client.with_bookmakers(Vec::new());
    }
    fetch_all_props(&client, &markets, cfg.odds_api.concurrency).await
}

/// Provider market ids for the requested markets, or the configured list.
fn provider_markets(requested: &[String], configured: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(configured.to_vec());
    }
    requested
        .iter()
        .map(|raw| {
            Market::from_key(raw)
                .map(|market| market.provider_key())
                .with_context(|| format!("Unsupported market: {raw}"))
        })
        .collect()
}

fn export(cfg: &AppConfig, output: &RunOutput) -> Result<()> {
    let edges_path = storage::timestamped_path(&cfg.run.out_dir, "edges");
    storage::export_edges(&edges_path, &output.edges)?;

    let unmatched_path = storage::timestamped_path(&cfg.run.out_dir, "unmatched");
    storage::export_unmatched(&unmatched_path, &output.unmatched)?;
    Ok(())
}

/// Initialise the `tracing` subscriber. `RUST_LOG` overrides `--log-level`.
fn init_logging(args: &LogArgs) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("propedge={}", args.log_level)));

    let subscriber = fmt().with_env_filter(env_filter).with_target(false);
    if args.log_json {
        subscriber.json().with_current_span(false).init();
    } else {
        subscriber.compact().init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_markets_defaults_to_config() {
        let configured = vec!["player_pass_yds".to_string()];
        assert_eq!(provider_markets(&[], &configured).unwrap(), configured);
    }

    #[test]
    fn test_provider_markets_maps_keys() {
        let requested = vec!["pass_int".to_string(), "receptions".to_string()];
        assert_eq!(
            provider_markets(&requested, &[]).unwrap(),
            vec!["player_pass_interceptions".to_string(), "player_receptions".to_string()]
        );
        assert!(provider_markets(&["anytime_td".to_string()], &[]).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "propedge", "run", "--projections", "p.csv", "--markets", "pass_yds,rush_yds", "--all-books",
        ])
        .unwrap();
        let Command::Run(args) = cli.command;
        assert_eq!(args.markets.len(), 2);
        assert!(args.all_books);
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert!(args.odds.is_none());
        assert_eq!(cli.log.log_level, "info");
    }

    #[test]
    fn test_cli_log_flags_are_global() {
        let cli = Cli::try_parse_from([
            "propedge", "run", "--projections", "p.csv", "--log-level", "debug", "--log-json",
        ])
        .unwrap();
        assert_eq!(cli.log.log_level, "debug");
        assert!(cli.log.log_json);
    }
}
