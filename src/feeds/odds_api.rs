//! The Odds API client (v4).
//!
//! Lists upcoming events for a sport and pulls per-event player-prop odds in
//! American format. Transport errors, 429s and 5xx responses are retried
//! with exponential backoff; a 429 `Retry-After` header is honoured.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{EventSummary, OddsFeed};
use crate::config::OddsApiConfig;
use crate::types::{OddsQuote, Side};

/// Base backoff delay in milliseconds (doubles each retry).
const BASE_BACKOFF_MS: u64 = 1000;

/// Upper bound on any single retry wait, including server Retry-After.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EventOdds {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub commence_time: Option<String>,
    #[serde(default)]
    pub bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBookmaker {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub markets: Vec<ApiMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMarket {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiOutcome {
    /// Over / Under.
    #[serde(default)]
    pub name: Option<String>,
    /// Player name for player props.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub point: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Whether a bookmaker passes the allow-list (case-insensitive substring).
/// An empty list allows every book.
pub fn is_allowed_book(title: &str, allow: &[String]) -> bool {
    if allow.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    allow.iter().any(|book| title.contains(&book.to_lowercase()))
}

fn american_price(price: Option<f64>) -> Option<i32> {
    let price = price?;
    if !price.is_finite() || price.fract() != 0.0 {
        return None;
    }
    i32::try_from(price as i64).ok()
}

/// Flatten one event payload into quotes. Outcomes without a usable side,
/// line or price are dropped.
pub fn flatten_event_odds(payload: &EventOdds, event_id: &str, allow: &[String]) -> Vec<OddsQuote> {
    let event_id = non_empty(&payload.id).unwrap_or(event_id);
    let event_start = payload.commence_time.clone().unwrap_or_default();

    let mut quotes = Vec::new();
    let mut dropped = 0usize;
    for bookmaker in &payload.bookmakers {
        let Some(title) = non_empty(&bookmaker.title) else {
            continue;
        };
        if !is_allowed_book(title, allow) {
            debug!(bookmaker = title, "Skipping bookmaker outside allow-list");
            continue;
        }
        let book_update = non_empty(&bookmaker.last_update).unwrap_or("");

        for market in &bookmaker.markets {
            let market_key = non_empty(&market.key).unwrap_or("");
            let last_update = non_empty(&market.last_update).unwrap_or(book_update);

            for outcome in &market.outcomes {
                let side = non_empty(&outcome.name).and_then(|s| s.parse::<Side>().ok());
                let player = non_empty(&outcome.description).or_else(|| non_empty(&outcome.player));
                let (Some(side), Some(line), Some(price), Some(player)) =
                    (side, outcome.point, american_price(outcome.price), player)
                else {
                    dropped += 1;
                    continue;
                };

                quotes.push(OddsQuote {
                    event_id: event_id.to_string(),
                    event_start: event_start.clone(),
                    player: player.to_string(),
                    team: non_empty(&outcome.team).unwrap_or("").to_string(),
                    position: None,
                    market: market_key.to_string(),
                    side,
                    line,
                    price,
                    bookmaker: title.to_string(),
                    last_update: last_update.to_string(),
                });
            }
        }
    }

    if dropped > 0 {
        debug!(event_id, dropped, "Dropped unusable outcomes");
    }
    quotes
}

/// Delay before retry `attempt` (1-based). A server-provided Retry-After
/// wins when it is longer. Both are capped at `MAX_BACKOFF`.
pub fn retry_delay(attempt: u32, retry_after_secs: Option<f64>) -> Duration {
    let backoff = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|m| BASE_BACKOFF_MS.checked_mul(m))
        .map_or(MAX_BACKOFF, Duration::from_millis)
        .min(MAX_BACKOFF);
    let retry_after = retry_after_secs
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map_or(Duration::ZERO, |d| d.min(MAX_BACKOFF));
    backoff.max(retry_after)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OddsApiClient {
    http: Client,
    api_key: SecretString,
    config: OddsApiConfig,
}

impl OddsApiClient {
    pub fn new(api_key: SecretString, config: OddsApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("propedge/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Odds API HTTP client")?;
        Ok(Self { http, api_key, config })
    }

    /// Restrict (or with an empty list, stop restricting) bookmakers.
    pub fn with_bookmakers(mut self, bookmakers: Vec<String>) -> Self {
        self.config.bookmakers = bookmakers;
        self
    }

    fn events_url(&self) -> String {
        format!(
            "{}/sports/{}/events?apiKey={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.sport),
            urlencoding::encode(self.api_key.expose_secret()),
        )
    }

    fn event_odds_url(&self, event_id: &str, markets: &[String]) -> String {
        let mut markets: Vec<&str> = markets.iter().map(String::as_str).collect();
        markets.sort_unstable();
        markets.dedup();
        format!(
            "{}/sports/{}/events/{}/odds?apiKey={}&regions={}&markets={}&oddsFormat=american",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.sport),
            urlencoding::encode(event_id),
            urlencoding::encode(self.api_key.expose_secret()),
            urlencoding::encode(&self.config.regions),
            urlencoding::encode(&markets.join(",")),
        )
    }

    /// GET with retry + exponential backoff. `label` is logged instead of
    /// the URL so the key never reaches the logs.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, label: &str) -> Result<T> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("Failed to decode Odds API response ({label})"));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let retry_after = response
                            .headers()
                            .get(RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<f64>().ok());
                        let error_text = response.text().await.unwrap_or_default();
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        if attempt < attempts {
                            let delay = retry_delay(attempt, retry_after);
                            warn!(
                                status = %status,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                request = label,
                                "Retryable Odds API error"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Odds API error {status} ({label}): {error_text}");
                }
                Err(e) => {
                    last_error = Some(format!("Request error: {e}"));
                    if attempt < attempts {
                        let delay = retry_delay(attempt, None);
                        warn!(attempt, request = label, error = %e, "Odds API request failed");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        anyhow::bail!(
            "Odds API failed after {} attempts ({}): {}",
            attempts,
            label,
            last_error.unwrap_or_default()
        )
    }
}

#[async_trait]
impl OddsFeed for OddsApiClient {
    async fn upcoming_events(&self) -> Result<Vec<EventSummary>> {
        let events: Vec<EventSummary> = self.get_json(&self.events_url(), "events").await?;
        info!(sport = %self.config.sport, events = events.len(), "Fetched upcoming events");
        Ok(events)
    }

    async fn event_props(&self, event_id: &str, markets: &[String]) -> Result<Vec<OddsQuote>> {
        if markets.is_empty() {
            debug!(event_id, "No markets requested");
            return Ok(Vec::new());
        }
        let label = format!("event {event_id}");
        let payload: EventOdds = self
            .get_json(&self.event_odds_url(event_id, markets), &label)
            .await?;
        let quotes = flatten_event_odds(&payload, event_id, &self.config.bookmakers);
        info!(event_id, quotes = quotes.len(), "Fetched event props");
        Ok(quotes)
    }

    fn name(&self) -> &str {
        "the-odds-api"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
