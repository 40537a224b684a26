//! Odds retrieval collaborators.
//!
//! Defines the `OddsFeed` trait and a fan-out helper that pulls props for
//! every upcoming event. The engine never calls a feed itself; the binary
//! fetches first and hands plain quotes to the engine.

pub mod odds_api;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::OddsQuote;

/// An upcoming event as listed by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: String,
    #[serde(default)]
    pub commence_time: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
}

/// Abstraction over player-prop odds providers.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Events with props available.
    async fn upcoming_events(&self) -> Result<Vec<EventSummary>>;

    /// Flattened prop quotes for one event.
    async fn event_props(&self, event_id: &str, markets: &[String]) -> Result<Vec<OddsQuote>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Fetch props for every upcoming event, at most `concurrency` requests in
/// flight. Quotes keep event order. An event that fails is logged and
/// skipped; failing to list events is an error.
pub async fn fetch_all_props(
    feed: &dyn OddsFeed,
    markets: &[String],
    concurrency: usize,
) -> Result<Vec<OddsQuote>> {
    let events = feed.upcoming_events().await?;
    info!(feed = feed.name(), events = events.len(), "Fetching event props");

    let results: Vec<(String, Result<Vec<OddsQuote>>)> = stream::iter(events.into_iter().map(|event| async move {
        let props = feed.event_props(&event.id, markets).await;
        (event.id, props)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let mut quotes = Vec::new();
    let mut failed = 0usize;
    for (event_id, result) in results {
        match result {
            Ok(mut props) => quotes.append(&mut props),
            Err(e) => {
                failed += 1;
                warn!(feed = feed.name(), event_id = %event_id, error = %e, "Event props fetch failed");
            }
        }
    }

    info!(feed = feed.name(), quotes = quotes.len(), failed_events = failed, "Props fetched");
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticFeed {
        events: Vec<&'static str>,
        fail: Option<&'static str>,
        calls: AtomicUsize,
    }

    fn make_quote(event_id: &str) -> OddsQuote {
        OddsQuote {
            event_id: event_id.to_string(),
            event_start: String::new(),
            player: "Josh Allen".into(),
            team: "BUF".into(),
            position: None,
            market: "player_pass_yds".into(),
            side: Side::Over,
            line: 250.5,
            price: -110,
            bookmaker: "DraftKings".into(),
            last_update: String::new(),
        }
    }

    #[async_trait]
    impl OddsFeed for StaticFeed {
        async fn upcoming_events(&self) -> Result<Vec<EventSummary>> {
            Ok(self
                .events
                .iter()
                .map(|id| EventSummary {
                    id: id.to_string(),
                    commence_time: None,
                    home_team: None,
                    away_team: None,
                })
                .collect())
        }

        async fn event_props(&self, event_id: &str, _markets: &[String]) -> Result<Vec<OddsQuote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Earlier events finish last, so ordering must come from the stream.
            let delay = 5 * (self.events.len() - self.events.iter().position(|e| *e == event_id).unwrap_or(0));
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            if self.fail == Some(event_id) {
                anyhow::bail!("boom");
            }
            Ok(vec![make_quote(event_id), make_quote(event_id)])
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn test_fetch_preserves_event_order() {
        let feed = StaticFeed {
            events: vec!["e1", "e2", "e3"],
            fail: None,
            calls: AtomicUsize::new(0),
        };
        let quotes = fetch_all_props(&feed, &[], 3).await.unwrap();
        let ids: Vec<_> = quotes.iter().map(|q| q.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e1", "e2", "e2", "e3", "e3"]);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_event_is_skipped() {
        let feed = StaticFeed {
            events: vec!["e1", "e2"],
            fail: Some("e1"),
            calls: AtomicUsize::new(0),
        };
        let quotes = fetch_all_props(&feed, &[], 0).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.event_id == "e2"));
    }

    #[test]
    fn test_no_events_blocking() {
        let feed = StaticFeed {
            events: vec![],
            fail: None,
            calls: AtomicUsize::new(0),
        };
        let quotes = tokio_test::block_on(fetch_all_props(&feed, &[], 2)).unwrap();
        assert!(quotes.is_empty());
    }
}
