//! Slack incoming-webhook delivery of the top picks.
//!
//! Delivery is best-effort: a failed post is logged and never fails the run.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::format_top_table;
use crate::types::EdgeRecord;

const TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    text: String,
}

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nothing to report.
    Skipped,
    Failed,
}

pub struct SlackNotifier {
    http: Client,
    webhook: SecretString,
}

impl SlackNotifier {
    pub fn new(webhook: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build Slack HTTP client")?;
        Ok(Self { http, webhook })
    }

    /// Message body for the first `n` edges.
    pub fn message(edges: &[EdgeRecord], n: usize) -> String {
        format!(
            "*PROPEDGE top {}*\n```\n{}\n```",
            n.min(edges.len()),
            format_top_table(edges, n)
        )
    }

    /// Post the table. Nothing is posted when there are no edges.
    pub async fn notify(&self, edges: &[EdgeRecord], n: usize) -> Delivery {
        if edges.is_empty() || n == 0 {
            debug!("No edges, skipping Slack notification");
            return Delivery::Skipped;
        }
        match self.post(Self::message(edges, n)).await {
            Ok(()) => {
                info!(picks = n.min(edges.len()), "Slack notification sent");
                Delivery::Sent
            }
            Err(e) => {
                warn!(error = %e, "Slack notification failed");
                Delivery::Failed
            }
        }
    }

    async fn post(&self, text: String) -> Result<()> {
        let response = self
            .http
            .post(self.webhook.expose_secret())
            .json(&WebhookPayload { text })
            .send()
            .await
            .context("Slack request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Slack webhook returned {status}: {body}");
        }
        Ok(())
    }
}
