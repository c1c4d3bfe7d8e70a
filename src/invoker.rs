//! Task invoker: one long call to the external scraper endpoint.
//!
//! The scraper is slow and non-retryable from this layer: a single POST with
//! a generous timeout, no client-side retries. Transport errors and endpoint-
//! reported failures both surface to callers as [`ScrapeOutcome::Failure`]
//! (users get one generic message), but they are distinguished in the logs.

use crate::config::ScraperConfig;
use crate::error::{BotError, Result};
use crate::record::PreferenceRecord;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// One scraped listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub link: String,
}

/// Outcome of one scraper invocation.
///
/// An empty `Results` is a valid "nothing new found" outcome, distinct from
/// `Failure`; callers render the two differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Failure,
    Results(Vec<Listing>),
}

/// Envelope returned by the scraper endpoint. `body` is a JSON-encoded
/// array of `[title, link]` pairs; status code 500 reports a scraper error.
#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    body: String,
}

/// Client for the external long-task endpoint.
pub struct TaskInvoker {
    endpoint: String,
    client: reqwest::Client,
}

impl TaskInvoker {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BotError::Invoke(format!("cannot build http client: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// Run the scraper once against a preference payload.
    pub async fn invoke(&self, payload: &PreferenceRecord) -> ScrapeOutcome {
        match self.try_invoke(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("scraper invocation failed: {e}");
                ScrapeOutcome::Failure
            }
        }
    }

    async fn try_invoke(&self, payload: &PreferenceRecord) -> Result<ScrapeOutcome> {
        debug!("invoking scraper for user {}", payload.user_id());
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| BotError::Invoke(format!("request failed: {e}")))?;

        let envelope = response
            .json::<ScrapeResponse>()
            .await
            .map_err(|e| BotError::Invoke(format!("malformed response: {e}")))?;

        if envelope.status_code == 500 {
            warn!("scraper reported an error for user {}", payload.user_id());
            return Ok(ScrapeOutcome::Failure);
        }

        let pairs: Vec<(String, String)> = serde_json::from_str(&envelope.body)
            .map_err(|e| BotError::Invoke(format!("malformed listing body: {e}")))?;
        let listings = pairs
            .into_iter()
            .map(|(title, link)| Listing { title, link })
            .collect();
        Ok(ScrapeOutcome::Results(listings))
    }
}
