//! Remote preference store client.
//!
//! The store exposes a plain create/read/update/delete contract keyed by
//! user identity. Failures are generic: the engine only ever needs
//! success, not-found, or failure.

use crate::chat::UserId;
use crate::config::StoreConfig;
use crate::error::{BotError, Result};
use crate::record::PreferenceRecord;
use async_trait::async_trait;
use std::time::Duration;

/// Store contract. The engine depends on this trait, not on HTTP.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Persist a brand-new record.
    async fn create(&self, record: &PreferenceRecord) -> Result<()>;

    /// Fetch the record for a user, `None` when there is none.
    async fn read(&self, user: UserId) -> Result<Option<PreferenceRecord>>;

    /// Replace the record stored for a user.
    async fn update(&self, user: UserId, record: &PreferenceRecord) -> Result<()>;

    /// Delete the record stored for a user.
    async fn delete(&self, user: UserId) -> Result<()>;
}

/// HTTP implementation of the store contract.
///
/// Routes: `POST {base}`, `GET/PUT/DELETE {base}/{user_id}`. A 404 on read
/// maps to not-found; any other non-success status is a failure.
pub struct HttpPreferenceStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPreferenceStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BotError::Store(format!("cannot build http client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn user_url(&self, user: UserId) -> String {
        format!("{}/{user}", self.base_url)
    }
}

#[async_trait]
impl PreferenceStore for HttpPreferenceStore {
    async fn create(&self, record: &PreferenceRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.base_url)
            .json(record)
            .send()
            .await
            .map_err(|e| BotError::Store(format!("create request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(BotError::Store(format!(
                "create returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn read(&self, user: UserId) -> Result<Option<PreferenceRecord>> {
        let response = self
            .client
            .get(self.user_url(user))
            .send()
            .await
            .map_err(|e| BotError::Store(format!("read request failed: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BotError::Store(format!(
                "read returned {}",
                response.status()
            )));
        }
        let record = response
            .json::<PreferenceRecord>()
            .await
            .map_err(|e| BotError::Store(format!("read returned malformed record: {e}")))?;
        Ok(Some(record))
    }

    async fn update(&self, user: UserId, record: &PreferenceRecord) -> Result<()> {
        let response = self
            .client
            .put(self.user_url(user))
            .json(record)
            .send()
            .await
            .map_err(|e| BotError::Store(format!("update request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(BotError::Store(format!(
                "update returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<()> {
        let response = self
            .client
            .delete(self.user_url(user))
            .send()
            .await
            .map_err(|e| BotError::Store(format!("delete request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(BotError::Store(format!(
                "delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
