//! Per-chat recurring job registry.
//!
//! At most one job exists per chat identity: scheduling for a chat that
//! already has a job first cancels the old one under the same registry lock
//! (replace, not stack). Each job is a spawned tokio task driving a fixed
//! interval with an immediate first fire; firings are delivered as
//! [`JobFire`] values over the channel handed out at construction, keeping
//! the registry decoupled from whatever executes or reports the work.
//!
//! Nothing is persisted: a process restart loses every schedule and users
//! re-establish them.

use crate::chat::ChatId;
use crate::record::PreferenceRecord;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One firing of a scheduled job.
///
/// Carries the preference snapshot taken at schedule time, re-delivered
/// verbatim on every firing (deliberately not re-fetched from the store).
#[derive(Debug, Clone)]
pub struct JobFire {
    pub chat: ChatId,
    pub payload: PreferenceRecord,
}

/// Registry of recurring jobs, keyed by chat identity.
pub struct JobRegistry {
    jobs: Mutex<HashMap<ChatId, JoinHandle<()>>>,
    fire_tx: mpsc::UnboundedSender<JobFire>,
}

impl JobRegistry {
    /// Create a registry and the receiving end of its fire channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobFire>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        (
            Self {
                jobs: Mutex::new(HashMap::new()),
                fire_tx,
            },
            fire_rx,
        )
    }

    /// Register a recurring job for a chat, replacing any existing one.
    ///
    /// The first fire is immediate. Returns whether a previous job for this
    /// chat was cancelled by the replacement.
    pub fn schedule(&self, chat: ChatId, interval: Duration, payload: PreferenceRecord) -> bool {
        // tokio panics on a zero interval; clamp rather than propagate.
        let interval = interval.max(Duration::from_millis(1));

        // Abort the old job and register the new one under one lock, so two
        // jobs for the same chat are never live at once.
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let replaced = jobs.remove(&chat).is_some_and(|old| {
            old.abort();
            info!("replaced existing job for chat {chat}");
            true
        });

        let fire_tx = self.fire_tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let fire = JobFire {
                    chat,
                    payload: payload.clone(),
                };
                if fire_tx.send(fire).is_err() {
                    debug!("fire channel closed, stopping job for chat {chat}");
                    break;
                }
            }
        });
        jobs.insert(chat, task);
        replaced
    }

    /// Cancel the job for a chat if one exists. Returns whether one did.
    pub fn cancel_if_exists(&self, chat: ChatId) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.remove(&chat) {
            Some(task) => {
                task.abort();
                info!("cancelled job for chat {chat}");
                true
            }
            None => false,
        }
    }

    /// Whether a job is currently registered for a chat.
    pub fn is_scheduled(&self, chat: ChatId) -> bool {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&chat)
    }

    /// Number of registered jobs.
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for JobRegistry {
    fn drop(&mut self) {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        for task in jobs.values() {
            task.abort();
        }
    }
}
