//! The bot engine: command routing, per-chat sessions, and job delivery.
//!
//! The engine consumes [`InboundMessage`]s from whatever transport feeds it
//! and emits [`OutboundMessage`]s on the channel handed out at construction.
//! Conversations run one state per incoming message; each chat owns its own
//! session entry, so concurrent chats never share cursor state. Scheduler
//! firings each run on their own spawned task: a running scrape never blocks
//! conversation handling or another chat's delivery.

use crate::catalog::Catalog;
use crate::chat::{ChatId, InboundBody, InboundMessage, OutboundMessage, UserId};
use crate::config::BotConfig;
use crate::error::Result;
use crate::flow::{
    ABORT_TEXT, CreateFlow, CreateStep, DeleteFlow, DeleteStep, FlowReply, UpdateFlow, UpdateStep,
};
use crate::invoker::{ScrapeOutcome, TaskInvoker};
use crate::record::PreferenceRecord;
use crate::scheduler::JobRegistry;
use crate::store::PreferenceStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Commands the engine understands, with their help descriptions.
const COMMANDS: &[(&str, &str)] = &[
    ("/create", "create a new preference"),
    ("/read", "show your stored preference"),
    ("/update", "update your stored preference"),
    ("/delete", "delete your stored preference"),
    ("/schedule_scraper", "run the scraper on a schedule"),
    ("/stop_scraper", "stop the scheduled scraper"),
    ("/cancel", "stop the current operation"),
    ("/help", "show this list"),
];

/// An in-progress conversation for one chat.
enum ActiveFlow {
    Create(CreateFlow),
    Update { user: UserId, flow: UpdateFlow },
    Delete { user: UserId, flow: DeleteFlow },
}

/// The engine. One instance serves every chat.
pub struct Bot {
    catalog: Catalog,
    store: Arc<dyn PreferenceStore>,
    sessions: Mutex<HashMap<ChatId, ActiveFlow>>,
    scheduler: JobRegistry,
    interval_base: Duration,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Bot {
    /// Build the engine and start its scrape-delivery task.
    ///
    /// Returns the engine and the outbound message stream the transport
    /// should drain. Must be called inside a tokio runtime.
    pub fn new(
        config: &BotConfig,
        store: Arc<dyn PreferenceStore>,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>)> {
        let invoker = Arc::new(TaskInvoker::new(&config.scraper)?);
        let (scheduler, mut fire_rx) = JobRegistry::new();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let bot = Arc::new(Self {
            catalog: Catalog,
            store,
            sessions: Mutex::new(HashMap::new()),
            scheduler,
            interval_base: Duration::from_secs(config.scraper.interval_base_secs),
            out_tx: out_tx.clone(),
        });

        // Delivery loop: every job firing becomes one scraper call and one
        // outbound message. Each firing runs on its own task so one chat's
        // slow scrape never holds up another chat's delivery.
        tokio::spawn(async move {
            while let Some(fire) = fire_rx.recv().await {
                let invoker = Arc::clone(&invoker);
                let out_tx = out_tx.clone();
                tokio::spawn(async move {
                    let outcome = invoker.invoke(&fire.payload).await;
                    let message = OutboundMessage::text(fire.chat, render_outcome(&outcome));
                    if out_tx.send(message).is_err() {
                        debug!("outbound channel closed, dropping scrape result");
                    }
                });
            }
        });

        Ok((bot, out_rx))
    }

    /// The job registry, exposed for inspection.
    pub fn scheduler(&self) -> &JobRegistry {
        &self.scheduler
    }

    /// Whether a conversation is in progress for a chat.
    pub fn has_session(&self, chat: ChatId) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&chat)
    }

    /// Process one inbound chat event.
    pub async fn handle(&self, msg: InboundMessage) -> Result<()> {
        match &msg.body {
            InboundBody::Command(cmd) => self.handle_command(msg.chat, msg.user, cmd).await,
            InboundBody::Text(input) | InboundBody::Selection(input) => {
                self.step_session(msg.chat, input).await
            }
        }
    }

    async fn handle_command(&self, chat: ChatId, user: UserId, cmd: &str) -> Result<()> {
        // /cancel works from any state and always clears the session.
        if cmd == "cancel" {
            self.clear_session(chat);
            self.send(OutboundMessage::text(chat, "Operation cancelled..."));
            return Ok(());
        }

        if self.has_session(chat) {
            self.send(OutboundMessage::text(
                chat,
                "Another operation is in progress, type /cancel to stop it first",
            ));
            return Ok(());
        }

        match cmd {
            "start" => {
                let mut text = String::from(
                    "Hello! Towkay is here to help you find your next dream home!\n\n",
                );
                text.push_str(&help_text());
                self.send(OutboundMessage::text(chat, text));
            }
            "help" => self.send(OutboundMessage::text(chat, help_text())),
            "create" => self.begin_create(chat, user).await?,
            "read" => {
                if let Some(record) = self.read_or_report(chat, user).await? {
                    self.send_record(chat, "Preference found:", &record);
                }
            }
            "update" => self.begin_update(chat, user).await?,
            "delete" => self.begin_delete(chat, user).await?,
            "schedule_scraper" => self.schedule_scraper(chat, user).await?,
            "stop_scraper" => {
                let removed = self.scheduler.cancel_if_exists(chat);
                let text = if removed {
                    "Pending job removed successfully, scraping stopped..."
                } else {
                    "No pending job to remove..."
                };
                self.send(OutboundMessage::text(chat, text));
            }
            other => {
                debug!("unknown command `{other}` from chat {chat}");
                self.send(OutboundMessage::text(
                    chat,
                    "Sorry, I didn't understand that command.",
                ));
            }
        }
        Ok(())
    }

    async fn begin_create(&self, chat: ChatId, user: UserId) -> Result<()> {
        // At most one record per user, enforced here rather than at the store.
        match self.store.read(user).await {
            Err(e) => {
                warn!("create blocked, store read failed: {e}");
                self.send(OutboundMessage::text(chat, STORE_FAILURE_TEXT));
            }
            Ok(Some(_)) => {
                self.send(OutboundMessage::text(
                    chat,
                    "Existing preference exists, please delete it first",
                ));
            }
            Ok(None) => {
                let (flow, reply) = CreateFlow::begin(user);
                self.put_session(chat, ActiveFlow::Create(flow));
                self.send_reply(chat, reply);
            }
        }
        Ok(())
    }

    async fn begin_update(&self, chat: ChatId, user: UserId) -> Result<()> {
        let Some(record) = self.read_or_report(chat, user).await? else {
            return Ok(());
        };
        self.send_record(chat, "Preference found:", &record);
        let (flow, reply) = UpdateFlow::begin(record);
        self.put_session(chat, ActiveFlow::Update { user, flow });
        self.send_reply(chat, reply);
        Ok(())
    }

    async fn begin_delete(&self, chat: ChatId, user: UserId) -> Result<()> {
        let Some(record) = self.read_or_report(chat, user).await? else {
            return Ok(());
        };
        self.send_record(chat, "Preference found:", &record);
        let (flow, reply) = DeleteFlow::begin();
        self.put_session(chat, ActiveFlow::Delete { user, flow });
        self.send_reply(chat, reply);
        Ok(())
    }

    async fn schedule_scraper(&self, chat: ChatId, user: UserId) -> Result<()> {
        let Some(record) = self.read_or_report(chat, user).await? else {
            return Ok(());
        };
        let Some(frequency) = record.get_int("job_frequency_hours").filter(|f| *f > 0) else {
            self.send(OutboundMessage::text(
                chat,
                "Error with previous preference, please create new preference",
            ));
            return Ok(());
        };

        self.send_record(chat, "Preference found:", &record);
        let interval = self.interval_base * u32::try_from(frequency).unwrap_or(u32::MAX);
        let replaced = self.scheduler.schedule(chat, interval, record);
        info!("scheduled scraper for chat {chat} every {frequency} hour(s)");

        let mut text = String::new();
        if replaced {
            text.push_str("Cleared job queue...\n\n");
        }
        text.push_str(&format!(
            "Scraping scheduled for every {frequency} hour(s) for the above preferences\n\
             Type /stop_scraper to stop the scraping process at any time"
        ));
        self.send(OutboundMessage::text(chat, text));
        Ok(())
    }

    /// Advance the chat's active conversation by one input.
    async fn step_session(&self, chat: ChatId, input: &str) -> Result<()> {
        // Take the flow out while stepping so the lock is never held across
        // an await; it is re-inserted unless the flow reached a terminal
        // state. One answer at a time per chat is the engine's contract.
        let Some(flow) = self.take_session(chat) else {
            debug!("ignoring non-command input for chat {chat} with no active conversation");
            return Ok(());
        };

        match flow {
            ActiveFlow::Create(mut create) => match create.handle(input) {
                CreateStep::Ask(replies) => {
                    self.put_session(chat, ActiveFlow::Create(create));
                    for reply in replies {
                        self.send_reply(chat, reply);
                    }
                }
                CreateStep::Aborted => self.send(OutboundMessage::text(chat, ABORT_TEXT)),
                CreateStep::Commit(record) => match self.store.create(&record).await {
                    Ok(()) => {
                        let mut text = String::from("Successfully created preference!\n\n");
                        text.push_str(&record.render(&self.catalog));
                        text.push_str("\nType /schedule_scraper to run your scraper");
                        self.send(OutboundMessage::text(chat, text));
                    }
                    Err(e) => {
                        warn!("create commit failed: {e}");
                        self.send(OutboundMessage::text(chat, "Error saving preference..."));
                    }
                },
            },
            ActiveFlow::Update {
                user,
                flow: mut update,
            } => {
                match update.handle(input) {
                    UpdateStep::Ask(replies) => {
                        self.put_session(
                            chat,
                            ActiveFlow::Update { user, flow: update },
                        );
                        for reply in replies {
                            self.send_reply(chat, reply);
                        }
                    }
                    UpdateStep::Aborted => self.send(OutboundMessage::text(chat, ABORT_TEXT)),
                    UpdateStep::Commit(record) => match self.store.update(user, &record).await {
                        Ok(()) => {
                            let mut text = String::from("Successfully updated preferences!\n\n");
                            text.push_str(&record.render(&self.catalog));
                            text.push_str("\nType /schedule_scraper to run your scraper");
                            self.send(OutboundMessage::text(chat, text));
                        }
                        Err(e) => {
                            warn!("update commit failed: {e}");
                            self.send(OutboundMessage::text(chat, "Error updating preferences..."));
                        }
                    },
                }
            }
            ActiveFlow::Delete {
                user,
                flow: mut delete,
            } => {
                match delete.handle(input) {
                    DeleteStep::Aborted => self.send(OutboundMessage::text(chat, ABORT_TEXT)),
                    DeleteStep::Confirmed => match self.store.delete(user).await {
                        Ok(()) => {
                            self.send(OutboundMessage::text(chat, "Deletion successful..."))
                        }
                        Err(e) => {
                            warn!("delete failed: {e}");
                            self.send(OutboundMessage::text(chat, "Deletion failed..."));
                        }
                    },
                }
            }
        }
        Ok(())
    }

    /// Read the user's record, reporting not-found or store failure to the
    /// chat. Returns the record only when the caller should proceed.
    async fn read_or_report(&self, chat: ChatId, user: UserId) -> Result<Option<PreferenceRecord>> {
        match self.store.read(user).await {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.send(OutboundMessage::text(
                    chat,
                    "No existing preference found, please create one first",
                ));
                Ok(None)
            }
            Err(e) => {
                warn!("store read failed for user {user}: {e}");
                self.send(OutboundMessage::text(chat, STORE_FAILURE_TEXT));
                Ok(None)
            }
        }
    }

    fn send_record(&self, chat: ChatId, heading: &str, record: &PreferenceRecord) {
        let text = format!("{heading}\n\n{}", record.render(&self.catalog));
        self.send(OutboundMessage::text(chat, text));
    }

    fn send_reply(&self, chat: ChatId, reply: FlowReply) {
        let message = OutboundMessage {
            chat,
            text: reply.text,
            options: reply.options,
            force_reply: reply.force_reply,
        };
        self.send(message);
    }

    fn send(&self, message: OutboundMessage) {
        if self.out_tx.send(message).is_err() {
            warn!("outbound channel closed, dropping message");
        }
    }

    fn put_session(&self, chat: ChatId, flow: ActiveFlow) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(chat, flow);
    }

    fn take_session(&self, chat: ChatId) -> Option<ActiveFlow> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&chat)
    }

    fn clear_session(&self, chat: ChatId) {
        self.take_session(chat);
    }
}

const STORE_FAILURE_TEXT: &str = "Something went wrong talking to the preference store...";

/// Render a scrape outcome for the owning chat.
///
/// Empty results and failure are deliberately distinct messages.
pub fn render_outcome(outcome: &ScrapeOutcome) -> String {
    match outcome {
        ScrapeOutcome::Failure => "An error occurred when running scraper...".to_owned(),
        ScrapeOutcome::Results(listings) if listings.is_empty() => {
            "No new listings found".to_owned()
        }
        ScrapeOutcome::Results(listings) => {
            let mut text = String::from("New listings found!\n");
            for listing in listings {
                text.push_str(&format!("\n{}\n{}\n", listing.title, listing.link));
            }
            text
        }
    }
}

fn help_text() -> String {
    let mut text = String::from("Here are the commands that you can run:\n\n");
    for (command, description) in COMMANDS {
        text.push_str(&format!("{command}: {description}\n"));
    }
    text
}
