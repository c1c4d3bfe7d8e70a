//! Engine-level conversation walks against an in-memory store.
//!
//! These drive the full `Bot` through inbound messages and assert on the
//! outbound stream and on store side effects: create/update/delete flows,
//! the duplicate-create guard, cancellation, scheduling, and end-to-end
//! scrape delivery against a mock scraper endpoint.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use towkay::bot::Bot;
use towkay::catalog::Catalog;
use towkay::chat::{ChatId, InboundBody, InboundMessage, OutboundMessage, UserId};
use towkay::config::BotConfig;
use towkay::error::{BotError, Result};
use towkay::record::{FieldValue, PreferenceRecord};
use towkay::store::PreferenceStore;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT: ChatId = ChatId(42);
const USER: UserId = UserId(42);

/// In-memory store that counts write attempts and can be forced to fail.
#[derive(Default)]
struct MemoryStore {
    records: Mutex<HashMap<i64, PreferenceRecord>>,
    writes: AtomicUsize,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    fn seeded(record: PreferenceRecord) -> Self {
        let store = Self::default();
        store
            .records
            .lock()
            .expect("lock")
            .insert(record.user_id, record);
        store
    }

    fn record_for(&self, user: UserId) -> Option<PreferenceRecord> {
        self.records.lock().expect("lock").get(&user.0).cloned()
    }

    fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BotError::Store("injected write failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn create(&self, record: &PreferenceRecord) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .expect("lock")
            .insert(record.user_id, record.clone());
        Ok(())
    }

    async fn read(&self, user: UserId) -> Result<Option<PreferenceRecord>> {
        Ok(self.record_for(user))
    }

    async fn update(&self, user: UserId, record: &PreferenceRecord) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .expect("lock")
            .insert(user.0, record.clone());
        Ok(())
    }

    async fn delete(&self, user: UserId) -> Result<()> {
        self.check_writable()?;
        self.records.lock().expect("lock").remove(&user.0);
        Ok(())
    }
}

fn stored_record() -> PreferenceRecord {
    record_owned_by(USER)
}

fn record_owned_by(user: UserId) -> PreferenceRecord {
    let mut record = PreferenceRecord::new(user);
    record.set("property_type", FieldValue::Text("HDB".to_owned()));
    record.set("property_type_code", FieldValue::Text("4 ROOM".to_owned()));
    record.set("district", FieldValue::Text("075".to_owned()));
    record.set("min_price", FieldValue::Int(300_000));
    record.set("max_price", FieldValue::Int(550_000));
    record.set("job_frequency_hours", FieldValue::Int(6));
    record
}

fn make_bot(
    store: Arc<MemoryStore>,
) -> (Arc<Bot>, mpsc::UnboundedReceiver<OutboundMessage>) {
    Bot::new(&BotConfig::default(), store).expect("build bot")
}

async fn command(bot: &Bot, cmd: &str) {
    bot.handle(InboundMessage {
        chat: CHAT,
        user: USER,
        body: InboundBody::Command(cmd.to_owned()),
    })
    .await
    .expect("handle command");
}

async fn answer(bot: &Bot, input: &str) {
    bot.handle(InboundMessage {
        chat: CHAT,
        user: USER,
        body: InboundBody::Text(input.to_owned()),
    })
    .await
    .expect("handle input");
}

async fn next_text(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> String {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("reply in time")
        .expect("channel open")
        .text
}

/// Receive until a reply containing `needle` arrives, skipping unrelated
/// messages (scrape outcomes may interleave with conversation replies).
async fn wait_for_text(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>, needle: &str) -> String {
    timeout(Duration::from_secs(5), async {
        loop {
            let text = rx.recv().await.expect("channel open").text;
            if text.contains(needle) {
                return text;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no reply containing `{needle}` arrived"))
}

async fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(message) = rx.try_recv() {
        texts.push(message.text);
    }
    texts
}

// ── Create ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_walk_persists_a_complete_record() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    for input in ["Yes", "HDB", "4 ROOM", "075 Tanjong Pagar", "300000", "550000", "6"] {
        answer(&bot, input).await;
    }

    let texts = drain(&mut rx).await;
    assert!(
        texts.iter().any(|t| t.contains("Successfully created preference!")),
        "no success message in {texts:?}"
    );

    let record = store.record_for(USER).expect("record persisted");
    assert!(record.covers(&Catalog));
    assert_eq!(record.get_text("district"), "075");
    assert_eq!(record.get_int("job_frequency_hours"), Some(6));
    assert!(!bot.has_session(CHAT), "session should be discarded");
}

#[tokio::test]
async fn create_is_blocked_when_a_record_exists() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;

    let text = next_text(&mut rx).await;
    assert!(text.contains("Existing preference exists"));
    assert_eq!(store.write_count(), 0, "no store write may be issued");
    assert!(!bot.has_session(CHAT));
}

#[tokio::test]
async fn create_declined_at_gate_writes_nothing() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    answer(&bot, "No").await;

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Ending current operation")));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn invalid_answers_reprompt_and_do_not_lose_position() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    for input in ["Yes", "HDB", "4 ROOM", "075", "abc", "-5", "300000", "550000", "0", "6"] {
        answer(&bot, input).await;
    }

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("please type a number")));
    assert!(texts.iter().any(|t| t.contains("please type a positive number")));

    let record = store.record_for(USER).expect("record persisted");
    assert_eq!(record.get_int("min_price"), Some(300_000));
    assert_eq!(record.get_int("job_frequency_hours"), Some(6));
}

#[tokio::test]
async fn create_commit_failure_reports_and_discards_cursor() {
    let store = Arc::new(MemoryStore::default());
    store.fail_writes.store(true, Ordering::SeqCst);
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    for input in ["Yes", "HDB", "4 ROOM", "075", "300000", "550000", "6"] {
        answer(&bot, input).await;
    }

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Error saving preference")));
    assert!(!bot.has_session(CHAT), "cursor is discarded, no retry");
}

// ── Update ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_edits_then_submit_covers_every_field() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "update").await;
    answer(&bot, "Yes").await;
    answer(&bot, "max price").await;
    answer(&bot, "600000").await;
    answer(&bot, "district").await;
    answer(&bot, "101 Bukit Timah").await;
    answer(&bot, "Submit").await;

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Successfully updated preferences!")));

    let record = store.record_for(USER).expect("record persisted");
    assert!(record.covers(&Catalog), "submitted payload must be complete");
    assert_eq!(record.get_int("max_price"), Some(600_000));
    assert_eq!(record.get_text("district"), "101");
    assert_eq!(record.get_text("property_type"), "HDB");
}

#[tokio::test]
async fn update_cancel_discards_pending_edits() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "update").await;
    answer(&bot, "Yes").await;
    answer(&bot, "min price").await;
    answer(&bot, "999999").await;
    answer(&bot, "Cancel").await;

    drain(&mut rx).await;
    assert_eq!(store.write_count(), 0);
    let record = store.record_for(USER).expect("record untouched");
    assert_eq!(record.get_int("min_price"), Some(300_000));
}

#[tokio::test]
async fn update_without_a_record_terminates_immediately() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "update").await;

    let text = next_text(&mut rx).await;
    assert!(text.contains("No existing preference found"));
    assert!(!bot.has_session(CHAT));
}

// ── Delete ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_confirmed_removes_the_record() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "delete").await;
    answer(&bot, "Yes").await;

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Deletion successful")));
    assert!(store.record_for(USER).is_none());
}

#[tokio::test]
async fn delete_declined_keeps_the_record() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "delete").await;
    answer(&bot, "No").await;

    drain(&mut rx).await;
    assert!(store.record_for(USER).is_some());
    assert_eq!(store.write_count(), 0);
}

// ── Cancellation and session isolation ──────────────────────────────────

#[tokio::test]
async fn cancel_clears_the_session_from_any_state() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    answer(&bot, "Yes").await;
    answer(&bot, "HDB").await;
    assert!(bot.has_session(CHAT));

    command(&bot, "cancel").await;
    assert!(!bot.has_session(CHAT));

    // A fresh create starts from the first field, not mid-form.
    command(&bot, "create").await;
    answer(&bot, "Yes").await;
    let texts = drain(&mut rx).await;
    let first_field = texts
        .iter()
        .rev()
        .find(|t| t.contains("Choose - "))
        .expect("field prompt");
    assert!(first_field.contains("property type"), "stale cursor survived");
}

#[tokio::test]
async fn conversations_for_distinct_chats_are_isolated() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    let other_chat = ChatId(7);
    let other_user = UserId(7);

    command(&bot, "create").await;
    answer(&bot, "Yes").await;
    answer(&bot, "HDB").await;

    bot.handle(InboundMessage {
        chat: other_chat,
        user: other_user,
        body: InboundBody::Command("create".to_owned()),
    })
    .await
    .expect("second chat create");
    bot.handle(InboundMessage {
        chat: other_chat,
        user: other_user,
        body: InboundBody::Text("Yes".to_owned()),
    })
    .await
    .expect("second chat confirm");

    drain(&mut rx).await;

    // First chat is mid-form at property_type_code; second is at field one.
    answer(&bot, "4 ROOM").await;
    let texts = drain(&mut rx).await;
    assert!(
        texts.iter().any(|t| t.contains("Choose - district")),
        "first chat should be at district, got {texts:?}"
    );
    assert!(bot.has_session(other_chat));
}

#[tokio::test]
async fn command_during_active_session_is_refused() {
    let store = Arc::new(MemoryStore::default());
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "create").await;
    answer(&bot, "Yes").await;
    command(&bot, "read").await;

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Another operation is in progress")));
    assert!(bot.has_session(CHAT), "active flow must survive");
}

// ── Scheduling and delivery ─────────────────────────────────────────────

#[tokio::test]
async fn schedule_replaces_and_stop_clears() {
    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "schedule_scraper").await;
    assert!(bot.scheduler().is_scheduled(CHAT));
    assert_eq!(bot.scheduler().active_jobs(), 1);

    command(&bot, "schedule_scraper").await;
    assert_eq!(bot.scheduler().active_jobs(), 1, "replace, not stack");
    wait_for_text(&mut rx, "Cleared job queue").await;

    command(&bot, "stop_scraper").await;
    assert!(!bot.scheduler().is_scheduled(CHAT));
    wait_for_text(&mut rx, "scraping stopped").await;

    command(&bot, "stop_scraper").await;
    wait_for_text(&mut rx, "No pending job to remove").await;
}

#[tokio::test]
async fn schedule_without_frequency_reports_bad_preference() {
    let mut record = stored_record();
    record.set("job_frequency_hours", FieldValue::Text("soon".to_owned()));
    let store = Arc::new(MemoryStore::seeded(record));
    let (bot, mut rx) = make_bot(Arc::clone(&store));

    command(&bot, "schedule_scraper").await;

    let texts = drain(&mut rx).await;
    assert!(texts.iter().any(|t| t.contains("Error with previous preference")));
    assert!(!bot.scheduler().is_scheduled(CHAT));
}

#[tokio::test]
async fn scheduled_job_delivers_scrape_results_to_the_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "statusCode": 200,
            "body": "[[\"Cosy 4 ROOM\", \"https://example.com/1\"]]"
        })))
        .mount(&server)
        .await;

    let mut config = BotConfig::default();
    config.scraper.endpoint = format!("{}/scrape", server.uri());
    // One "hour" lasts one second so the first firing arrives immediately.
    config.scraper.interval_base_secs = 1;

    let store = Arc::new(MemoryStore::seeded(stored_record()));
    let (bot, mut rx) = Bot::new(&config, store).expect("build bot");

    command(&bot, "schedule_scraper").await;

    let deadline = Duration::from_secs(5);
    let result = timeout(deadline, async {
        loop {
            let text = rx.recv().await.expect("channel open").text;
            if text.contains("New listings found!") {
                assert!(text.contains("https://example.com/1"));
                return;
            }
        }
    })
    .await;
    assert!(result.is_ok(), "scrape result never delivered");
}

#[tokio::test]
async fn slow_scrape_for_one_chat_does_not_delay_another() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(serde_json::json!({ "user_id": 1 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(serde_json::json!({ "statusCode": 200, "body": "[]" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(serde_json::json!({ "user_id": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "statusCode": 200,
            "body": "[]"
        })))
        .mount(&server)
        .await;

    let mut config = BotConfig::default();
    config.scraper.endpoint = format!("{}/scrape", server.uri());
    config.scraper.interval_base_secs = 1;

    let store = Arc::new(MemoryStore::default());
    for user in [1, 2] {
        let record = record_owned_by(UserId(user));
        store.records.lock().expect("lock").insert(user, record);
    }
    let (bot, mut rx) = Bot::new(&config, Arc::clone(&store) as Arc<dyn PreferenceStore>).expect("build bot");

    // The slow chat schedules first, so its scrape is already in flight
    // when the fast chat's firing arrives.
    for id in [1, 2] {
        bot.handle(InboundMessage {
            chat: ChatId(id),
            user: UserId(id),
            body: InboundBody::Command("schedule_scraper".to_owned()),
        })
        .await
        .expect("schedule");
    }

    // Well under the slow mock's 5 s delay: the fast chat's outcome must
    // not queue behind the slow chat's scrape.
    timeout(Duration::from_secs(3), async {
        loop {
            let message = rx.recv().await.expect("channel open");
            if message.chat == ChatId(2) && message.text.contains("No new listings") {
                return;
            }
        }
    })
    .await
    .expect("fast chat's delivery queued behind the slow chat's scrape");
}
