//! Local console harness for the bot engine.
//!
//! Reads one input per line from stdin and prints the engine's replies to
//! stdout, driving a single fixed chat identity against the configured
//! store and scraper endpoints. Lines starting with `/` are commands; a
//! line starting with `=` is treated as a keyboard selection; anything else
//! is free text.
//!
//! Tracing goes to stderr so stdout stays a clean conversation view.

use std::sync::Arc;
use towkay::bot::Bot;
use towkay::chat::{ChatId, InboundBody, InboundMessage, UserId};
use towkay::config::BotConfig;
use towkay::store::HttpPreferenceStore;

const REPL_CHAT: ChatId = ChatId(0);
const REPL_USER: UserId = UserId(0);

#[tokio::main]
async fn main() -> towkay::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = BotConfig::default_config_path();
    let config = if config_path.exists() {
        BotConfig::from_file(&config_path)?
    } else {
        tracing::info!("no config at {}, using defaults", config_path.display());
        BotConfig::default()
    };

    let store = Arc::new(HttpPreferenceStore::new(&config.store)?);
    let (bot, mut out_rx) = Bot::new(&config, store)?;

    // Printer task: scrape results arrive here too, not just direct replies.
    let printer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            println!("{}", message.text);
            if !message.options.is_empty() {
                println!("  [{}]", message.options.join(" | "));
            }
        }
    });

    tracing::info!("towkay repl ready, type /start");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let body = if let Some(cmd) = input.strip_prefix('/') {
            InboundBody::Command(cmd.to_owned())
        } else if let Some(selection) = input.strip_prefix('=') {
            InboundBody::Selection(selection.trim().to_owned())
        } else {
            InboundBody::Text(input.to_owned())
        };

        bot.handle(InboundMessage {
            chat: REPL_CHAT,
            user: REPL_USER,
            body,
        })
        .await?;

        // Give replies a moment to land before the next prompt line.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    printer.abort();
    tracing::info!("towkay repl shut down");
    Ok(())
}
