//! Echo Bot
//!
//! A small demonstration bot: logs every message, echoes `/echo <text>`,
//! answers `/ping`, and greets members joining the villa.
//!
//! Configure the bot credentials in `veranda.toml`:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 13350
//!
//! [[bots]]
//! bot_id = "bot_xxxxxxxx"
//! secret = "..."
//! pub_key = """
//! -----BEGIN PUBLIC KEY-----
//! ...
//! -----END PUBLIC KEY-----
//! """
//! callback_path = "/callback"
//! ```
//!
//! Then run:
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use anyhow::Result;
use tracing::{error, info};
use veranda::prelude::*;

/// Logs every message event. Runs for all messages, never blocks.
async fn log_message(event: EventCtx<SendMessageEvent>) {
    info!(
        villa_id = event.villa_id,
        room_id = event.room_id,
        "[{}] {}",
        event.nickname,
        event.message.plain_text()
    );
}

/// Echoes everything after `/echo `.
async fn echo(event: EventCtx<SendMessageEvent>, bot: BotApi<VillaBot>) {
    let text = event.message.plain_text();
    if let Some(content) = text.trim().strip_prefix("/echo ")
        && let Err(e) = bot.send(event.root.as_ref(), content.into()).await
    {
        error!(error = %e, "failed to send echo reply");
    }
}

/// Answers `/ping` with a pong.
async fn ping(event: EventCtx<SendMessageEvent>) -> Option<String> {
    (event.message.plain_text().trim() == "/ping").then(|| "pong!".to_string())
}

/// Greets members joining the villa. Join events carry no room to reply
/// into, so this only logs.
async fn welcome(event: EventCtx<JoinVillaEvent>) {
    info!(
        uid = event.join_uid,
        "{} joined the villa", event.join_user_nickname
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = VillaRuntime::new();

    let bot_ids: Vec<String> = runtime
        .config()
        .bots
        .iter()
        .map(|b| b.bot_id.clone())
        .collect();
    if bot_ids.is_empty() {
        anyhow::bail!("no bots configured; add a [[bots]] entry to veranda.toml");
    }

    for bot_id in bot_ids {
        runtime.register_from_config(
            &bot_id,
            vec![
                on_message().name("log").priority(0).handler(log_message),
                on_startswith(["/echo "]).priority(1).handler(echo),
                on_startswith(["/ping"])
                    .priority(1)
                    .block(true)
                    .handler(ping),
                on_join_villa().handler(welcome),
            ],
        )?;
    }

    runtime.run().await?;
    Ok(())
}
