//! Interactive bot on stdin/stdout.
//!
//! Handlers come from `steps.json`: two `#[step]` functions referenced by
//! path and one inline script. State is kept in per-chat JSON files, so the
//! conversation resumes where it stopped across restarts.
//!
//! ```text
//! cargo run -p chatflow-demos --bin console_bot -- [steps.json] [state-dir]
//! ```
//!
//! With `--features whatsapp` and `WHATSAPP_PHONE_NUMBER_ID` /
//! `WHATSAPP_ACCESS_TOKEN` set, replies go to WhatsApp instead of stdout and
//! each input line is read as `<chat_id> <text>`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chatflow_core::{FileStateStore, MessageSender};
use chatflow_orchestrator::ChatOrchestrator;
use tokio::io::{AsyncBufReadExt, BufReader};

mod flows {
    use chatflow_core::{Context, MessageSender, StepResult, Transition, Value};
    use chatflow_macros::step;
    use serde_json::json;

    #[step]
    pub async fn greet(
        chat_id: &str,
        _user_input: &Value,
        _context: Context,
        sender: &dyn MessageSender,
    ) -> StepResult {
        sender
            .send_message(chat_id, "Hi! What's your name?", None)
            .await?;
        Ok(Transition::to("ask_name"))
    }

    #[step(path = "bot.flows.menu")]
    pub async fn menu(
        chat_id: &str,
        user_input: &Value,
        mut context: Context,
        sender: &dyn MessageSender,
    ) -> StepResult {
        let name = context
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("friend")
            .to_string();
        match user_input.as_str().map(str::trim) {
            Some("bye") => {
                sender
                    .send_message(chat_id, &format!("Bye, {name}!"), None)
                    .await?;
                Ok(Transition::to("start"))
            }
            Some("count") => {
                let count = context.get("count").and_then(Value::as_i64).unwrap_or(0) + 1;
                context.insert("count".to_string(), json!(count));
                sender
                    .send_message(chat_id, &format!("{name}, you have counted to {count}."), None)
                    .await?;
                Ok(Transition::new("menu", context))
            }
            _ => {
                sender
                    .send_message(chat_id, "I only understand 'count' and 'bye'.", None)
                    .await?;
                Ok(Transition::new("menu", context))
            }
        }
    }
}

const CONSOLE_CHAT_ID: &str = "console";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,chatflow_orchestrator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let steps = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("steps.json"));
    let state_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("chatflow-console-bot"));

    let store = FileStateStore::new(&state_dir)
        .with_context(|| format!("opening state directory {}", state_dir.display()))?;
    let (sender, remote) = sender()?;
    let mut orchestrator = ChatOrchestrator::new(store, sender);
    orchestrator
        .register_steps_from_json(&steps)
        .with_context(|| format!("loading {}", steps.display()))?;
    tracing::info!(
        states = ?orchestrator.registry().state_ids(),
        state_dir = %state_dir.display(),
        "console bot ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (chat_id, text) = if remote {
            match line.split_once(' ') {
                Some((chat_id, text)) => (chat_id.to_string(), text.to_string()),
                None => {
                    eprintln!("expected '<chat_id> <text>'");
                    continue;
                }
            }
        } else {
            (CONSOLE_CHAT_ID.to_string(), line)
        };
        if let Err(err) = orchestrator.handle_message(&chat_id, text).await {
            tracing::error!(chat_id = %chat_id, error = %err, "message failed");
            if err.is_configuration() {
                return Err(err.into());
            }
        }
    }
    Ok(())
}

#[cfg(feature = "whatsapp")]
fn sender() -> anyhow::Result<(Arc<dyn MessageSender>, bool)> {
    let config = chatflow_whatsapp::WhatsAppConfig::from_env()?;
    Ok((
        Arc::new(chatflow_whatsapp::WhatsAppSender::from_config(config)),
        true,
    ))
}

#[cfg(not(feature = "whatsapp"))]
fn sender() -> anyhow::Result<(Arc<dyn MessageSender>, bool)> {
    Ok((Arc::new(chatflow_core::ConsoleMessageSender::new()), false))
}
