//! JSON-lines front end over stdin/stdout. Each input line is one command; each
//! command gets exactly one reply line.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::models::{FocusStart, Observation};
use crate::session::SessionController;

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Focus { target: String },
    Start(FocusStart),
    Event(Observation),
    Status,
    Suggest { task: String },
    Models,
}

pub async fn handle_line(controller: &SessionController, line: &str) -> Value {
    let command = match serde_json::from_str::<Command>(line) {
        Ok(command) => command,
        Err(err) => return error_reply(format!("invalid command: {err}")),
    };

    match command {
        Command::Focus { target } => match controller.update_focus_target(&target).await {
            Ok(focus_target) => json!({ "ok": true, "focus_target": focus_target }),
            Err(err) => error_reply(err.to_string()),
        },
        Command::Start(request) => match controller.start_focus_request(&request).await {
            Ok(session) => json!({ "ok": true, "session": session }),
            Err(err) => error_reply(err.to_string()),
        },
        Command::Event(observation) => to_reply(&controller.ingest(observation).await),
        Command::Status => to_reply(&controller.status().await),
        Command::Suggest { task } => to_reply(&controller.suggest_tasks(&task).await),
        Command::Models => controller.model_info().await,
    }
}

/// Reads commands until EOF. Bad lines get an error reply; only I/O errors stop the loop.
pub async fn serve<R, W>(controller: &SessionController, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(controller, &line).await;
        let mut encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
        encoded.push('\n');
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
        writer.flush().await.context("failed to flush reply")?;
    }
    Ok(())
}

fn to_reply<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| error_reply(err.to_string()))
}

fn error_reply(message: String) -> Value {
    json!({ "ok": false, "error": message })
}
