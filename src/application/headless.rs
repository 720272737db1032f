#[cfg(test)]
#[path = "headless_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::Author;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::services::actions::session_worker;

fn format_message(message: &Message) -> String {
    return format!("{}: {}", message.label(), message.text);
}

fn paint_message(message: &Message) -> String {
    let text = format_message(message);
    if message.message_type() == MessageType::Error {
        return Paint::red(text).to_string();
    }

    return match message.author {
        Author::System => Paint::yellow(text).to_string(),
        Author::Assistant => Paint::cyan(text).to_string(),
        Author::User => text,
    };
}

/// Runs a single session, printing every notification as it arrives.
/// Resolves to true when the program ended up running cleanly.
pub async fn run(prompt: String) -> Result<bool> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let worker = tokio::spawn(session_worker(prompt, tx));

    while let Some(event) = rx.recv().await {
        if let Event::SessionMessage(message) = event {
            println!("{}\n", paint_message(&message));
        }
    }

    let session = worker.await??;
    if !session.state.is_terminal() {
        bail!("The session stopped before finishing: {:?}", session.state);
    }

    if let Some(reason) = session.abort_reason() {
        tracing::info!(
            prompt = session.user_prompt,
            reason = reason.to_string(),
            "session aborted"
        );
        eprintln!("{}", Paint::red(format!("Session aborted: {reason}.")));
        return Ok(false);
    }

    return Ok(true);
}
