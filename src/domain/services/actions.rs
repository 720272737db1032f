#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;

use super::ArtifactStore;
use super::RepairConfig;
use super::RepairLoop;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::BackendBox;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::Session;
use crate::domain::models::SlashCommand;
use crate::infrastructure::backends::BackendManager;
use crate::infrastructure::runners::ProcessRunner;

pub fn help_text() -> String {
    let text = r#"
Describe a program and Mender asks the model for it, saves it, runs it, and sends any errors back to the model until it runs cleanly.

COMMANDS:
- /modellist (/ml) - Lists all available models from the backend.
- /model (/m) [MODEL_NAME,MODEL_INDEX] - Sets the model used by new sessions. You can pass either the model name, or the index from /modellist.
- /artifacts (/ls) - Lists every program generated so far.
- /quit /exit (/q) - Exit Mender.
- /help (/h) - Provides this help menu.

HOTKEYS:
- Up arrow - Scroll up
- Down arrow - Scroll down
- CTRL+U - Page up
- CTRL+D - Page down
- CTRL+C - Exit.
        "#;

    return text.trim().to_string();
}

fn send(tx: &mpsc::UnboundedSender<Event>, author: Author, text: &str) -> Result<()> {
    tx.send(Event::SessionMessage(Message::new(author, text)))?;
    return Ok(());
}

fn send_error(tx: &mpsc::UnboundedSender<Event>, text: &str) -> Result<()> {
    tx.send(Event::SessionMessage(Message::new_with_type(
        Author::System,
        MessageType::Error,
        text,
    )))?;

    return Ok(());
}

async fn model_list(backend: &BackendBox, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    let models = backend.list_models().await?;
    if models.is_empty() {
        return send(tx, Author::System, "The backend reported no models.");
    }

    let res = models
        .iter()
        .enumerate()
        .map(|(idx, model)| {
            let n = idx + 1;
            return format!("- ({n}) {model}");
        })
        .collect::<Vec<String>>();

    return send(tx, Author::System, &res.join("\n"));
}

async fn model_set(
    backend: &BackendBox,
    tx: &mpsc::UnboundedSender<Event>,
    command: &SlashCommand,
) -> Result<()> {
    let mut model_name = match command.args.first() {
        Some(arg) => arg.to_string(),
        None => {
            return send_error(
                tx,
                "You must specify a model name with `/model` or `/m`. Run `/help` for more details.",
            );
        }
    };

    let models = backend.list_models().await?;

    if let Ok(idx) = model_name.parse::<usize>() {
        if idx < 1 || idx > models.len() {
            return send_error(tx, &format!("{idx} is not a valid index from the model list."));
        }
        model_name = models[idx - 1].to_string();
    }

    if !models.contains(&model_name) {
        let backend_name = backend.name();
        return send_error(
            tx,
            &format!(
                "No model named {model_name} found in backend {backend_name}. Did you mistype it?"
            ),
        );
    }

    Config::set(ConfigKey::Model, &model_name);
    tracing::info!(model = model_name, "model changed");

    return send(
        tx,
        Author::Assistant,
        &format!("{model_name} has entered the chat."),
    );
}

async fn artifacts(store: &ArtifactStore, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    let files = store.list().await?;
    if files.is_empty() {
        return send(
            tx,
            Author::System,
            &format!("No programs generated yet in {}.", store.dir.display()),
        );
    }

    let res = files
        .iter()
        .map(|file| {
            return format!("- {}", file.display());
        })
        .collect::<Vec<String>>();

    return send(tx, Author::System, &res.join("\n"));
}

async fn handle_command(command: &SlashCommand, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    if command.is_help() {
        return send(tx, Author::System, &help_text());
    }

    if command.is_artifacts() {
        return artifacts(&ArtifactStore::default(), tx).await;
    }

    let backend = BackendManager::from_config()?;
    if command.is_model_list() {
        return model_list(&backend, tx).await;
    }

    if command.is_model_set() {
        return model_set(&backend, tx, command).await;
    }

    return Ok(());
}

async fn run_session(prompt: &str, tx: &mpsc::UnboundedSender<Event>) -> Result<Session> {
    let repair_loop = RepairLoop::new(
        BackendManager::from_config()?,
        Box::new(ProcessRunner::from_config()?),
        ArtifactStore::default(),
        RepairConfig::from_config()?,
    );

    return repair_loop.run_session(prompt, tx).await;
}

/// Runs a full session for `prompt`. Always ends with
/// `Event::SessionFinished` unless the receiving side is gone.
pub async fn session_worker(prompt: String, tx: mpsc::UnboundedSender<Event>) -> Result<Session> {
    let res = run_session(&prompt, &tx).await;
    if let Err(err) = &res {
        tracing::error!(error = ?err, "session failed to start");
        send_error(&tx, &format!("The session failed to start: {err}"))?;
    }

    tx.send(Event::SessionFinished())?;

    return res;
}

pub struct ActionsService {}

impl ActionsService {
    pub async fn start(
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        while let Some(action) = rx.recv().await {
            match action {
                Action::Prompt(text) => {
                    if let Some(command) = SlashCommand::parse(&text) {
                        if let Err(err) = handle_command(&command, &tx).await {
                            tracing::error!(error = ?err, "command failed");
                            send_error(
                                &tx,
                                &format!("The command failed with the following error: {err}"),
                            )?;
                        }
                        continue;
                    }

                    let worker_tx = tx.clone();
                    tokio::spawn(async move {
                        return session_worker(text, worker_tx).await;
                    });
                }
            }
        }

        return Ok(());
    }
}
