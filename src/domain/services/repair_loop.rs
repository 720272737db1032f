#[cfg(test)]
#[path = "repair_loop_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use super::code_extractor;
use super::ArtifactStore;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AbortReason;
use crate::domain::models::Author;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatMessage;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::Role;
use crate::domain::models::RunnerBox;
use crate::domain::models::Session;
use crate::domain::models::SessionState;

pub const SYSTEM_PROMPT: &str = "You are a Python code generator. When given a prompt, generate a complete, executable Python program that fulfills the requirements. Provide only the code inside a markdown formatted code block (using triple backticks).";

pub fn fix_prompt(stderr: &str) -> String {
    return format!(
        "The previous code produced the following error:\n{stderr}\nPlease provide a corrected version of the code."
    );
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairConfig {
    pub model: String,
    /// Repair attempts allowed after the initial generation.
    pub max_iterations: usize,
    /// Info string used when echoing code back in a fenced block.
    pub language: String,
}

impl RepairConfig {
    pub fn from_config() -> Result<RepairConfig> {
        let model = Config::get(ConfigKey::Model);
        if model.is_empty() {
            bail!("No model configured. Set one with --model or /model.");
        }

        let max_iterations = match Config::get(ConfigKey::MaxIterations).parse::<usize>() {
            Ok(val) => val,
            Err(_) => bail!("max-iterations must be a whole number"),
        };

        return Ok(RepairConfig {
            model,
            max_iterations,
            language: language_for_suffix(&Config::get(ConfigKey::ArtifactSuffix)),
        });
    }
}

fn language_for_suffix(suffix: &str) -> String {
    let ext = suffix.trim().trim_start_matches('.');
    let res = match ext {
        "" | "py" => "python",
        "js" => "javascript",
        "rb" => "ruby",
        "sh" => "bash",
        "ts" => "typescript",
        other => other,
    };

    return res.to_string();
}

fn notify(
    tx: &mpsc::UnboundedSender<Event>,
    author: Author,
    mtype: MessageType,
    text: &str,
) -> Result<()> {
    tx.send(Event::SessionMessage(Message::new_with_type(
        author, mtype, text,
    )))?;

    return Ok(());
}

fn status(tx: &mpsc::UnboundedSender<Event>, text: &str) -> Result<()> {
    return notify(tx, Author::System, MessageType::Normal, text);
}

fn failure(tx: &mpsc::UnboundedSender<Event>, text: &str) -> Result<()> {
    return notify(tx, Author::System, MessageType::Error, text);
}

/// Drives one prompt through generate, save, run and repair until the program
/// runs cleanly or the iteration ceiling is hit.
pub struct RepairLoop {
    backend: BackendBox,
    runner: RunnerBox,
    store: ArtifactStore,
    config: RepairConfig,
}

impl RepairLoop {
    pub fn new(
        backend: BackendBox,
        runner: RunnerBox,
        store: ArtifactStore,
        config: RepairConfig,
    ) -> RepairLoop {
        return RepairLoop {
            backend,
            runner,
            store,
            config,
        };
    }

    /// Runs a session to its terminal state, reporting every step on `tx`.
    /// Failures inside the session end up in the returned `Session` state; an
    /// `Err` means the notification channel was closed.
    pub async fn run_session(
        &self,
        prompt: &str,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<Session> {
        let mut session = Session::new(prompt, SYSTEM_PROMPT);
        tracing::info!(
            backend = self.backend.name().to_string(),
            model = self.config.model,
            max_iterations = self.config.max_iterations,
            "session started"
        );

        status(tx, "Generating initial code based on your prompt...")?;
        let mut next_prompt = prompt.to_string();

        loop {
            session.state = SessionState::Generating;
            let retrying = session.iteration > 0;

            session
                .conversation
                .append(ChatMessage::new(Role::User, &next_prompt));

            let response = match self
                .backend
                .get_completion(&self.config.model, session.conversation.snapshot())
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(error = ?err, iteration = session.iteration, "completion failed");
                    let label = if retrying {
                        "Error generating fixed code"
                    } else {
                        "Error generating code"
                    };
                    failure(tx, &format!("{label}: {err}"))?;
                    session.state = SessionState::Aborted(AbortReason::Api(err.to_string()));
                    return Ok(session);
                }
            };

            session.generations += 1;
            session
                .conversation
                .append(ChatMessage::new(Role::Assistant, &response));

            let code = code_extractor::extract(&response);
            let heading = if retrying {
                "Updated Code"
            } else {
                "Generated Code"
            };
            let shown = format!(
                "{heading}:\n```{lang}\n{code}\n```",
                lang = self.config.language
            );
            tx.send(Event::SessionMessage(
                Message::new(Author::Assistant, &shown).with_label(&self.config.model),
            ))?;

            session.state = SessionState::Executing;
            let artifact = match self.store.persist(&code).await {
                Ok(artifact) => artifact,
                Err(err) => {
                    tracing::error!(error = ?err, "failed to save generated code");
                    failure(tx, &format!("Error saving code: {err}"))?;
                    session.state =
                        SessionState::Aborted(AbortReason::Filesystem(err.to_string()));
                    return Ok(session);
                }
            };
            tracing::debug!(
                filename = ?artifact.filename,
                created_at = artifact.created_at.to_rfc3339(),
                bytes = artifact.code.len(),
                "artifact ready to run"
            );
            session.artifacts.push(artifact.filename.clone());

            let saved_label = if retrying {
                "Updated code saved to"
            } else {
                "Code saved to"
            };
            status(
                tx,
                &format!("{saved_label}: {}", artifact.filename.display()),
            )?;

            let result = match self.runner.execute(&artifact.filename).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(error = ?err, "failed to run generated code");
                    failure(tx, &format!("Error running code: {err}"))?;
                    session.state =
                        SessionState::Aborted(AbortReason::Execution(err.to_string()));
                    return Ok(session);
                }
            };

            status(
                tx,
                &format!(
                    "Execution output:\n{}\nErrors:\n{}",
                    result.stdout, result.stderr
                ),
            )?;

            let failed = result.failed();
            let stdout = result.stdout.to_string();
            let stderr = result.stderr.to_string();
            session.last_result = Some(result);

            if !failed {
                status(tx, &format!("Final output:\n{stdout}"))?;
                session.state = SessionState::Done;
                tracing::info!(
                    generations = session.generations,
                    iteration = session.iteration,
                    messages = session.conversation.len(),
                    "session done"
                );
                return Ok(session);
            }

            if session.iteration >= self.config.max_iterations {
                failure(tx, "Too many iterations. Aborting fix attempts.")?;
                status(tx, &format!("Final output:\n{stdout}"))?;
                session.state = SessionState::Aborted(AbortReason::IterationLimitExceeded);
                tracing::warn!(
                    generations = session.generations,
                    messages = session.conversation.len(),
                    "session hit the iteration ceiling"
                );
                return Ok(session);
            }

            session.state = SessionState::Retrying;
            session.iteration += 1;
            tracing::info!(iteration = session.iteration, "retrying with error output");
            status(
                tx,
                &format!(
                    "Attempting to fix errors (Iteration {})...",
                    session.iteration
                ),
            )?;

            next_prompt = fix_prompt(&stderr);
        }
    }
}
