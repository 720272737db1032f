#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

use anyhow::Result;
use ratatui::prelude::Rect;
use tokio::sync::mpsc;

use super::BubbleList;
use super::Scroll;
use crate::domain::models::Action;
use crate::domain::models::Author;
use crate::domain::models::BackendBox;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::SlashCommand;

pub struct AppState<'a> {
    pub bubble_list: BubbleList<'a>,
    pub last_known_height: u16,
    pub last_known_width: u16,
    pub messages: Vec<Message>,
    pub running_sessions: usize,
    pub scroll: Scroll,
}

impl<'a> AppState<'a> {
    /// Greets the user and reports up front when the backend or model isn't
    /// usable, so the first prompt doesn't fail silently.
    pub async fn new(backend: &BackendBox, model_name: &str) -> Result<AppState<'a>> {
        let mut app_state = AppState {
            bubble_list: BubbleList::default(),
            last_known_height: 0,
            last_known_width: 0,
            messages: vec![],
            running_sessions: 0,
            scroll: Scroll::default(),
        };
        app_state.scroll.last();

        app_state.messages.push(Message::new(
            Author::System,
            "Hey there! Describe a program and I'll write it, run it, and fix it until it works. Type /help for commands.",
        ));

        let backend_name = backend.name();
        if let Err(err) = backend.health_check().await {
            app_state.messages.push(Message::new_with_type(
                Author::System,
                MessageType::Error,
                &format!("Hey, it looks like backend {backend_name} isn't reachable. Double check it before submitting a prompt.\n\nError: {err}"),
            ));
        } else {
            match backend.list_models().await {
                Ok(models) => {
                    if !models.contains(&model_name.to_string()) {
                        app_state.messages.push(Message::new_with_type(
                            Author::System,
                            MessageType::Error,
                            &format!("Model {model_name} doesn't exist for backend {backend_name}. You can use `/modellist` to view all available models, and `/model NAME` to switch models."),
                        ));
                    }
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "failed to list models");
                }
            }
        }

        return Ok(app_state);
    }

    /// Handles a submitted prompt. Returns true when the app should exit.
    pub fn submit(&mut self, input: &str, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(false);
        }

        self.add_message(Message::new(Author::User, input));

        if let Some(command) = SlashCommand::parse(input) {
            if command.is_quit() {
                return Ok(true);
            }

            tx.send(Action::Prompt(input.to_string()))?;
            return Ok(false);
        }

        self.running_sessions += 1;
        tx.send(Action::Prompt(input.to_string()))?;

        return Ok(false);
    }

    pub fn handle_session_finished(&mut self) {
        self.running_sessions = self.running_sessions.saturating_sub(1);
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.last_known_width = rect.width;
        self.last_known_height = rect.height;
        self.sync_dependants();
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.sync_dependants();
    }

    fn sync_dependants(&mut self) {
        self.bubble_list
            .set_messages(&self.messages, self.last_known_width as usize);

        let lines_len = u16::try_from(self.bubble_list.len()).unwrap_or(u16::MAX);
        self.scroll.set_state(lines_len, self.last_known_height);
    }
}
