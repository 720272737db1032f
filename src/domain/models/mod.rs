mod action;
mod artifact;
mod author;
mod backend;
mod conversation;
mod event;
mod execution;
mod message;
mod session;
mod slash_commands;
mod textarea;

pub use action::*;
pub use artifact::*;
pub use author::*;
pub use backend::*;
pub use conversation::*;
pub use event::*;
pub use execution::*;
pub use message::*;
pub use session::*;
pub use slash_commands::*;
pub use textarea::*;
