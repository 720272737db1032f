pub mod actions;
mod app_state;
mod artifact_store;
mod bubble;
mod bubble_list;
pub mod code_extractor;
pub mod events;
mod repair_loop;
mod scroll;

pub use app_state::*;
pub use artifact_store::*;
pub use bubble::*;
pub use bubble_list::*;
pub use repair_loop::*;
pub use scroll::*;
