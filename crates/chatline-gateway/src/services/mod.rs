//! Chat services: message id assignment and delivery through a broadcaster.

pub mod assembly;
pub mod chat;

pub use assembly::MessageAssembler;
pub use chat::{Broadcaster, ChatService, SentMessage};
