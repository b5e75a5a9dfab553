//! Chat wire schema.
//!
//! - `ids`: identifier newtypes serialized as plain JSON integers.
//! - `message`: outbound `Message` values, inbound `ChatRequest` frames and the
//!   `MessageRecord` produced once per chat message before fan-out.

pub mod ids;
pub mod message;

pub use ids::{MessageId, UserId};
pub use message::{ChatRequest, Message, MessageRecord, MessageType, User};
