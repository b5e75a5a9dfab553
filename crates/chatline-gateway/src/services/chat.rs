use std::sync::Arc;

use async_trait::async_trait;

use chatline_core::error::{ChatError, Result};
use chatline_core::{MessageRecord, MessageType, UserId};

use crate::realtime::BroadcastReport;
use crate::services::MessageAssembler;

/// Fan-out target for assembled messages.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_record(&self, record: &MessageRecord) -> Result<BroadcastReport>;
}

/// A message after it has been handed to the broadcaster.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub record: MessageRecord,
    pub report: BroadcastReport,
}

/// Turns inbound chat text into an id'd record and delivers it.
pub struct ChatService {
    assembler: MessageAssembler,
    broadcaster: Arc<dyn Broadcaster>,
}

impl ChatService {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self::with_assembler(MessageAssembler::new(), broadcaster)
    }

    pub fn with_assembler(assembler: MessageAssembler, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { assembler, broadcaster }
    }

    pub async fn send_message(&self, body: String, kind: MessageType, sender: UserId) -> Result<SentMessage> {
        if kind == MessageType::Unknown {
            return Err(ChatError::BadRequest("unknown message type".into()));
        }

        let record = self.assembler.create(body, kind, sender);
        let report = self.broadcaster.broadcast_record(&record).await?;
        tracing::debug!(
            message_id = %record.id,
            sender = %sender,
            recipients = report.recipients,
            dropped = report.dropped,
            "message sent"
        );
        Ok(SentMessage { record, report })
    }
}
