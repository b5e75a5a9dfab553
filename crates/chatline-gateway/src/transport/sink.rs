//! WebSocket write half as a dispatch target.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use chatline_core::error::{ChatError, Result};

use crate::realtime::{FrameSink, PreparedMsg};

pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()> {
        self.inner
            .send(frame.to_ws_message())
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.inner
            .close()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))
    }
}
