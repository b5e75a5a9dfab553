#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use chatline_core::error::{ChatError, Result};
use chatline_core::Message;
use chatline_gateway::obs::GatewayMetrics;
use chatline_gateway::realtime::{DispatchOptions, DispatchedConnection, FrameSink, PreparedMsg};

/// Forwards every written frame to a test-side channel.
pub struct ChannelSink {
    out: mpsc::UnboundedSender<PreparedMsg>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()> {
        self.out
            .send(frame)
            .map_err(|_| ChatError::Transport("receiver dropped".into()))
    }
}

pub fn opts(queue_capacity: usize) -> DispatchOptions {
    DispatchOptions {
        queue_capacity,
        write_timeout: Duration::from_millis(500),
        enqueue_timeout: Duration::from_millis(100),
    }
}

pub fn connection(
    opts: &DispatchOptions,
    metrics: &Arc<GatewayMetrics>,
) -> (Arc<DispatchedConnection>, mpsc::UnboundedReceiver<PreparedMsg>) {
    let (out, rx) = mpsc::unbounded_channel();
    let conn = DispatchedConnection::new(ChannelSink { out }, opts, Arc::clone(metrics));
    (Arc::new(conn), rx)
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<PreparedMsg>) -> Message {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("frame within deadline")
        .expect("sink open");
    serde_json::from_str(frame.as_text().expect("text frame")).expect("valid message json")
}

pub async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<PreparedMsg>) {
    let res = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}
