//! Dispatched connection: one socket, one outbound queue, at most one worker.
//!
//! The worker waits on "stop requested" and "frame queued" in the same
//! `select!`, with stop polled first. A frame already taken off the queue is
//! always written to completion; nothing is drained after stop is observed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::Instrument;

use chatline_core::error::{ChatError, Result};

use crate::obs::GatewayMetrics;
use crate::realtime::types::{DispatchOptions, PreparedMsg};

/// Write half of a client socket.
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

type SharedSink = Arc<AsyncMutex<Box<dyn FrameSink>>>;
type SharedQueue = Arc<AsyncMutex<mpsc::Receiver<PreparedMsg>>>;

struct Worker {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct DispatchedConnection {
    tx: mpsc::Sender<PreparedMsg>,
    // Held by the active worker for its whole lifetime.
    rx: SharedQueue,
    // Per-connection write lock, distinct from pool/registry locks.
    sink: SharedSink,
    worker: Mutex<Option<Worker>>,
    write_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl DispatchedConnection {
    pub fn new(sink: impl FrameSink, opts: &DispatchOptions, metrics: Arc<GatewayMetrics>) -> Self {
        let (tx, rx) = mpsc::channel(opts.queue_capacity.max(1));
        Self {
            tx,
            rx: Arc::new(AsyncMutex::new(rx)),
            sink: Arc::new(AsyncMutex::new(Box::new(sink))),
            worker: Mutex::new(None),
            write_timeout: opts.write_timeout,
            metrics,
        }
    }

    /// Append to the outbound queue, waiting for capacity if it is full.
    pub async fn enqueue(&self, frame: PreparedMsg) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| ChatError::Internal("outbound queue closed".into()))
    }

    /// Non-blocking enqueue. Returns false when the queue is full.
    pub fn try_enqueue(&self, frame: PreparedMsg) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Enqueue, giving up with `ChatError::Timeout` once `limit` has elapsed.
    pub async fn enqueue_timeout(&self, frame: PreparedMsg, limit: Duration) -> Result<()> {
        let frame = match self.tx.try_send(frame) {
            Ok(()) => return Ok(()),
            Err(mpsc::error::TrySendError::Full(frame)) => frame,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Err(ChatError::Internal("outbound queue closed".into()));
            }
        };
        timeout(limit, self.enqueue(frame))
            .await
            .map_err(|_| ChatError::Timeout)?
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawn the worker. Returns false (and does nothing) if one is running.
    ///
    /// Must be called from within a tokio runtime. The worker inherits the
    /// caller's tracing span.
    pub fn start(&self) -> bool {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(
            run_worker(
                Arc::clone(&self.rx),
                Arc::clone(&self.sink),
                stop_rx,
                self.write_timeout,
                Arc::clone(&self.metrics),
            )
            .in_current_span(),
        );
        *slot = Some(Worker { stop_tx, handle });
        true
    }

    /// Ask the worker to exit. No-op (returns `None`) when not running.
    ///
    /// The returned handle resolves once the worker has finished any write in
    /// flight; callers wanting a bounded shutdown race it against a deadline.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let _ = worker.stop_tx.send(());
        Some(worker.handle)
    }

    /// Close the underlying socket. Waits for any write in flight.
    pub async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.close().await
    }
}

async fn run_worker(
    queue: SharedQueue,
    sink: SharedSink,
    mut stop_rx: oneshot::Receiver<()>,
    write_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
) {
    // A restarted worker may have to wait for its predecessor's last write.
    let mut rx = tokio::select! {
        biased;
        _ = &mut stop_rx => return,
        guard = queue.lock() => guard,
    };

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            next = rx.recv() => {
                let Some(frame) = next else { break; };
                write_one(&sink, frame, write_timeout, &metrics).await;
            }
        }
    }

    tracing::debug!("dispatch worker stopped");
}

async fn write_one(sink: &SharedSink, frame: PreparedMsg, write_timeout: Duration, metrics: &GatewayMetrics) {
    let mut sink = sink.lock().await;
    match timeout(write_timeout, sink.write_frame(frame)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            metrics.write_failures.inc(&[("reason", "error")]);
            tracing::warn!(error = %e, "socket write failed");
        }
        Err(_) => {
            metrics.write_failures.inc(&[("reason", "timeout")]);
            tracing::warn!(timeout_ms = write_timeout.as_millis() as u64, "socket write deadline exceeded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;

    struct RecordingSink {
        out: mpsc::UnboundedSender<PreparedMsg>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()> {
            self.out
                .send(frame)
                .map_err(|_| ChatError::Transport("closed".into()))
        }
    }

    /// Fails the first `failures` writes, then records.
    struct FlakySink {
        failures: usize,
        out: mpsc::UnboundedSender<PreparedMsg>,
    }

    #[async_trait]
    impl FrameSink for FlakySink {
        async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(ChatError::Transport("broken pipe".into()));
            }
            let _ = self.out.send(frame);
            Ok(())
        }
    }

    /// Announces each write, then waits for a permit before recording it.
    struct GatedSink {
        entered: mpsc::UnboundedSender<()>,
        gate: Arc<Semaphore>,
        out: mpsc::UnboundedSender<PreparedMsg>,
    }

    #[async_trait]
    impl FrameSink for GatedSink {
        async fn write_frame(&mut self, frame: PreparedMsg) -> Result<()> {
            let _ = self.entered.send(());
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| ChatError::Transport("gate closed".into()))?;
            permit.forget();
            let _ = self.out.send(frame);
            Ok(())
        }
    }

    fn text(s: &str) -> PreparedMsg {
        PreparedMsg::Text(Arc::from(s))
    }

    fn opts(capacity: usize) -> DispatchOptions {
        DispatchOptions {
            queue_capacity: capacity,
            write_timeout: Duration::from_millis(200),
            enqueue_timeout: Duration::from_millis(50),
        }
    }

    fn recording(capacity: usize) -> (DispatchedConnection, mpsc::UnboundedReceiver<PreparedMsg>) {
        let (out, rx) = mpsc::unbounded_channel();
        let conn = DispatchedConnection::new(
            RecordingSink { out },
            &opts(capacity),
            Arc::new(GatewayMetrics::default()),
        );
        (conn, rx)
    }

    async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<PreparedMsg>) {
        let res = timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(res.is_err(), "unexpected frame: {res:?}");
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (conn, _rx) = recording(4);
        assert!(!conn.is_running());
        assert!(conn.start());
        assert!(!conn.start());
        assert!(conn.is_running());
    }

    #[tokio::test]
    async fn stop_when_not_running_is_noop() {
        let (conn, _rx) = recording(4);
        assert!(conn.stop().is_none());

        conn.start();
        let handle = conn.stop().expect("running worker");
        assert!(conn.stop().is_none());
        handle.await.unwrap();
        assert!(!conn.is_running());
    }

    #[tokio::test]
    async fn writes_in_enqueue_order() {
        let (conn, mut rx) = recording(8);
        conn.start();
        for i in 0..50 {
            conn.enqueue(text(&i.to_string())).await.unwrap();
        }
        for i in 0..50 {
            let got = rx.recv().await.unwrap();
            assert_eq!(got.as_text(), Some(i.to_string().as_str()));
        }
    }

    #[tokio::test]
    async fn stopped_worker_leaves_queue_undrained_until_restart() {
        let (conn, mut rx) = recording(8);
        conn.start();
        conn.stop().unwrap().await.unwrap();

        for s in ["a", "b", "c"] {
            conn.enqueue(text(s)).await.unwrap();
        }
        assert_silent(&mut rx).await;

        assert!(conn.start());
        for s in ["a", "b", "c"] {
            assert_eq!(rx.recv().await.unwrap().as_text(), Some(s));
        }
    }

    #[tokio::test]
    async fn frame_in_flight_completes_and_nothing_follows_stop() {
        let (entered_tx, mut entered) = mpsc::unbounded_channel();
        let (out, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let conn = DispatchedConnection::new(
            GatedSink { entered: entered_tx, gate: Arc::clone(&gate), out },
            &DispatchOptions { write_timeout: Duration::from_secs(5), ..opts(8) },
            Arc::new(GatewayMetrics::default()),
        );
        conn.start();

        conn.enqueue(text("in-flight")).await.unwrap();
        entered.recv().await.unwrap();
        conn.enqueue(text("stale")).await.unwrap();

        let handle = conn.stop().unwrap();
        gate.add_permits(2);
        handle.await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_text(), Some("in-flight"));
        assert_silent(&mut rx).await;
    }

    #[tokio::test]
    async fn write_error_does_not_stop_worker() {
        let (out, mut rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(GatewayMetrics::default());
        let conn = DispatchedConnection::new(FlakySink { failures: 1, out }, &opts(4), Arc::clone(&metrics));
        conn.start();

        conn.enqueue(text("lost")).await.unwrap();
        conn.enqueue(text("kept")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_text(), Some("kept"));
        assert!(conn.is_running());
        assert_eq!(metrics.write_failures.get(&[("reason", "error")]), 1);
    }

    #[tokio::test]
    async fn slow_write_hits_deadline_and_worker_moves_on() {
        let (entered_tx, _entered) = mpsc::unbounded_channel();
        let (out, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let metrics = Arc::new(GatewayMetrics::default());
        let conn = DispatchedConnection::new(
            GatedSink { entered: entered_tx, gate: Arc::clone(&gate), out },
            &DispatchOptions { write_timeout: Duration::from_millis(20), ..opts(4) },
            Arc::clone(&metrics),
        );
        conn.start();

        conn.enqueue(text("stuck")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        gate.add_permits(1);
        conn.enqueue(text("next")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_text(), Some("next"));
        assert_eq!(metrics.write_failures.get(&[("reason", "timeout")]), 1);
    }

    #[tokio::test]
    async fn enqueue_timeout_on_full_idle_queue() {
        let (conn, _rx) = recording(1);
        conn.enqueue_timeout(text("fits"), Duration::from_millis(20)).await.unwrap();
        assert!(!conn.try_enqueue(text("full")));

        let err = conn
            .enqueue_timeout(text("blocked"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout));
    }
}
