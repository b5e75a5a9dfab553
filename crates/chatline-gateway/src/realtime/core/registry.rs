use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use chatline_core::error::Result;
use chatline_core::{MessageId, MessageRecord, MessageType, UserId};

use crate::obs::GatewayMetrics;
use crate::realtime::core::{ConnectionPool, DispatchedConnection};
use crate::realtime::types::{BroadcastReport, DispatchOptions, PreparedMsg, RegistrationId};
use crate::services::Broadcaster;

/// Connection registry:
/// - `user_id -> ConnectionPool` (created on first registration, never removed)
/// - each pool: `registration_id -> DispatchedConnection`
///
/// The outer map's shard locks guard the map's shape; each pool guards only
/// its own user's entries. Broadcast holds outer read locks just long enough
/// to snapshot, then enqueues without any registry lock held.
pub struct ConnectionRegistry {
    pools: DashMap<UserId, Arc<ConnectionPool>>,
    enqueue_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl ConnectionRegistry {
    pub fn new(opts: &DispatchOptions, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            pools: DashMap::new(),
            enqueue_timeout: opts.enqueue_timeout,
            metrics,
        }
    }

    /// Store `conn` in `user`'s pool and start its worker.
    ///
    /// The returned id, together with `user`, is the handle for [`unregister`].
    ///
    /// [`unregister`]: ConnectionRegistry::unregister
    pub fn register(&self, user: UserId, conn: Arc<DispatchedConnection>) -> RegistrationId {
        let pool = Arc::clone(
            self.pools
                .entry(user)
                .or_insert_with(|| Arc::new(ConnectionPool::new()))
                .value(),
        );

        let id = pool.store(Arc::clone(&conn));
        let span = tracing::debug_span!("conn", user = %user, conn = %id);
        span.in_scope(|| conn.start());

        self.metrics.connections_registered.inc(&[]);
        self.metrics.connections_active.inc(&[]);
        tracing::debug!(user = %user, conn = %id, "connection registered");
        id
    }

    /// Stop and forget one connection. Unknown user or id is a no-op.
    ///
    /// Returns true only for the call that actually removed the entry.
    pub fn unregister(&self, user: UserId, id: RegistrationId) -> bool {
        let Some(pool) = self.pools.get(&user).map(|r| Arc::clone(r.value())) else {
            return false;
        };
        let Some(conn) = pool.remove(id) else {
            return false;
        };

        // Worker exits on its own; nobody needs to wait for it here.
        let _ = conn.stop();

        self.metrics.connections_active.dec(&[]);
        tracing::debug!(user = %user, conn = %id, "connection unregistered");
        true
    }

    /// Fan a text message out to every registered connection.
    pub async fn broadcast(&self, message_id: MessageId, body: &str, sender: UserId) -> Result<BroadcastReport> {
        let record = MessageRecord {
            id: message_id,
            kind: MessageType::Text,
            body: body.to_string(),
            sender,
        };
        self.broadcast_record(&record).await
    }

    /// Fan `record` out with a per-recipient `is_me` flag.
    ///
    /// Every recipient is enqueued concurrently with its own timeout, so one
    /// full queue costs at most `enqueue_timeout` and only its own copy.
    pub async fn broadcast_record(&self, record: &MessageRecord) -> Result<BroadcastReport> {
        let mine = PreparedMsg::prepare(&record.projection(true))?;
        let theirs = PreparedMsg::prepare(&record.projection(false))?;

        let targets = self.snapshot();
        let mut report = BroadcastReport {
            recipients: targets.len(),
            ..BroadcastReport::default()
        };

        let message_id = record.id;
        let limit = self.enqueue_timeout;
        let mut futs = FuturesUnordered::new();
        for (user, conn_id, conn) in targets {
            let frame = if user == record.sender { mine.clone() } else { theirs.clone() };
            futs.push(async move {
                tracing::debug!(user = %user, conn = %conn_id, message_id = %message_id, "enqueue broadcast");
                let res = conn.enqueue_timeout(frame, limit).await;
                (user, conn_id, res)
            });
        }

        while let Some((user, conn_id, res)) = futs.next().await {
            match res {
                Ok(()) => {
                    report.delivered += 1;
                    self.metrics.deliveries.inc(&[("outcome", "enqueued")]);
                }
                Err(e) => {
                    report.dropped += 1;
                    self.metrics.deliveries.inc(&[("outcome", "dropped")]);
                    tracing::warn!(user = %user, conn = %conn_id, message_id = %message_id, error = %e, "delivery dropped");
                }
            }
        }

        self.metrics.broadcasts.inc(&[]);
        Ok(report)
    }

    fn snapshot(&self) -> Vec<(UserId, RegistrationId, Arc<DispatchedConnection>)> {
        let mut out = Vec::new();
        for entry in self.pools.iter() {
            let user = *entry.key();
            out.extend(
                entry
                    .value()
                    .snapshot()
                    .into_iter()
                    .map(|(id, conn)| (user, id, conn)),
            );
        }
        out
    }

    pub fn get(&self, user: UserId, id: RegistrationId) -> Option<Arc<DispatchedConnection>> {
        self.pools.get(&user)?.get(id)
    }

    pub fn user_connections(&self, user: UserId) -> usize {
        self.pools.get(&user).map(|p| p.len()).unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.pools.iter().map(|p| p.value().len()).sum()
    }
}

#[async_trait]
impl Broadcaster for ConnectionRegistry {
    async fn broadcast_record(&self, record: &MessageRecord) -> Result<BroadcastReport> {
        ConnectionRegistry::broadcast_record(self, record).await
    }
}
