use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::realtime::core::DispatchedConnection;
use crate::realtime::types::RegistrationId;

/// One user's live connections, keyed by a pool-local registration id.
#[derive(Default)]
pub struct ConnectionPool {
    conns: DashMap<RegistrationId, Arc<DispatchedConnection>>,
    next_id: AtomicU64,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under a fresh id. Ids start at 0 and are never handed out twice.
    pub fn store(&self, conn: Arc<DispatchedConnection>) -> RegistrationId {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.conns.insert(id, conn);
        id
    }

    pub fn get(&self, id: RegistrationId) -> Option<Arc<DispatchedConnection>> {
        self.conns.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Remove and return the entry; `None` if it was already gone.
    pub fn remove(&self, id: RegistrationId) -> Option<Arc<DispatchedConnection>> {
        self.conns.remove(&id).map(|(_, conn)| conn)
    }

    pub fn delete(&self, id: RegistrationId) {
        self.remove(id);
    }

    /// Point-in-time copy; safe to iterate without holding any pool lock.
    pub fn snapshot(&self) -> Vec<(RegistrationId, Arc<DispatchedConnection>)> {
        self.conns
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}
