//! Shared application state for the chat gateway.
//!
//! One registry per state; nothing is process-global, so tests can run several
//! independent gateways side by side.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::realtime::{ConnectionRegistry, DispatchOptions};
use crate::services::ChatService;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<ConnectionRegistry>,
    chat: Arc<ChatService>,
    metrics: Arc<GatewayMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    dispatch: DispatchOptions,
}

impl AppState {
    pub fn new(cfg: GatewayConfig) -> Self {
        let dispatch = DispatchOptions::from(&cfg.dispatch);
        let metrics = Arc::new(GatewayMetrics::default());

        let registry = Arc::new(ConnectionRegistry::new(&dispatch, Arc::clone(&metrics)));
        let chat = Arc::new(ChatService::new(registry.clone()));

        Self {
            inner: Arc::new(AppStateInner { cfg, dispatch }),
            registry,
            chat,
            metrics,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn dispatch_options(&self) -> &DispatchOptions {
        &self.inner.dispatch
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }
}
