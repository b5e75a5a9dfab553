//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS for an identified caller
//! - Register the socket's dispatched connection for the session lifetime
//! - Read loop: decode once, hand chat frames to the chat service
//! - Lifecycle: ping/pong + idle timeout, then unregister and close

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tokio::time::{timeout, Duration, Instant, MissedTickBehavior};
use tracing::Instrument;

use chatline_core::error::{ChatError, Result};
use chatline_core::{MessageType, UserId};

use crate::app_state::AppState;
use crate::context::Identity;
use crate::realtime::{DispatchedConnection, PreparedMsg};
use crate::transport::codec::{decode, Inbound};
use crate::transport::sink::WsSink;

pub async fn ws_upgrade(
    State(app): State<AppState>,
    Identity(user): Identity,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(app, user, socket).await {
            tracing::debug!(user = %user, error = %e, "session ended with error");
        }
    })
}

async fn run_session(app: AppState, user: UserId, socket: WebSocket) -> Result<()> {
    let (ws_tx, mut ws_rx) = socket.split();

    let conn = Arc::new(DispatchedConnection::new(
        WsSink::new(ws_tx),
        app.dispatch_options(),
        app.metrics(),
    ));

    let registry = app.registry();
    let conn_id = registry.register(user, Arc::clone(&conn));
    let span = tracing::info_span!("session", user = %user, conn = %conn_id);

    let result = read_loop(&app, user, &conn, &mut ws_rx)
        .instrument(span.clone())
        .await;

    registry.unregister(user, conn_id);

    // The worker finishes at most one in-flight write before the sink frees up.
    let grace = app.dispatch_options().write_timeout * 2;
    match timeout(grace, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => span.in_scope(|| tracing::debug!(error = %e, "socket close failed")),
        Err(_) => span.in_scope(|| tracing::debug!("socket close timed out")),
    }

    result
}

async fn read_loop(
    app: &AppState,
    user: UserId,
    conn: &DispatchedConnection,
    ws_rx: &mut SplitStream<WebSocket>,
) -> Result<()> {
    let gw = &app.cfg().gateway;
    let ping_every = Duration::from_millis(gw.ping_interval_ms);
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let chat = app.chat();
    let mut last_activity = Instant::now();

    tracing::debug!("session started");

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let msg: Message = incoming.map_err(|e| ChatError::Transport(e.to_string()))?;
                last_activity = Instant::now();

                match decode(msg)? {
                    Inbound::Chat(req) => {
                        tracing::debug!(kind = ?req.kind, "chat frame received");
                        if req.kind == MessageType::Unknown {
                            continue;
                        }
                        if let Err(e) = chat.send_message(req.message, req.kind, user).await {
                            tracing::warn!(error = %e, "chat send failed");
                        }
                    }
                    Inbound::Ping(payload) => {
                        conn.try_enqueue(PreparedMsg::Pong(payload));
                    }
                    Inbound::Pong => {}
                    Inbound::Close => break,
                }
            }

            _ = ping_tick.tick() => {
                conn.try_enqueue(PreparedMsg::Ping(Vec::new()));
            }

            _ = tokio::time::sleep_until(last_activity + idle_timeout) => {
                tracing::info!("idle timeout");
                break;
            }
        }
    }

    tracing::debug!("session closing");
    Ok(())
}
