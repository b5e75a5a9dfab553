#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chatline_core::{MessageId, MessageType, UserId};
use chatline_gateway::obs::GatewayMetrics;
use chatline_gateway::realtime::{BroadcastReport, ConnectionRegistry, DispatchOptions};
use chatline_gateway::services::ChatService;

use common::{assert_silent, connection, next_message, opts};

#[tokio::test]
async fn chat_service_assigns_ids_and_flags_the_sender() {
    let metrics = Arc::new(GatewayMetrics::default());
    let o = opts(16);
    let registry = Arc::new(ConnectionRegistry::new(&o, Arc::clone(&metrics)));
    let chat = ChatService::new(registry.clone());

    let (alice, mut ra) = connection(&o, &metrics);
    let (bob, mut rb) = connection(&o, &metrics);
    registry.register(UserId(100), alice);
    registry.register(UserId(1337), bob);

    let first = chat.send_message("hello".into(), MessageType::Text, UserId(1337)).await.unwrap();
    let second = chat.send_message("again".into(), MessageType::Text, UserId(100)).await.unwrap();
    assert_eq!(first.record.id, MessageId(1));
    assert_eq!(second.record.id, MessageId(2));
    assert_eq!(first.report, BroadcastReport { recipients: 2, delivered: 2, dropped: 0 });

    let a1 = next_message(&mut ra).await;
    let a2 = next_message(&mut ra).await;
    let b1 = next_message(&mut rb).await;
    let b2 = next_message(&mut rb).await;

    assert_eq!((a1.id, a1.user.is_me), (MessageId(1), false));
    assert_eq!((a2.id, a2.user.is_me), (MessageId(2), true));
    assert_eq!((b1.id, b1.user.is_me), (MessageId(1), true));
    assert_eq!((b2.id, b2.user.is_me), (MessageId(2), false));
    assert_eq!(metrics.broadcasts.get(&[]), 2);
    assert_eq!(metrics.deliveries.get(&[("outcome", "enqueued")]), 4);
}

#[tokio::test]
async fn unknown_kind_is_rejected_before_fan_out() {
    let metrics = Arc::new(GatewayMetrics::default());
    let o = opts(4);
    let registry = Arc::new(ConnectionRegistry::new(&o, Arc::clone(&metrics)));
    let chat = ChatService::new(registry.clone());

    let (conn, mut rx) = connection(&o, &metrics);
    registry.register(UserId(1), conn);

    let err = chat
        .send_message("?".into(), MessageType::Unknown, UserId(1))
        .await
        .unwrap_err();
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert_silent(&mut rx).await;

    // The rejected request did not consume an id.
    let sent = chat.send_message("ok".into(), MessageType::Text, UserId(1)).await.unwrap();
    assert_eq!(sent.record.id, MessageId(1));
}

#[tokio::test]
async fn stalled_consumer_only_loses_its_own_copy() {
    let metrics = Arc::new(GatewayMetrics::default());
    let o = DispatchOptions {
        enqueue_timeout: Duration::from_millis(30),
        ..opts(1)
    };
    let registry = ConnectionRegistry::new(&o, Arc::clone(&metrics));

    let (healthy, mut rh) = connection(&o, &metrics);
    let (stalled, mut rs) = connection(&o, &metrics);
    registry.register(UserId(1), healthy);
    registry.register(UserId(2), Arc::clone(&stalled));

    // Still registered, but nobody drains its queue any more.
    stalled.stop().unwrap().await.unwrap();

    let first = registry.broadcast(MessageId(1), "one", UserId(1)).await.unwrap();
    assert_eq!(first, BroadcastReport { recipients: 2, delivered: 2, dropped: 0 });
    assert_eq!(next_message(&mut rh).await.id, MessageId(1));

    let second = registry.broadcast(MessageId(2), "two", UserId(1)).await.unwrap();
    assert_eq!(second, BroadcastReport { recipients: 2, delivered: 1, dropped: 1 });
    assert_eq!(next_message(&mut rh).await.id, MessageId(2));

    assert_eq!(metrics.deliveries.get(&[("outcome", "dropped")]), 1);
    assert_silent(&mut rs).await;

    // Restarting drains what was queued before the stall.
    assert!(stalled.start());
    assert_eq!(next_message(&mut rs).await.id, MessageId(1));
    assert_silent(&mut rs).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_broadcasters_keep_per_sender_order() {
    const CONNS: i64 = 6;
    const SENDERS: u64 = 4;
    const PER_SENDER: u64 = 50;

    let metrics = Arc::new(GatewayMetrics::default());
    let o = DispatchOptions {
        enqueue_timeout: Duration::from_secs(5),
        ..opts(8)
    };
    let registry = Arc::new(ConnectionRegistry::new(&o, Arc::clone(&metrics)));

    let mut receivers = Vec::new();
    for user in 0..CONNS {
        let (conn, rx) = connection(&o, &metrics);
        registry.register(UserId(user % 3), conn);
        receivers.push(rx);
    }

    let mut tasks = Vec::new();
    for sender in 0..SENDERS {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            for seq in 0..PER_SENDER {
                let id = MessageId(sender * 1_000 + seq);
                let report = registry
                    .broadcast(id, &format!("{sender}:{seq}"), UserId(sender as i64))
                    .await
                    .unwrap();
                assert_eq!(report.dropped, 0);
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    for mut rx in receivers {
        let mut last: HashMap<u64, u64> = HashMap::new();
        for _ in 0..SENDERS * PER_SENDER {
            let msg = next_message(&mut rx).await;
            let (sender, seq) = (msg.id.0 / 1_000, msg.id.0 % 1_000);
            assert_eq!(msg.message, format!("{sender}:{seq}"));
            if let Some(prev) = last.insert(sender, seq) {
                assert!(seq > prev, "sender {sender}: {seq} arrived after {prev}");
            }
        }
        assert_silent(&mut rx).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn register_unregister_churn_during_broadcast() {
    let metrics = Arc::new(GatewayMetrics::default());
    let o = opts(4);
    let registry = Arc::new(ConnectionRegistry::new(&o, Arc::clone(&metrics)));

    let broadcaster = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            for i in 0..200 {
                registry.broadcast(MessageId(i), "churn", UserId(0)).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut workers = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        let metrics = Arc::clone(&metrics);
        workers.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..50 {
                let (conn, _rx) = connection(&o, &metrics);
                let id = registry.register(UserId(7), conn);
                assert!(registry.unregister(UserId(7), id));
                ids.push(id);
            }
            ids
        }));
    }

    let mut seen = HashSet::new();
    for w in workers {
        for id in w.await.unwrap() {
            assert!(seen.insert(id), "registration id {id} handed out twice");
        }
    }
    broadcaster.await.unwrap();

    assert_eq!(seen.len(), 400);
    assert_eq!(registry.total_connections(), 0);
    assert_eq!(metrics.connections_registered.get(&[]), 400);
    assert_eq!(metrics.connections_active.get(&[]), 0);
}
