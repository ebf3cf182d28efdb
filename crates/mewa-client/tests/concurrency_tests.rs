//! Concurrency tests for channel connections
//!
//! Verifies that closes, sends and inbound processing can race from many tasks
//! without panics, double releases or lost writes.


use std::collections::HashMap;

use mewa_client::{ActivityGuard, ChannelEvent, InboundFrame, OutboundCommand, SessionState};
use test_utils::{assert_closed_by_client, create_counting_guard, create_test_channel};
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn test_concurrent_close_is_safe() {
    let mut channel = create_test_channel().await;
    let guard = create_counting_guard();
    channel
        .connection
        .set_activity_guard(Some(guard.clone()))
        .await;
    let mut peer = channel.open_connected_session().await;

    tokio::join!(channel.connection.close(), channel.connection.close());

    assert_eq!(channel.connection.state().await, SessionState::Disconnected);
    assert_closed_by_client(&mut peer).await;
    assert!(guard.released() <= guard.acquired());
    channel.assert_no_event().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_from_many_tasks_while_frames_arrive() {
    let mut channel = create_test_channel().await;
    let guard = create_counting_guard();
    channel
        .connection
        .set_activity_guard(Some(guard.clone()))
        .await;
    let peer = channel.open_connected_session().await;

    let flood = tokio::spawn(async move {
        for i in 0..500 {
            let frame = InboundFrame::Event {
                time: format!("T{}", i),
                device: "dev2".to_string(),
                id: "flood".to_string(),
                params: i.to_string(),
            };
            if !peer.push_frame(&frame).unwrap() {
                break;
            }
            if i % 50 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    let closers: Vec<_> = (0..8)
        .map(|_| {
            let connection = channel.connection.clone();
            tokio::spawn(async move { connection.close().await })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap();
    }
    flood.await.unwrap();

    assert_eq!(channel.connection.state().await, SessionState::Disconnected);
    assert!(!guard.is_held());
    assert_eq!(guard.released(), guard.acquired());

    // Events seen before the close are a prefix of what was pushed, in order
    let mut expected = 0;
    while let Ok(event) = channel.events.try_recv() {
        match event {
            ChannelEvent::Event { params, .. } => {
                assert_eq!(params, expected.to_string());
                expected += 1;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sends_from_many_tasks_all_arrive_in_per_task_order() {
    let mut channel = create_test_channel().await;
    let mut peer = channel.open_connected_session().await;

    let senders: Vec<_> = (0..4)
        .map(|task| {
            let connection = channel.connection.clone();
            tokio::spawn(async move {
                for seq in 0..25 {
                    connection
                        .send_event(&format!("task{}", task), &seq.to_string(), false)
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await.unwrap();
    }

    let mut next_seq: HashMap<String, u32> = HashMap::new();
    for _ in 0..100 {
        let command = timeout(Duration::from_secs(5), peer.next_command())
            .await
            .unwrap()
            .unwrap();
        match command {
            OutboundCommand::SendEvent { id, params, .. } => {
                let expected = next_seq.entry(id).or_insert(0);
                assert_eq!(params, expected.to_string());
                *expected += 1;
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
    assert_eq!(next_seq.len(), 4);
    assert!(next_seq.values().all(|&count| count == 25));
}

#[tokio::test]
async fn test_racing_connects_leave_one_session() {
    let mut channel = create_test_channel().await;
    let connection = channel.connection.clone();

    let (first, second) = tokio::join!(connection.connect(), channel.connection.connect());
    assert!(first.is_ok() || second.is_ok());
    assert_eq!(channel.connection.state().await, SessionState::AwaitingAck);

    // Only the surviving session still accepts frames from the channel
    let mut live = Vec::new();
    while let Ok(Some(peer)) =
        timeout(Duration::from_millis(100), channel.acceptor.accept()).await
    {
        if !peer.is_closed_by_client() {
            live.push(peer);
        }
    }
    assert_eq!(live.len(), 1);

    live[0].push_frame(&InboundFrame::Connected).unwrap();
    assert_eq!(channel.next_event().await, ChannelEvent::Connected);
}
