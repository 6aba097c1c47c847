//! Integration tests for session bootstrap and the long-poll loop.
//!
//! A scripted transport stands in for the server. Tests that exercise the
//! hard timeout run on a paused clock so the 40 second deadline elapses
//! instantly.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::time::Duration;

use clanraid_sync::{
    ApiError, NoticeOrigin, PollExit, PollState, RetryDecision, SessionError, SnapshotSource,
    SurfaceEvent,
};
use clanraid_types::{ApiRequest, ApiResponse, MemberId, ServerCode};
use common::{ScriptedTransport, Step, boss, decoded_snapshot, next_event, snapshot, start};

const POLL: &str = "update_boss";

#[tokio::test]
async fn bootstrap_snapshot_is_stored_exactly() {
    let transport = ScriptedTransport::default();
    let initial = boss(3, 2, 500_000, 1_000_000);
    let (session, _events) = start(&transport, initial).await;

    let view = session.store().view();
    assert_eq!(view.boss, initial);
    assert_eq!(view.revision, 0);
    assert_eq!(view.source, SnapshotSource::Bootstrap);

    let data = session.data();
    assert!(data.is_admin);
    assert_eq!(data.self_id, common::SELF_ID);
    assert_eq!(data.group.game_server, "jp");
    assert_eq!(session.store().roster().len(), 3);
    assert_eq!(session.store().roster().label(MemberId(10002)), "Kokkoro");
    assert_eq!(session.store().roster().label(MemberId(10003)), "10003");
}

#[tokio::test]
async fn bootstrap_failure_yields_no_session() {
    let transport = ScriptedTransport::default();
    transport.respond(
        "get_data",
        ApiResponse::error(ServerCode::Rejected, "not logged in"),
    );
    let (surface, _events) = clanraid_sync::ChannelSurface::new();
    let result = clanraid_sync::Session::bootstrap(
        transport.clone(),
        surface,
        clanraid_sync::PollSettings::default(),
    )
    .await;

    match result {
        Err(SessionError::Api {
            source: ApiError::Server { code, message },
        }) => {
            assert_eq!(code, ServerCode::Rejected);
            assert_eq!(message, "not logged in");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("bootstrap should fail"),
    }
    assert!(transport.calls_of("get_member_list").is_empty());
}

#[tokio::test]
async fn successive_snapshots_replace_state_wholesale() {
    let transport = ScriptedTransport::default();
    let (session, _events) = start(&transport, boss(1, 1, 1000, 1000)).await;

    let snapshots = [
        boss(1, 1, 400, 1000),
        boss(1, 2, 2000, 2000).with_challenger(Some(MemberId(10002))),
        boss(1, 2, 1500, 2000),
    ];
    for state in snapshots {
        transport.respond(POLL, snapshot(state));
    }

    let handle = session.start_polling().unwrap();
    transport.wait_for_calls(POLL, 4).await;

    let view = session.store().view();
    assert_eq!(view.boss, boss(1, 2, 1500, 2000));
    assert_eq!(view.boss.challenger, None);
    assert_eq!(view.revision, 3);
    assert_eq!(view.source, SnapshotSource::Poll);

    for (request, deadline) in transport.calls_of(POLL) {
        assert_eq!(request, ApiRequest::UpdateBoss { timeout: 30 });
        assert_eq!(deadline, Some(Duration::from_secs(40)));
    }

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
}

#[tokio::test]
async fn overridden_health_above_pool_is_applied_from_poll() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.respond(
        POLL,
        decoded_snapshot(serde_json::json!({
            "cycle": 1,
            "num": 1,
            "health": 9_000_000,
            "full_health": 6_000_000
        })),
    );

    let handle = session.start_polling().unwrap();
    transport.wait_for_calls(POLL, 2).await;

    let view = session.store().view();
    assert_eq!(view.boss.health, 9_000_000);
    assert_eq!(view.boss.full_health, 6_000_000);
    assert_eq!(view.revision, 1);
    assert_eq!(handle.state(), PollState::Awaiting);
    assert!(events.try_recv().is_err());

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
}

#[tokio::test]
async fn not_changed_reissues_without_side_effects() {
    let transport = ScriptedTransport::default();
    let initial = boss(2, 5, 77, 100);
    let (session, mut events) = start(&transport, initial).await;
    transport.respond(POLL, ApiResponse::not_changed());

    let handle = session.start_polling().unwrap();
    transport.wait_for_calls(POLL, 2).await;

    assert_eq!(transport.calls_of(POLL).len(), 2);
    assert_eq!(session.store().view().revision, 0);
    assert_eq!(session.store().boss(), initial);
    assert_eq!(handle.state(), PollState::Awaiting);
    assert!(events.try_recv().is_err());

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
}

#[tokio::test]
async fn poll_notice_is_delivered_once() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.respond(
        POLL,
        snapshot(boss(1, 2, 1000, 1000)).with_notice("Boss 1 was defeated"),
    );

    let handle = session.start_polling().unwrap();
    match next_event(&mut events).await {
        SurfaceEvent::Notice(notice) => {
            assert_eq!(notice.text, "Boss 1 was defeated");
            assert_eq!(notice.origin, NoticeOrigin::Poll);
        }
        other => panic!("unexpected event {other:?}"),
    }

    transport.wait_for_calls(POLL, 2).await;
    assert!(events.try_recv().is_err());
    assert_eq!(session.store().boss().num, 2);

    session.shutdown();
    handle.join().await;
}

#[tokio::test]
async fn failure_waits_for_user_before_polling_again() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.fail(POLL, ApiError::Network(String::from("connection reset")));
    transport.respond(POLL, snapshot(boss(1, 1, 250, 1000)));

    let handle = session.start_polling().unwrap();
    let reply = match next_event(&mut events).await {
        SurfaceEvent::RetryPrompt { error, reply } => {
            assert_eq!(error, ApiError::Network(String::from("connection reset")));
            reply
        }
        other => panic!("unexpected event {other:?}"),
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls_of(POLL).len(), 1);
    assert_eq!(handle.state(), PollState::BackoffPrompt);
    assert_eq!(session.store().view().revision, 0);

    reply.send(RetryDecision::Retry).unwrap();
    transport.wait_for_calls(POLL, 3).await;

    let calls = transport.calls_of(POLL);
    assert_eq!(calls.first(), calls.get(1));
    assert_eq!(session.store().boss().health, 250);

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
}

#[tokio::test]
async fn abandon_stops_polling_for_the_session() {
    let transport = ScriptedTransport::default();
    let initial = boss(1, 1, 1000, 1000);
    let (session, mut events) = start(&transport, initial).await;
    transport.respond(POLL, ApiResponse::error(ServerCode::Rejected, "not logged in"));

    let handle = session.start_polling().unwrap();
    let state = handle.subscribe();
    match next_event(&mut events).await {
        SurfaceEvent::RetryPrompt { error, reply } => {
            assert_eq!(error.to_string(), "not logged in");
            reply.send(RetryDecision::Abandon).unwrap();
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert_eq!(handle.join().await, PollExit::Abandoned);
    assert_eq!(*state.borrow(), PollState::Terminated(PollExit::Abandoned));
    assert_eq!(transport.calls_of(POLL).len(), 1);
    assert_eq!(session.store().boss(), initial);
    assert!(matches!(
        session.start_polling(),
        Err(SessionError::AlreadyPolling)
    ));
}

#[tokio::test]
async fn second_poll_loop_is_refused() {
    let transport = ScriptedTransport::default();
    let (session, _events) = start(&transport, boss(1, 1, 1000, 1000)).await;

    let handle = session.start_polling().unwrap();
    assert!(matches!(
        session.start_polling(),
        Err(SessionError::AlreadyPolling)
    ));
    transport.wait_for_calls(POLL, 1).await;
    assert_eq!(transport.calls_of(POLL).len(), 1);

    session.shutdown();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn hard_timeout_prompts_and_retry_reissues_same_request() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.push(POLL, Step::Hang);

    let started = tokio::time::Instant::now();
    let handle = session.start_polling().unwrap();
    let reply = match events.recv().await.unwrap() {
        SurfaceEvent::RetryPrompt { error, reply } => {
            assert_eq!(error, ApiError::Timeout(Duration::from_secs(40)));
            reply
        }
        other => panic!("unexpected event {other:?}"),
    };
    assert!(started.elapsed() >= Duration::from_secs(40));
    assert_eq!(transport.calls_of(POLL).len(), 1);

    reply.send(RetryDecision::Retry).unwrap();
    transport.wait_for_calls(POLL, 2).await;
    let calls = transport.calls_of(POLL);
    assert_eq!(calls.first(), calls.get(1));

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
}

#[tokio::test]
async fn cancellation_while_awaiting_is_silent() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.push(POLL, Step::Hang);

    let handle = session.start_polling().unwrap();
    let state = handle.subscribe();
    transport.wait_for_calls(POLL, 1).await;

    session.shutdown();
    assert!(session.is_shut_down());
    assert_eq!(handle.join().await, PollExit::Cancelled);
    assert_eq!(*state.borrow(), PollState::Terminated(PollExit::Cancelled));
    assert!(events.try_recv().is_err());
    assert_eq!(transport.calls_of(POLL).len(), 1);
}

#[tokio::test]
async fn transport_cancellation_ends_loop_without_prompt() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.fail(POLL, ApiError::Cancelled);

    let handle = session.start_polling().unwrap();
    assert_eq!(handle.join().await, PollExit::Cancelled);
    assert!(events.try_recv().is_err());
    assert_eq!(transport.calls_of(POLL).len(), 1);
}

#[tokio::test]
async fn cancellation_during_prompt_ends_loop() {
    let transport = ScriptedTransport::default();
    let (session, mut events) = start(&transport, boss(1, 1, 1000, 1000)).await;
    transport.fail(POLL, ApiError::Http(502));

    let handle = session.start_polling().unwrap();
    let _reply = match next_event(&mut events).await {
        SurfaceEvent::RetryPrompt { error, reply } => {
            assert_eq!(error, ApiError::Http(502));
            reply
        }
        other => panic!("unexpected event {other:?}"),
    };

    session.shutdown();
    assert_eq!(handle.join().await, PollExit::Cancelled);
    assert_eq!(transport.calls_of(POLL).len(), 1);
}

#[tokio::test]
async fn success_without_snapshot_is_a_fault() {
    let transport = ScriptedTransport::default();
    let initial = boss(1, 1, 1000, 1000);
    let (session, mut events) = start(&transport, initial).await;
    transport.respond(POLL, ApiResponse::success().with_notice("ignored"));

    let handle = session.start_polling().unwrap();
    match next_event(&mut events).await {
        SurfaceEvent::RetryPrompt { error, reply } => {
            assert!(matches!(error, ApiError::Decode(_)));
            reply.send(RetryDecision::Abandon).unwrap();
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert_eq!(handle.join().await, PollExit::Abandoned);
    assert_eq!(session.store().boss(), initial);
    assert_eq!(session.store().view().revision, 0);
}
