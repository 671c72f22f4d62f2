//! Integration tests for the fleet-wide transaction lock
//!
//! Mutations on the same and on different repositories must never have
//! overlapping begin..publish windows, and a caller that goes away must not
//! leave a transaction open.

mod common;

use std::time::Duration;

use futures::future::join_all;

use ::common::prelude::*;
use common::Event;

fn assert_transactions_never_overlap(events: &[Event]) {
    let mut open: Option<&str> = None;
    for event in events {
        match event {
            Event::Begin(repository) => {
                assert!(
                    open.is_none(),
                    "begin on {repository} while {open:?} was open: {events:?}"
                );
                open = Some(repository);
            }
            Event::Publish(repository) | Event::Abort(repository) => {
                assert_eq!(open, Some(repository.as_str()), "{events:?}");
                open = None;
            }
            Event::Notify(_) | Event::Gc | Event::Resign => {}
        }
    }
    assert!(open.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_are_serialized_fleet_wide() {
    let env = common::setup_test_env();
    *env.backend.delay.lock() = Some(Duration::from_millis(10));
    let repos = [env.repo(), env.other_repo()];

    let uploads = (0..8).map(|i| {
        let store = env.store.clone();
        let repository = repos[i % 2].clone();
        tokio::spawn(async move {
            store
                .upload(&repository, Upload::new(format!("artifact-{i}"), &b"x"[..], 100))
                .await
        })
    });
    for result in join_all(uploads).await {
        result.unwrap().unwrap();
    }

    let events = env.backend.events();
    assert_eq!(events.iter().filter(|e| matches!(e, Event::Begin(_))).count(), 8);
    assert_transactions_never_overlap(&events);

    let mut windows = Vec::new();
    let mut started = None;
    for (event, at) in env.backend.timed_events() {
        match event {
            Event::Begin(_) => started = Some(at),
            Event::Publish(_) => windows.push((started.take().unwrap(), at)),
            _ => {}
        }
    }
    assert_eq!(windows.len(), 8);
    for pair in windows.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "transaction windows overlap");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweeps_and_gc_interleave_safely_with_uploads() {
    let env = common::setup_test_env();
    let repo = env.repo();
    env.store
        .upload(&repo, Upload::new("seed", &b"x"[..], 1))
        .await
        .unwrap();
    *env.backend.delay.lock() = Some(Duration::from_millis(5));

    let housekeeper = env.housekeeper();
    let mut tasks = Vec::new();
    for i in 0..4 {
        let store = env.store.clone();
        let repository = repo.clone();
        tasks.push(tokio::spawn(async move {
            store
                .upload(&repository, Upload::new(format!("u{i}"), &b"x"[..], 100))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }));
        let housekeeper = housekeeper.clone();
        tasks.push(tokio::spawn(async move {
            housekeeper
                .run_all()
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }));
    }
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_transactions_never_overlap(&env.backend.events());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_caller_does_not_interrupt_the_transaction() {
    let env = common::setup_test_env();
    let repo = env.repo();
    *env.backend.delay.lock() = Some(Duration::from_millis(100));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        env.store
            .upload(&repo, Upload::new("abandoned", &b"x"[..], 100)),
    )
    .await;
    assert!(abandoned.is_err(), "upload should still be in flight");

    // queues behind the abandoned transaction on the global lock
    *env.backend.delay.lock() = None;
    env.store
        .upload(&repo, Upload::new("next", &b"y"[..], 100))
        .await
        .unwrap();

    assert!(env.repo_path(&repo).join("abandoned").is_file());
    let index = TtlIndex::load(&env.repo_path(&repo)).unwrap();
    assert!(index.contains("abandoned"));
    assert!(index.contains("next"));
    assert_transactions_never_overlap(&env.backend.events());
}
