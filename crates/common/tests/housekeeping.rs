//! Integration tests for expiry sweeps and fleet housekeeping

mod common;

use std::sync::atomic::Ordering;

use chrono::TimeDelta;

use ::common::prelude::*;
use common::{Event, OTHER_REPO, REPO};

#[tokio::test]
async fn test_sweep_removes_only_expired_artifacts() {
    let env = common::setup_test_env();
    let repo = env.repo();
    env.store
        .upload(&repo, Upload::new("a", &b"old"[..], 10))
        .await
        .unwrap();
    env.store
        .upload(&repo, Upload::new("b", &b"new"[..], 1000))
        .await
        .unwrap();

    env.clock.advance(TimeDelta::seconds(20));
    let outcome = env.store.sweep(&repo).await.unwrap();

    assert_eq!(
        outcome,
        SweepOutcome::Swept {
            cleaned: 1,
            errors: 0
        }
    );
    assert!(!env.repo_path(&repo).join("a").exists());
    assert!(env.repo_path(&repo).join("b").exists());
    let index = TtlIndex::load(&env.repo_path(&repo)).unwrap();
    assert_eq!(index.names().collect::<Vec<_>>(), vec!["b"]);
}

#[tokio::test]
async fn test_sweep_counts_missing_files_and_drops_their_entries() {
    let env = common::setup_test_env();
    let repo = env.repo();
    let path = env.repo_path(&repo);
    let now = env.clock.now();

    let mut index = TtlIndex::default();
    index.insert("gone", TtlRecord::new(now - TimeDelta::seconds(10)));
    index.insert("present", TtlRecord::new(now - TimeDelta::seconds(10)));
    index.save(&path).unwrap();
    std::fs::write(path.join("present"), b"x").unwrap();

    let outcome = env.store.sweep(&repo).await.unwrap();

    assert_eq!(outcome.cleaned(), 1);
    assert_eq!(outcome.errors(), 1);
    assert!(TtlIndex::load(&path).unwrap().is_empty());
    assert!(!path.join("present").exists());
}

#[tokio::test]
async fn test_sweep_drops_unusable_entry_names_without_touching_disk() {
    let env = common::setup_test_env();
    let repo = env.repo();
    let path = env.repo_path(&repo);
    let outside = env.dir.path().join("outside");
    std::fs::write(&outside, b"keep me").unwrap();

    let mut index = TtlIndex::default();
    index.insert("../outside", TtlRecord::new(common::at(1)));
    index.save(&path).unwrap();

    let outcome = env.store.sweep(&repo).await.unwrap();

    assert_eq!(outcome.errors(), 1);
    assert!(outside.exists());
    assert!(TtlIndex::load(&path).unwrap().is_empty());
}

#[tokio::test]
async fn test_sweep_without_index_is_a_no_op() {
    let env = common::setup_test_env();
    let repo = env.repo();
    std::fs::write(env.repo_path(&repo).join("untracked"), b"x").unwrap();

    let outcome = env.store.sweep(&repo).await.unwrap();

    assert_eq!(outcome, SweepOutcome::NoIndex);
    assert!(env.backend.events().is_empty());
}

#[tokio::test]
async fn test_sweep_with_nothing_expired_still_publishes_once() {
    let env = common::setup_test_env();
    let repo = env.repo();
    env.store
        .upload(&repo, Upload::new("a", &b"x"[..], 1000))
        .await
        .unwrap();
    env.backend.clear();

    let outcome = env.store.sweep(&repo).await.unwrap();

    assert_eq!(outcome.cleaned(), 0);
    assert_eq!(
        env.backend.events(),
        vec![
            Event::Begin(REPO.to_string()),
            Event::Publish(REPO.to_string()),
            Event::Notify(REPO.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_malformed_index_aborts_the_sweep() {
    let env = common::setup_test_env();
    let repo = env.repo();
    std::fs::write(TtlIndex::path(&env.repo_path(&repo)), b"{broken").unwrap();

    let err = env.store.sweep(&repo).await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::Transaction(TransactionError::OperationFailed { .. })
    ));
    assert_eq!(
        std::fs::read(TtlIndex::path(&env.repo_path(&repo))).unwrap(),
        b"{broken"
    );
}

#[tokio::test]
async fn test_run_all_sweeps_every_repository_then_collects_once() {
    let env = common::setup_test_env();
    let repo = env.repo();
    let other = env.other_repo();
    env.store
        .upload(&repo, Upload::new("a", &b"x"[..], 10))
        .await
        .unwrap();
    env.store
        .upload(&other, Upload::new("b", &b"x"[..], 10))
        .await
        .unwrap();
    env.backend.clear();

    env.clock.advance(TimeDelta::seconds(60));
    let report = env.housekeeper().run_all().await.unwrap();

    assert_eq!(report.cleaned(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(env.backend.count(|e| *e == Event::Gc), 1);
    assert_eq!(env.backend.events().last(), Some(&Event::Gc));
    for name in [REPO, OTHER_REPO] {
        assert_eq!(
            env.backend
                .count(|e| *e == Event::Publish(name.to_string())),
            1
        );
    }
}

#[tokio::test]
async fn test_run_all_continues_past_a_failing_repository() {
    let env = common::setup_test_env();
    let repo = env.repo();
    let other = env.other_repo();
    std::fs::write(TtlIndex::path(&env.repo_path(&other)), b"not json").unwrap();
    env.store
        .upload(&repo, Upload::new("a", &b"x"[..], 10))
        .await
        .unwrap();
    env.clock.advance(TimeDelta::seconds(60));

    let report = env.housekeeper().run_all().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, other);
    assert_eq!(report.cleaned(), 1);
    assert_eq!(env.backend.count(|e| *e == Event::Gc), 1);
}

#[tokio::test]
async fn test_run_all_skips_non_repository_entries() {
    let env = common::setup_test_env();
    std::fs::create_dir(env.dir.path().join(".hidden")).unwrap();
    std::fs::create_dir(env.dir.path().join("not_a_repo!")).unwrap();
    std::fs::write(env.dir.path().join("stray-file"), b"x").unwrap();

    let report = env.housekeeper().run_all().await.unwrap();

    let swept: Vec<_> = report
        .swept
        .iter()
        .map(|(repository, _)| repository.to_string())
        .collect();
    assert_eq!(swept, vec![OTHER_REPO.to_string(), REPO.to_string()]);
}

#[tokio::test]
async fn test_gc_failure_is_reported() {
    let env = common::setup_test_env();
    env.backend.fail_gc.store(true, Ordering::SeqCst);

    let err = env.housekeeper().run_all().await.unwrap_err();
    assert!(matches!(err, HousekeepingError::GarbageCollection(_)));
}

#[tokio::test]
async fn test_resign_runs_the_primitive() {
    let env = common::setup_test_env();
    env.housekeeper().resign().await.unwrap();
    assert_eq!(env.backend.events(), vec![Event::Resign]);
}
