//! Election lifecycle tests against the in-memory coordination service.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use beacon::config::{Backend, ElectionConfig};
use beacon::coordination::{ELECTION_PATH, MemoryCoordinator};
use beacon::store::{ArtifactStore, ManualClock, artifact_name};
use beacon::{Driver, PhaseFactory, Phases};
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn config(dir: &Path, capacity: usize) -> ElectionConfig {
    ElectionConfig {
        backend: Backend::Memory,
        endpoints: Vec::new(),
        leader_interval: Duration::from_millis(1),
        attempt_interval: Duration::from_millis(1),
        artifact_dir: dir.to_path_buf(),
        capacity,
    }
}

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_790_000_000, 0).unwrap()
}

fn participant(
    coordinator: &MemoryCoordinator,
    dir: &Path,
    capacity: usize,
    clock: Arc<ManualClock>,
) -> Phases {
    let store = ArtifactStore::with_clock(dir, capacity, clock);
    Phases::with_store(config(dir, capacity), Arc::new(coordinator.clone()), store)
}

fn names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_leader_keeps_newest_artifacts() {
    let dir = TempDir::new().unwrap();
    let coordinator = MemoryCoordinator::new();
    let clock = Arc::new(ManualClock::new(start()));
    let phases = participant(&coordinator, dir.path(), 3, clock.clone());
    let cancel = CancellationToken::new();

    let t = phases.init().run(&cancel).await;
    assert_eq!(t.next_name(), Some("Attempt"));
    let t = phases.attempt().run(&cancel).await;
    assert_eq!(t.next_name(), Some("Lead"));

    let mut written = Vec::new();
    for cycle in 0..4u64 {
        written.push(artifact_name(start() + Duration::from_secs(cycle)));
        let t = phases.lead().run(&cancel).await;
        assert_eq!(t.next_name(), Some("Lead"));
        assert!(t.error.is_none());
        clock.advance(Duration::from_secs(1));

        if cycle < 3 {
            assert_eq!(names(dir.path()).len(), cycle as usize + 1);
        }
    }

    let expected: BTreeSet<String> = written[1..].iter().cloned().collect();
    assert_eq!(names(dir.path()), expected);
}

#[tokio::test]
async fn test_second_participant_takes_over_after_stop() {
    let dir = TempDir::new().unwrap();
    let coordinator = MemoryCoordinator::new();
    let clock = Arc::new(ManualClock::new(start()));
    let first = participant(&coordinator, dir.path(), 5, clock.clone());
    let second = participant(&coordinator, dir.path(), 5, clock.clone());
    let cancel = CancellationToken::new();

    first.init().run(&cancel).await;
    second.init().run(&cancel).await;

    assert_eq!(first.attempt().run(&cancel).await.next_name(), Some("Lead"));
    // the loser stays in Attempt while the node is held
    for _ in 0..3 {
        let t = second.attempt().run(&cancel).await;
        assert_eq!(t.next_name(), Some("Attempt"));
        assert!(t.error.is_none());
    }

    first.stop().run(&cancel).await;
    assert_eq!(coordinator.holder(ELECTION_PATH), None);

    assert_eq!(second.attempt().run(&cancel).await.next_name(), Some("Lead"));
    assert!(coordinator.holder(ELECTION_PATH).is_some());
}

#[tokio::test]
async fn test_expired_session_recovers_through_failover() {
    let dir = TempDir::new().unwrap();
    let coordinator = MemoryCoordinator::new();
    let clock = Arc::new(ManualClock::new(start()));
    let phases = participant(&coordinator, dir.path(), 3, clock);
    let cancel = CancellationToken::new();

    phases.init().run(&cancel).await;
    let holder = {
        phases.attempt().run(&cancel).await;
        coordinator.holder(ELECTION_PATH).unwrap()
    };
    coordinator.expire(holder);

    let t = phases.attempt().run(&cancel).await;
    assert_eq!(t.next_name(), Some("Failover"));
    assert!(t.error.is_some());

    let t = t.next.unwrap().run(&cancel).await;
    assert_eq!(t.next_name(), Some("Attempt"));
    assert_eq!(phases.attempt().run(&cancel).await.next_name(), Some("Lead"));
    assert_ne!(coordinator.holder(ELECTION_PATH), Some(holder));
}

#[tokio::test]
async fn test_driver_run_ends_on_cancel_and_releases_node() {
    let dir = TempDir::new().unwrap();
    let coordinator = MemoryCoordinator::new();
    let store = ArtifactStore::new(dir.path(), 2);
    let phases = Phases::with_store(
        ElectionConfig {
            leader_interval: Duration::from_millis(5),
            ..config(dir.path(), 2)
        },
        Arc::new(coordinator.clone()),
        store,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = coordinator.clone();
    tokio::spawn(async move {
        while watcher.holder(ELECTION_PATH).is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let summary = Driver::new().run(cancel, phases.init()).await.unwrap();
    assert_eq!(summary.faults, 0);
    assert!(summary.phases_run >= 4);
    assert_eq!(coordinator.holder(ELECTION_PATH), None);
    assert_eq!(coordinator.live_sessions(), 0);
    let kept = names(dir.path());
    assert!(!kept.is_empty() && kept.len() <= 2);
}
