//! Bounded directory of timestamped leader artifacts.
//!
//! The leader drops one empty file per duty cycle and evicts the oldest ones
//! once the directory holds more than `capacity` entries. Names carry an
//! RFC 3339 timestamp at second resolution:
//!
//! ```text
//! leader_file_2026-10-15T12:00:00Z
//! ```
//!
//! The file's modification time is set to the same instant, so ordering by
//! mtime and ordering by name agree for artifacts this store wrote.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::errors::StoreError;

pub const ARTIFACT_PREFIX: &str = "leader_file_";

/// Source of "now" for artifact names and mtimes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Artifact file name for an instant (truncated to the second).
pub fn artifact_name(at: DateTime<Utc>) -> String {
    format!(
        "{}{}",
        ARTIFACT_PREFIX,
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Recover the timestamp embedded in an artifact name.
pub fn parse_artifact_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let ts = name.strip_prefix(ARTIFACT_PREFIX)?;
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One directory entry as seen by the eviction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub name: String,
    pub modified: SystemTime,
}

pub struct ArtifactStore {
    dir: PathBuf,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("dir", &self.dir)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::with_clock(dir, capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            capacity,
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The directory exists, is a directory, and can be listed.
    pub fn check_accessible(&self) -> Result<(), StoreError> {
        fs::read_dir(&self.dir)
            .map(|_| ())
            .map_err(|source| StoreError::DirectoryInaccessible {
                path: self.dir.clone(),
                source,
            })
    }

    /// Create (or truncate) one empty artifact stamped with the clock's
    /// current time. Returns its file name.
    pub fn write_artifact(&self) -> Result<String, StoreError> {
        let now = self.clock.now();
        let name = artifact_name(now);
        let path = self.dir.join(&name);

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let write_err = |source| StoreError::WriteFailed {
            path: path.clone(),
            source,
        };
        let file = options.open(&path).map_err(write_err)?;
        file.set_modified(SystemTime::from(now)).map_err(write_err)?;

        Ok(name)
    }

    /// Every entry in the directory with its modification time, in listing order.
    pub fn list(&self) -> Result<Vec<ArtifactEntry>, StoreError> {
        let list_err = |source| StoreError::ListFailed {
            path: self.dir.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(list_err)?;
            entries.push(ArtifactEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified,
            });
        }
        Ok(entries)
    }

    /// Delete the oldest entries until at most `capacity` remain.
    ///
    /// Entries are ordered by mtime with a stable sort, so equal mtimes keep
    /// listing order. The first failed removal aborts the pass; whatever was
    /// already removed stays removed. Returns the evicted names.
    pub fn evict_oldest(&self, mut entries: Vec<ArtifactEntry>) -> Result<Vec<String>, StoreError> {
        if entries.len() <= self.capacity {
            return Ok(Vec::new());
        }

        entries.sort_by_key(|e| e.modified);
        let excess = entries.len() - self.capacity;

        let mut evicted = Vec::with_capacity(excess);
        for entry in entries.into_iter().take(excess) {
            let path = self.dir.join(&entry.name);
            fs::remove_file(&path).map_err(|source| StoreError::RemoveFailed { path, source })?;
            evicted.push(entry.name);
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn names(store: &ArtifactStore) -> Vec<String> {
        let mut names: Vec<String> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        names
    }

    #[test]
    fn test_artifact_name_format() {
        assert_eq!(artifact_name(start()), "leader_file_2026-10-15T12:00:00Z");
    }

    #[test]
    fn test_artifact_name_truncates_subseconds() {
        let at = start() + Duration::from_millis(999);
        assert_eq!(artifact_name(at), artifact_name(start()));
    }

    #[test]
    fn test_timestamp_round_trip_and_ordering() {
        let earlier = artifact_name(start());
        let later = artifact_name(start() + Duration::from_secs(1));
        assert_ne!(earlier, later);
        assert!(earlier < later);
        assert_eq!(parse_artifact_timestamp(&earlier), Some(start()));
        assert_eq!(
            parse_artifact_timestamp(&later),
            Some(start() + Duration::from_secs(1))
        );
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert_eq!(parse_artifact_timestamp("notes.txt"), None);
        assert_eq!(parse_artifact_timestamp("leader_file_yesterday"), None);
    }

    #[test]
    fn test_check_accessible() {
        let dir = tempdir().unwrap();
        assert!(ArtifactStore::new(dir.path(), 3).check_accessible().is_ok());

        let missing = ArtifactStore::new(dir.path().join("missing"), 3);
        assert!(matches!(
            missing.check_accessible(),
            Err(StoreError::DirectoryInaccessible { .. })
        ));

        let file = dir.path().join("plain");
        fs::write(&file, b"").unwrap();
        assert!(ArtifactStore::new(&file, 3).check_accessible().is_err());
    }

    #[test]
    fn test_write_creates_empty_file_with_clock_mtime() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = ArtifactStore::with_clock(dir.path(), 3, clock);

        let name = store.write_artifact().unwrap();
        let meta = fs::metadata(dir.path().join(&name)).unwrap();
        assert_eq!(meta.len(), 0);
        assert_eq!(meta.modified().unwrap(), SystemTime::from(start()));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_uses_0644() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 3);
        let name = store.write_artifact().unwrap();
        let mode = fs::metadata(dir.path().join(name)).unwrap().permissions().mode();
        // umask can only clear bits
        assert_eq!(mode & 0o777 & !0o644, 0);
    }

    #[test]
    fn test_same_second_writes_share_a_name() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = ArtifactStore::with_clock(dir.path(), 3, clock.clone());

        let a = store.write_artifact().unwrap();
        clock.advance(Duration::from_millis(200));
        let b = store.write_artifact().unwrap();
        assert_eq!(a, b);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("gone"), 3);
        assert!(matches!(
            store.write_artifact(),
            Err(StoreError::WriteFailed { .. })
        ));
        assert!(matches!(store.list(), Err(StoreError::ListFailed { .. })));
    }

    #[test]
    fn test_list_includes_foreign_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        let store = ArtifactStore::new(dir.path(), 3);
        store.write_artifact().unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_no_eviction_at_or_below_capacity() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = ArtifactStore::with_clock(dir.path(), 3, clock.clone());
        for _ in 0..3 {
            store.write_artifact().unwrap();
            clock.advance(Duration::from_secs(1));
        }
        let evicted = store.evict_oldest(store.list().unwrap()).unwrap();
        assert!(evicted.is_empty());
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        // N existing + 1 new, capacity C: N + 1 - C evicted.
        let n = 7;
        let c = 3;
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = ArtifactStore::with_clock(dir.path(), c, clock.clone());

        let mut written = Vec::new();
        for _ in 0..=n {
            written.push(store.write_artifact().unwrap());
            clock.advance(Duration::from_secs(1));
        }

        let evicted = store.evict_oldest(store.list().unwrap()).unwrap();
        assert_eq!(evicted.len(), n + 1 - c);
        assert_eq!(evicted, written[..n + 1 - c].to_vec());
        assert_eq!(names(&store), written[n + 1 - c..].to_vec());
    }

    #[test]
    fn test_eviction_orders_by_mtime_not_name() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 1);

        // "a" is newer than "b" despite sorting first by name
        let base = SystemTime::from(start());
        let a = fs::File::create(dir.path().join("a")).unwrap();
        a.set_modified(base + Duration::from_secs(10)).unwrap();
        let b = fs::File::create(dir.path().join("b")).unwrap();
        b.set_modified(base).unwrap();

        let evicted = store.evict_oldest(store.list().unwrap()).unwrap();
        assert_eq!(evicted, vec!["b".to_string()]);
        assert_eq!(names(&store), vec!["a".to_string()]);
    }

    #[test]
    fn test_failed_removal_keeps_partial_progress() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(start()));
        let store = ArtifactStore::with_clock(dir.path(), 1, clock.clone());

        let first = store.write_artifact().unwrap();
        clock.advance(Duration::from_secs(1));
        let second = store.write_artifact().unwrap();
        clock.advance(Duration::from_secs(1));
        store.write_artifact().unwrap();

        // The second-oldest vanishes between listing and eviction
        let entries = store.list().unwrap();
        fs::remove_file(dir.path().join(&second)).unwrap();

        let err = store.evict_oldest(entries).unwrap_err();
        assert!(matches!(err, StoreError::RemoveFailed { .. }));
        assert!(!dir.path().join(&first).exists());
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
