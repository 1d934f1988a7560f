//! TTL cache shared by the poller and the views.
//!
//! Three namespaces live behind one mutex:
//! - entity cache (runs and run list pages), short-lived
//! - navigation context, scratch data passed between screens
//! - durable state (cached identity, recent repositories) that is
//!   snapshotted to disk
//!
//! Disk errors never escape: a missing or corrupt snapshot is an empty cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::types::{Run, RunPage, UserIdentity};

pub const DEFAULT_RUN_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const MAX_RECENT_REPOSITORIES: usize = 10;
const SNAPSHOT_VERSION: u32 = 1;

/// A cached value with its write time and time-to-live.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    written_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            written_at: Instant::now(),
            ttl,
        }
    }

    /// Valid iff `now - written_at < ttl`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) < self.ttl
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn age(&self) -> Duration {
        self.written_at.elapsed()
    }
}

/// What the cache knows about a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunLookup {
    /// Terminal run: safe to use without asking the server again.
    Fresh(Run),
    /// Non-terminal run within TTL: fine to render, must be refreshed.
    Stale(Run),
    Missing,
}

/// Identity persisted across sessions, bound to the credential that fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub user: UserIdentity,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub identity: Option<CachedIdentity>,
    #[serde(default)]
    pub recent_repositories: Vec<String>,
}

/// Settings for a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub run_ttl: Duration,
    pub identity_ttl: Duration,
    /// `None` disables persistence.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            run_ttl: DEFAULT_RUN_TTL,
            identity_ttl: DEFAULT_IDENTITY_TTL,
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Counters shown on the status screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub runs: usize,
    pub valid_runs: usize,
    pub list_pages: usize,
    pub context_keys: usize,
    pub has_identity: bool,
}

#[derive(Default)]
struct CacheInner {
    runs: HashMap<String, CacheEntry<Run>>,
    run_lists: HashMap<(usize, usize), CacheEntry<RunPage>>,
    navigation: HashMap<String, serde_json::Value>,
    identity: Option<CachedIdentity>,
    recent_repositories: Vec<String>,
}

/// Thread-safe cache store.
pub struct CacheStore {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

/// Default snapshot location: `<config dir>/runboard/cache.json`.
pub fn default_snapshot_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("runboard").join("cache.json"))
}

/// Hex-encoded SHA-256 of a credential, so the snapshot never stores the secret.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// In-memory cache with default TTLs and no persistence.
    pub fn in_memory() -> Self {
        Self::new(CacheConfig {
            snapshot_path: None,
            ..CacheConfig::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_ttl(&self) -> Duration {
        self.config.run_ttl
    }

    // --- Runs ---

    /// Cached run, if its entry is still valid.
    pub fn get_run(&self, id: &str) -> Option<Run> {
        let inner = self.lock();
        inner
            .runs
            .get(id)
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.value().clone())
    }

    /// Store a run. Terminal runs never change again, so they do not expire.
    pub fn set_run(&self, run: Run) {
        let ttl = if run.is_terminal() {
            Duration::MAX
        } else {
            self.config.run_ttl
        };
        let mut inner = self.lock();
        inner.runs.insert(run.id.clone(), CacheEntry::new(run, ttl));
    }

    pub fn invalidate_run(&self, id: &str) {
        self.lock().runs.remove(id);
    }

    /// Classify a cached run for the read-through policy.
    pub fn lookup_run(&self, id: &str) -> RunLookup {
        match self.get_run(id) {
            Some(run) if run.is_terminal() => RunLookup::Fresh(run),
            Some(run) => RunLookup::Stale(run),
            None => RunLookup::Missing,
        }
    }

    // --- Run lists ---

    pub fn get_run_list(&self, limit: usize, offset: usize) -> Option<RunPage> {
        let inner = self.lock();
        inner
            .run_lists
            .get(&(limit, offset))
            .filter(|entry| entry.is_valid())
            .map(|entry| entry.value().clone())
    }

    /// Cache a list page; its runs also refresh the per-run entries.
    pub fn set_run_list(&self, limit: usize, offset: usize, page: RunPage) {
        for run in &page.runs {
            self.set_run(run.clone());
        }
        let ttl = self.config.run_ttl;
        self.lock()
            .run_lists
            .insert((limit, offset), CacheEntry::new(page, ttl));
    }

    /// Drop every cached list page; the next list read refetches.
    pub fn invalidate_run_list(&self) {
        self.lock().run_lists.clear();
    }

    /// Most recently cached first page, if any, for the dashboard.
    pub fn latest_runs(&self, limit: usize) -> Option<RunPage> {
        self.get_run_list(limit, 0)
    }

    /// Drop runs and lists. Durable state and navigation context stay.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.runs.clear();
        inner.run_lists.clear();
    }

    // --- Navigation context ---

    pub fn set_navigation_context(&self, key: &str, value: serde_json::Value) {
        self.lock().navigation.insert(key.to_string(), value);
    }

    pub fn get_navigation_context(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().navigation.get(key).cloned()
    }

    pub fn clear_all_navigation_context(&self) {
        self.lock().navigation.clear();
    }

    pub fn navigation_context_len(&self) -> usize {
        self.lock().navigation.len()
    }

    // --- Identity ---

    /// Cached identity for this credential, if not expired.
    pub fn cached_identity(&self, token_hash: &str) -> Option<UserIdentity> {
        let inner = self.lock();
        inner
            .identity
            .as_ref()
            .filter(|cached| cached.token_hash == token_hash && cached.expires_at > Utc::now())
            .map(|cached| cached.user.clone())
    }

    pub fn set_identity(&self, user: UserIdentity, token_hash: &str) {
        let ttl = chrono::Duration::from_std(self.config.identity_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        self.lock().identity = Some(CachedIdentity {
            user,
            token_hash: token_hash.to_string(),
            expires_at: Utc::now() + ttl,
        });
    }

    // --- Recent repositories ---

    /// Move `repository` to the front of the recent list.
    pub fn record_repository(&self, repository: &str) {
        let repository = repository.trim();
        if repository.is_empty() {
            return;
        }
        let mut inner = self.lock();
        inner.recent_repositories.retain(|r| r != repository);
        inner.recent_repositories.insert(0, repository.to_string());
        inner.recent_repositories.truncate(MAX_RECENT_REPOSITORIES);
    }

    pub fn recent_repositories(&self) -> Vec<String> {
        self.lock().recent_repositories.clone()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let now = Instant::now();
        CacheStats {
            runs: inner.runs.len(),
            valid_runs: inner.runs.values().filter(|e| e.is_valid_at(now)).count(),
            list_pages: inner.run_lists.len(),
            context_keys: inner.navigation.len(),
            has_identity: inner.identity.is_some(),
        }
    }

    // --- Persistence ---

    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.lock();
        CacheSnapshot {
            version: SNAPSHOT_VERSION,
            identity: inner.identity.clone(),
            recent_repositories: inner.recent_repositories.clone(),
        }
    }

    fn restore(&self, snapshot: CacheSnapshot) {
        let mut inner = self.lock();
        inner.identity = snapshot.identity.filter(|id| id.expires_at > Utc::now());
        inner.recent_repositories = snapshot.recent_repositories;
        inner.recent_repositories.truncate(MAX_RECENT_REPOSITORIES);
    }

    /// Write durable state to disk. Failures are logged and ignored.
    pub fn save_to_disk(&self) {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return;
        };
        if let Err(e) = write_snapshot(path, &self.snapshot()) {
            warn!(path = %path.display(), error = %e, "failed to save cache snapshot");
        }
    }

    /// Restore durable state from disk. A missing or unreadable snapshot
    /// leaves the cache empty.
    pub fn load_from_disk(&self) {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return;
        };
        match read_snapshot(path) {
            Ok(Some(snapshot)) => {
                debug!(path = %path.display(), "restored cache snapshot");
                self.restore(snapshot);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable cache snapshot");
            }
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<Option<CacheSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_snapshot(path: &Path, snapshot: &CacheSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Write-then-rename so a crash never leaves a half-written snapshot.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStatus;
    use tempfile::TempDir;

    fn make_run(id: &str, status: RunStatus) -> Run {
        let now = Utc::now();
        Run {
            id: id.to_string(),
            repository: "acme/widgets".to_string(),
            title: String::new(),
            prompt: "do it".to_string(),
            source_branch: None,
            target_branch: None,
            run_type: Default::default(),
            status,
            created_at: now,
            updated_at: now,
            completed_at: None,
            pr_url: None,
            error: None,
            result: None,
        }
    }

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u1".to_string(),
            username: "octo".to_string(),
            email: None,
        }
    }

    fn store_at(path: PathBuf) -> CacheStore {
        CacheStore::new(CacheConfig {
            snapshot_path: Some(path),
            ..CacheConfig::default()
        })
    }

    #[test]
    fn test_entry_validity_window() {
        let entry = CacheEntry::new(1, Duration::from_secs(10));
        let written = entry.written_at;
        assert!(entry.is_valid_at(written));
        assert!(entry.is_valid_at(written + Duration::from_secs(9)));
        assert!(!entry.is_valid_at(written + Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_ttl_entry_is_never_valid() {
        let entry = CacheEntry::new("x", Duration::ZERO);
        assert!(!entry.is_valid());
    }

    #[test]
    fn test_set_get_invalidate_run() {
        let cache = CacheStore::in_memory();
        cache.set_run(make_run("r1", RunStatus::Queued));
        assert!(cache.get_run("r1").is_some());

        cache.invalidate_run("r1");
        assert!(cache.get_run("r1").is_none());
    }

    #[test]
    fn test_lookup_classifies_terminal_and_active_runs() {
        let cache = CacheStore::in_memory();
        cache.set_run(make_run("done", RunStatus::Done));
        cache.set_run(make_run("active", RunStatus::Processing));

        assert!(matches!(cache.lookup_run("done"), RunLookup::Fresh(_)));
        assert!(matches!(cache.lookup_run("active"), RunLookup::Stale(_)));
        assert_eq!(cache.lookup_run("nope"), RunLookup::Missing);
    }

    #[test]
    fn test_terminal_runs_outlive_the_ttl() {
        let cache = CacheStore::new(CacheConfig {
            run_ttl: Duration::ZERO,
            snapshot_path: None,
            ..CacheConfig::default()
        });
        cache.set_run(make_run("done", RunStatus::Failed));
        cache.set_run(make_run("active", RunStatus::Queued));

        assert!(cache.get_run("done").is_some());
        assert!(cache.get_run("active").is_none());
    }

    #[test]
    fn test_run_list_round_trip_and_invalidate() {
        let cache = CacheStore::in_memory();
        let page = RunPage {
            runs: vec![make_run("a", RunStatus::Done)],
            total: 1,
        };
        cache.set_run_list(20, 0, page.clone());

        assert_eq!(cache.get_run_list(20, 0), Some(page));
        assert!(cache.get_run_list(20, 20).is_none());
        // Listed runs are also cached individually
        assert!(cache.get_run("a").is_some());

        cache.invalidate_run_list();
        assert!(cache.get_run_list(20, 0).is_none());
    }

    #[test]
    fn test_clear_keeps_navigation_context() {
        let cache = CacheStore::in_memory();
        cache.set_run(make_run("a", RunStatus::Done));
        cache.set_navigation_context("k", serde_json::json!(1));

        cache.clear();

        assert!(cache.get_run("a").is_none());
        assert_eq!(cache.get_navigation_context("k"), Some(serde_json::json!(1)));
    }

    #[test]
    fn test_navigation_context_clear_all() {
        let cache = CacheStore::in_memory();
        cache.set_navigation_context("a", serde_json::json!("x"));
        cache.set_navigation_context("b", serde_json::json!({"n": 2}));
        assert_eq!(cache.navigation_context_len(), 2);

        cache.clear_all_navigation_context();
        assert_eq!(cache.navigation_context_len(), 0);
        assert!(cache.get_navigation_context("a").is_none());
    }

    #[test]
    fn test_identity_bound_to_token_hash() {
        let cache = CacheStore::in_memory();
        let hash = hash_token("secret");
        cache.set_identity(user(), &hash);

        assert_eq!(cache.cached_identity(&hash), Some(user()));
        assert!(cache.cached_identity(&hash_token("other")).is_none());
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("test");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, hash_token("test2"));
    }

    #[test]
    fn test_recent_repositories_are_deduplicated_and_capped() {
        let cache = CacheStore::in_memory();
        for i in 0..12 {
            cache.record_repository(&format!("acme/repo{}", i));
        }
        cache.record_repository("acme/repo5");
        cache.record_repository("  ");

        let recent = cache.recent_repositories();
        assert_eq!(recent.len(), MAX_RECENT_REPOSITORIES);
        assert_eq!(recent[0], "acme/repo5");
        assert_eq!(recent.iter().filter(|r| *r == "acme/repo5").count(), 1);
    }

    #[test]
    fn test_snapshot_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = store_at(path.clone());
        cache.set_identity(user(), "hash");
        cache.record_repository("acme/widgets");
        cache.save_to_disk();
        assert!(path.exists());

        let restored = store_at(path);
        restored.load_from_disk();
        assert_eq!(restored.cached_identity("hash"), Some(user()));
        assert_eq!(restored.recent_repositories(), vec!["acme/widgets".to_string()]);
    }

    #[test]
    fn test_corrupt_snapshot_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = store_at(path);
        cache.load_from_disk();

        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.recent_repositories().is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = store_at(dir.path().join("absent.json"));
        cache.load_from_disk();
        assert!(!cache.stats().has_identity);
    }

    #[test]
    fn test_expired_identity_is_dropped_on_restore() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let snapshot = CacheSnapshot {
            version: SNAPSHOT_VERSION,
            identity: Some(CachedIdentity {
                user: user(),
                token_hash: "hash".to_string(),
                expires_at: Utc::now() - chrono::Duration::hours(1),
            }),
            recent_repositories: vec![],
        };
        fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let cache = store_at(path);
        cache.load_from_disk();
        assert!(cache.cached_identity("hash").is_none());
        assert!(!cache.stats().has_identity);
    }
}
