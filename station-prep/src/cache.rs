//! Persistent result cache for pipeline stages.
//!
//! Each named slot holds exactly one `{key, value}` entry in
//! `<dir>/<slot>.json`. A stage runs through [`ResultCache::run_cached`]: if
//! the stored key equals the key derived from the current input, the stored
//! value is returned and the stage is skipped; otherwise the stage runs and
//! its result replaces the slot.
//!
//! Keys are cheap proxies for input identity, chosen per call site:
//!
//! * [`CacheKey::Length`] / [`CacheKey::Value`] reproduce the historical
//!   cardinality key. Two inputs of the same length but different content
//!   are treated as identical, so a stale result can be served.
//! * [`CacheKey::Content`] hashes the input and detects content changes.
//!
//! There is no locking. Two processes writing the same slot at once race.

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Default cache directory, relative to the working directory.
const DEFAULT_CACHE_DIR: &str = "cache";

/// How pipeline stages derive their cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Key on input length (sequences) or the argument itself (paths).
    /// Misses content-only changes.
    Cardinality,
    /// Key on a hash of the input content.
    #[default]
    Content,
}

impl FromStr for KeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cardinality" | "length" => Ok(KeyPolicy::Cardinality),
            "content" | "hash" => Ok(KeyPolicy::Content),
            other => Err(format!(
                "unknown key policy {other:?}, expected \"cardinality\" or \"content\""
            )),
        }
    }
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::Cardinality => f.write_str("cardinality"),
            KeyPolicy::Content => f.write_str("content"),
        }
    }
}

/// Cheap identity of a stage's input, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheKey {
    /// Length of an ordered input sequence.
    Length(usize),
    /// A scalar argument, rendered as text.
    Value(String),
    /// xxh3 hash of the input content.
    Content(u64),
}

impl CacheKey {
    /// Key on the number of items in a sequence.
    pub fn of_len<T>(items: &[T]) -> Self {
        CacheKey::Length(items.len())
    }

    /// Key on a scalar argument such as a file path.
    pub fn of_value(value: impl fmt::Display) -> Self {
        CacheKey::Value(value.to_string())
    }

    /// Key on raw bytes.
    pub fn of_content(bytes: &[u8]) -> Self {
        CacheKey::Content(xxh3_64(bytes))
    }

    /// Key on the JSON serialization of a value.
    pub fn of_serialized<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::of_content(&serde_json::to_vec(value)?))
    }

    /// Key on anything hashable. The hasher is seedless, so the key is stable
    /// across processes as long as the `Hash` impl is.
    pub fn of_hash<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = Xxh3::new();
        value.hash(&mut hasher);
        CacheKey::Content(hasher.finish())
    }
}

/// A persisted cache slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    /// Unix timestamp when the entry was written.
    pub cached_at_secs: u64,
    pub value: V,
}

/// Borrowing twin of [`CacheEntry`] so storing does not clone the value.
#[derive(Serialize)]
struct CacheEntryRef<'a, V> {
    key: &'a CacheKey,
    cached_at_secs: u64,
    value: &'a V,
}

/// Errors from writing or clearing cache slots.
///
/// Reads never fail: an unreadable slot is a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not create the cache directory
    #[error("failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Could not write or remove a slot file
    #[error("failed to access cache file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Value could not be serialized
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// System clock is before the unix epoch
    #[error("system time before unix epoch")]
    Clock,
}

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one file per slot.
    pub dir: PathBuf,

    /// How long entries remain valid. `None` means forever.
    pub ttl: Option<Duration>,

    /// Key derivation used by the pipeline stages.
    pub key_policy: KeyPolicy,
}

impl CacheConfig {
    /// Create a config for the given directory with no TTL and content keys.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: None,
            key_policy: KeyPolicy::default(),
        }
    }

    /// Set a TTL after which entries are treated as misses.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the key derivation policy.
    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

/// Single-entry-per-slot disk cache.
#[derive(Debug, Clone)]
pub struct ResultCache {
    config: CacheConfig,
}

impl ResultCache {
    /// Create a cache with the given config. Nothing is touched on disk
    /// until the first store.
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Key derivation the pipeline stages should use.
    pub fn key_policy(&self) -> KeyPolicy {
        self.config.key_policy
    }

    /// Path of the file backing a slot.
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.config.dir.join(format!("{slot}.json"))
    }

    /// Return the cached value for `slot` if its key equals `key`, otherwise
    /// run `compute`, persist its result under `key` and return it.
    ///
    /// If `compute` fails nothing is written and the error is returned.
    /// Failing to persist a successful result is logged and otherwise
    /// ignored.
    pub fn run_cached<V, E, F>(&self, slot: &str, key: CacheKey, compute: F) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(entry) = self.load::<V>(slot) {
            if entry.key == key {
                info!(slot, "found cache, skipping computation");
                return Ok(entry.value);
            }
            debug!(slot, cached = ?entry.key, current = ?key, "cache key changed");
        }

        let value = compute()?;

        if let Err(e) = self.store(slot, &key, &value) {
            warn!(slot, error = %e, "failed to persist cache entry");
        }

        Ok(value)
    }

    /// Read the entry in `slot`.
    ///
    /// Returns `None` if the slot is missing, unreadable, holds a value of a
    /// different shape, or has expired.
    pub fn load<V: DeserializeOwned>(&self, slot: &str) -> Option<CacheEntry<V>> {
        let path = self.slot_path(slot);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(slot, "no cache entry");
                return None;
            }
            Err(e) => {
                warn!(slot, path = %path.display(), error = %e, "cannot read cache file, ignoring it");
                return None;
            }
        };

        let entry: CacheEntry<V> = match serde_json::from_slice(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(slot, path = %path.display(), error = %e, "corrupt cache entry, ignoring it");
                return None;
            }
        };

        if self.is_expired(&entry) {
            debug!(slot, cached_at_secs = entry.cached_at_secs, "cache entry expired");
            return None;
        }

        Some(entry)
    }

    /// Replace the entry in `slot`.
    ///
    /// Creates the cache directory if it doesn't exist.
    pub fn store<V: Serialize>(&self, slot: &str, key: &CacheKey, value: &V) -> Result<(), CacheError> {
        let entry = CacheEntryRef {
            key,
            cached_at_secs: now_secs().ok_or(CacheError::Clock)?,
            value,
        };
        let json = serde_json::to_vec(&entry)?;

        let dir = &self.config.dir;
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        let path = self.slot_path(slot);
        fs::write(&path, json).map_err(|source| CacheError::File { path, source })?;
        debug!(slot, ?key, "stored cache entry");

        Ok(())
    }

    /// Remove the entry in `slot`. Returns whether there was one.
    pub fn invalidate(&self, slot: &str) -> Result<bool, CacheError> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::File { path, source }),
        }
    }

    fn is_expired<V>(&self, entry: &CacheEntry<V>) -> bool {
        let Some(ttl) = self.config.ttl else {
            return false;
        };
        match now_secs() {
            Some(now) => now.saturating_sub(entry.cached_at_secs) >= ttl.as_secs(),
            None => true,
        }
    }
}

fn now_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
