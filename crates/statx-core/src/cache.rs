use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::repository::DataRepository;

/// Time source for cache staleness and ping timing; injected so tests never
/// sleep.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Resource-kind discriminator inside a [`CacheKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResourceKind {
    Flows,
    Flow,
    Structure,
    Data,
    /// A whole decoded table, sliced in memory for narrower keys.
    Table,
}

impl CacheResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flows => "flows",
            Self::Flow => "flow",
            Self::Structure => "structure",
            Self::Data => "data",
            Self::Table => "table",
        }
    }
}

/// Logical identity of a cached entity: stable source id, language
/// preference, resource kind, and an optional sub-key such as a flow or
/// product id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    languages: String,
    kind: CacheResourceKind,
    item: Option<String>,
}

impl CacheKey {
    pub fn new(
        source: impl Into<String>,
        languages: impl Into<String>,
        kind: CacheResourceKind,
    ) -> Self {
        Self {
            source: source.into(),
            languages: languages.into(),
            kind,
            item: None,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.languages, self.kind.as_str())?;
        if let Some(item) = &self.item {
            write!(f, "/{item}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    stored_at: OffsetDateTime,
    ttl: Duration,
    value: Arc<DataRepository>,
}

/// Process-wide TTL cache of repository snapshots, safe for concurrent use
/// from connections sharing one instance.
///
/// Staleness is computed at read time from the injected [`Clock`]; there is
/// no eviction beyond TTL expiry, and a concurrent put to the same key is
/// last-write-wins (entries are idempotent snapshots). A zero TTL entry is
/// never returned, so `Duration::ZERO` effectively disables caching.
#[derive(Clone)]
pub struct MemCache {
    inner: Arc<tokio::sync::RwLock<HashMap<CacheKey, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Cache on the wall clock.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Returns the cached snapshot unless absent or expired.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<DataRepository>> {
        let store = self.inner.read().await;
        let entry = store.get(key)?;

        let age = self.clock.now() - entry.stored_at;
        if age < time::Duration::try_from(entry.ttl).ok()? {
            tracing::debug!(key = %key, "cache hit");
            Some(Arc::clone(&entry.value))
        } else {
            None
        }
    }

    /// Stores a snapshot with the caller-supplied time-to-live, stamped at
    /// the current clock time.
    pub async fn put(&self, key: CacheKey, value: Arc<DataRepository>, ttl: Duration) {
        let mut store = self.inner.write().await;
        store.insert(
            key,
            Entry {
                stored_at: self.clock.now(),
                ttl,
                value,
            },
        );
    }

    /// Drops entries past their time-to-live.
    pub async fn clear_expired(&self) {
        let now = self.clock.now();
        let mut store = self.inner.write().await;
        store.retain(|_, entry| match time::Duration::try_from(entry.ttl) {
            Ok(ttl) => now - entry.stored_at < ttl,
            Err(_) => false,
        });
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl std::fmt::Debug for MemCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCache").finish_non_exhaustive()
    }
}
