//! Expiring key/value cache that mirrors session rows.
//!
//! The cache is an accelerator only. Every implementation may lose data at
//! any time and callers must fall back to PostgreSQL on a miss or an error.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;

/// Failure talking to the cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache operation timed out")]
    Timeout,

    #[error("cache is unavailable")]
    Unavailable,

    #[error("cached value is corrupt: {0}")]
    Corrupt(String),
}

/// Operations the session store needs from a cache backend.
///
/// String values and string sets, each key with its own TTL. Implementations
/// must be safe to share across request tasks.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Fetch a string value. `Ok(None)` on a miss or an expired key.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a string value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete keys of any type. Missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Add `member` to the set at `key` and reset the set's TTL.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `member` from the set at `key`.
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError>;

    /// Members of the set at `key`; empty if the key is missing.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;
}

/// Whole seconds for Redis, rounding sub-second TTLs up so a key is never
/// written without an expiry.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

// ---------------------------------------------------------------------------
// Redis
// ---------------------------------------------------------------------------

/// [`SessionCache`] backed by Redis through a reconnecting [`ConnectionManager`].
#[derive(Clone)]
pub struct RedisSessionCache {
    conn: ConnectionManager,
}

impl RedisSessionCache {
    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);
        let _: () = redis::pipe()
            .atomic()
            .sadd(key, member)
            .ignore()
            .expire(key, secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Value {
    Str(String),
    Set(HashSet<String>),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Process-local [`SessionCache`] honouring TTLs.
///
/// Meant for tests and single-process runs; the server itself is wired to
/// [`RedisSessionCache`]. Expired entries are swept on every write, so the
/// map stays bounded by the number of live keys. [`set_available`]
/// simulates a backend outage: while unavailable every call fails with
/// [`CacheError::Unavailable`].
///
/// [`set_available`]: MemorySessionCache::set_available
#[derive(Debug)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether `key` currently holds an unexpired value of any type.
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .get(key)
            .is_some_and(|e| e.expires_at > now)
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }
}

/// Drop `key` if it has expired, then hand back whatever remains.
fn live_entry<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if map.get(key).is_some_and(|e| e.expires_at <= now) {
        map.remove(key);
    }
    map.get_mut(key)
}

/// Drop every expired entry.
fn sweep(map: &mut HashMap<String, Entry>) {
    let now = Instant::now();
    map.retain(|_, e| e.expires_at > now);
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        let mut map = self.entries.lock().await;
        match live_entry(&mut map, key) {
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(CacheError::Corrupt(format!("{key} is not a string"))),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        let entry = Entry {
            value: Value::Str(value.to_owned()),
            expires_at: Instant::now() + ttl,
        };
        let mut map = self.entries.lock().await;
        sweep(&mut map);
        map.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.check()?;
        let mut map = self.entries.lock().await;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        let expires_at = Instant::now() + ttl;
        let mut map = self.entries.lock().await;
        sweep(&mut map);
        match live_entry(&mut map, key) {
            Some(Entry { value: Value::Set(set), expires_at: exp }) => {
                set.insert(member.to_owned());
                *exp = expires_at;
            }
            Some(_) => return Err(CacheError::Corrupt(format!("{key} is not a set"))),
            None => {
                let set = HashSet::from([member.to_owned()]);
                map.insert(
                    key.to_owned(),
                    Entry {
                        value: Value::Set(set),
                        expires_at,
                    },
                );
            }
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.check()?;
        let mut map = self.entries.lock().await;
        let now_empty = match live_entry(&mut map, key) {
            Some(Entry { value: Value::Set(set), .. }) => {
                set.remove(member);
                set.is_empty()
            }
            Some(_) => return Err(CacheError::Corrupt(format!("{key} is not a set"))),
            None => false,
        };
        // Redis drops a set once its last member goes.
        if now_empty {
            map.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.check()?;
        let mut map = self.entries.lock().await;
        match live_entry(&mut map, key) {
            Some(Entry { value: Value::Set(set), .. }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(CacheError::Corrupt(format!("{key} is not a set"))),
            None => Ok(Vec::new()),
        }
    }
}
