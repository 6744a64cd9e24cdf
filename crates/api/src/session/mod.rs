//! Session bookkeeping: PostgreSQL rows mirrored into an expiring cache.

pub mod cache;
pub mod store;

pub use cache::{CacheError, MemorySessionCache, RedisSessionCache, SessionCache};
pub use store::{Advisory, SessionStore};
