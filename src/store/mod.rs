//! Named cache stores
//!
//! A store maps a request key (method + URL) to a captured response. Stores
//! are the unit of consistency: a version bump replaces a whole store and
//! nothing is ever evicted entry by entry.
//!
//! | Backend | Lifetime | Used by |
//! |---------|----------|---------|
//! | [`DiskStorage`] | survives restarts | `serve`, `install`, `cache` |
//! | [`MemoryStorage`] | process | tests, `--ephemeral` |

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::error::TilawahResult;
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored response and when it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }

    /// Whether the entry is still usable under an optional max age
    pub fn is_fresh(&self, max_age: Option<chrono::Duration>) -> bool {
        match max_age {
            Some(max_age) => Utc::now() - self.stored_at <= max_age,
            None => true,
        }
    }
}

/// Summary of one entry, for listings
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub status: u16,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
}

/// Durable collection of named stores
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist yet
    async fn open(&self, name: &str) -> TilawahResult<()>;

    /// Whether a store with this name exists
    async fn has(&self, name: &str) -> TilawahResult<bool>;

    /// Names of all existing stores, sorted
    async fn keys(&self) -> TilawahResult<Vec<String>>;

    /// Delete a whole store; returns false if it did not exist
    async fn delete(&self, name: &str) -> TilawahResult<bool>;

    /// Look up a request in a store (a missing store is a miss)
    async fn match_request(
        &self,
        name: &str,
        request: &Request,
    ) -> TilawahResult<Option<CachedResponse>>;

    /// Store a response for a request, creating the store if needed
    async fn put(&self, name: &str, request: &Request, response: &Response) -> TilawahResult<()>;

    /// Store several entries; callers gather every response first
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> TilawahResult<()> {
        self.open(name).await?;
        for (request, response) in entries {
            self.put(name, request, response).await?;
        }
        Ok(())
    }

    /// Entries of a store, sorted by key
    async fn entries(&self, name: &str) -> TilawahResult<Vec<EntryInfo>>;
}
