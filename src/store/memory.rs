//! In-process store backend

use super::{CacheStorage, CachedResponse, EntryInfo};
use crate::error::TilawahResult;
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Store = BTreeMap<String, CachedResponse>;

/// Stores kept in memory; never held across an await
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: Mutex<BTreeMap<String, Store>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn stores(&self) -> MutexGuard<'_, BTreeMap<String, Store>> {
        self.stores.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> TilawahResult<()> {
        self.stores().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn has(&self, name: &str) -> TilawahResult<bool> {
        Ok(self.stores().contains_key(name))
    }

    async fn keys(&self) -> TilawahResult<Vec<String>> {
        Ok(self.stores().keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> TilawahResult<bool> {
        Ok(self.stores().remove(name).is_some())
    }

    async fn match_request(
        &self,
        name: &str,
        request: &Request,
    ) -> TilawahResult<Option<CachedResponse>> {
        Ok(self
            .stores()
            .get(name)
            .and_then(|store| store.get(&request.cache_key()))
            .cloned())
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> TilawahResult<()> {
        self.stores()
            .entry(name.to_string())
            .or_default()
            .insert(
                request.cache_key(),
                CachedResponse::new(response.without_hop_headers()),
            );
        Ok(())
    }

    async fn entries(&self, name: &str) -> TilawahResult<Vec<EntryInfo>> {
        let stores = self.stores();
        let Some(store) = stores.get(name) else {
            return Ok(vec![]);
        };

        Ok(store
            .iter()
            .map(|(key, cached)| EntryInfo {
                key: key.clone(),
                status: cached.response.status,
                size_bytes: cached.response.body.len() as u64,
                stored_at: cached.stored_at,
            })
            .collect())
    }
}
