//! Network-First and Cache-First

use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Fetcher, Method, Request, Response};
use crate::store::{CacheStorage, CachedResponse};
use std::time::Duration;
use tracing::{debug, warn};

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    /// Served from a store; for Network-First this means the network failed
    Cache,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: Source::Network,
        }
    }

    fn cache(cached: CachedResponse) -> Self {
        Self {
            response: cached.response,
            source: Source::Cache,
        }
    }
}

/// Stores and network a strategy runs against
pub struct Strategy<'a> {
    pub storage: &'a dyn CacheStorage,
    pub fetcher: &'a dyn Fetcher,
    /// Bound on Network-First fetches
    pub timeout: Option<Duration>,
    /// Per-entry freshness for Cache-First
    pub max_age: Option<chrono::Duration>,
}

impl Strategy<'_> {
    /// Fetch live, falling back to `store` when the network fails
    ///
    /// A miss after a network failure returns the network error; the caller
    /// decides between a synthetic answer and propagation.
    pub async fn network_first(&self, store: &str, request: &Request) -> TilawahResult<Served> {
        match fetch_with_timeout(self.fetcher, request, self.timeout).await {
            Ok(response) => {
                self.store_response(store, request, &response).await;
                Ok(Served::network(response))
            }
            Err(err) if err.is_network_failure() => {
                debug!("Network failed for {}, trying {}: {}", request.url, store, err);
                match self.lookup(store, request).await {
                    Some(cached) => Ok(Served::cache(cached)),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Serve from `store` without touching the network when possible
    pub async fn cache_first(&self, store: &str, request: &Request) -> TilawahResult<Served> {
        let stale = match self.lookup(store, request).await {
            Some(cached) if cached.is_fresh(self.max_age) => return Ok(Served::cache(cached)),
            Some(cached) => {
                debug!("Cached {} is past max age, revalidating", request.url);
                Some(cached)
            }
            None => None,
        };

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_response(store, request, &response).await;
                Ok(Served::network(response))
            }
            Err(err) if err.is_network_failure() => match stale {
                Some(cached) => Ok(Served::cache(cached)),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn lookup(&self, store: &str, request: &Request) -> Option<CachedResponse> {
        match self.storage.match_request(store, request).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Cache lookup in {} failed for {}: {}", store, request.url, e);
                None
            }
        }
    }

    /// Only successful GET responses are written; a failed write never fails the request
    async fn store_response(&self, store: &str, request: &Request, response: &Response) {
        if request.method != Method::Get || !response.ok() {
            return;
        }
        if let Err(e) = self.storage.put(store, request, response).await {
            warn!("Failed to cache {} in {}: {}", request.url, store, e);
        }
    }
}

/// Fetch with an optional deadline; an elapsed deadline is a network failure
pub async fn fetch_with_timeout(
    fetcher: &dyn Fetcher,
    request: &Request,
    timeout: Option<Duration>,
) -> TilawahResult<Response> {
    let Some(limit) = timeout else {
        return fetcher.fetch(request).await;
    };

    match tokio::time::timeout(limit, fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(TilawahError::NetworkTimeout {
            url: request.url.clone(),
            timeout_secs: limit.as_secs(),
        }),
    }
}
