//! Upstream origin fetcher backed by `ureq`
//!
//! `ureq` is blocking, so every call runs on the blocking pool.

use super::{is_hop_by_hop, Fetcher, Method, Request, Response};
use crate::error::{TilawahError, TilawahResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Hard ceiling for a single upstream exchange.
///
/// Network-First applies its own, usually shorter, timeout on top.
const UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Forwards requests to a fixed origin
#[derive(Clone)]
pub struct UpstreamFetcher {
    origin: String,
    agent: ureq::Agent,
}

impl UpstreamFetcher {
    /// Create a fetcher for an `http://` or `https://` origin
    pub fn new(origin: &str) -> TilawahResult<Self> {
        let origin = origin.trim().trim_end_matches('/');
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(TilawahError::UpstreamInvalid(origin.to_string()));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(UPSTREAM_TIMEOUT_SECS)))
            .build()
            .into();

        Ok(Self {
            origin: origin.to_string(),
            agent,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn target(&self, request: &Request) -> String {
        format!("{}{}", self.origin, request.url)
    }

    fn send_blocking(
        agent: &ureq::Agent,
        target: &str,
        method: &Method,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> TilawahResult<Response> {
        let mut builder = ureq::http::Request::builder()
            .method(method.as_str())
            .uri(target);
        for (name, value) in headers.iter().filter(|(k, _)| !is_hop_by_hop(k)) {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = if body.is_empty() {
            let request = builder
                .body(())
                .map_err(|e| TilawahError::network(target, e.to_string()))?;
            agent.run(request)
        } else {
            let request = builder
                .body(body)
                .map_err(|e| TilawahError::network(target, e.to_string()))?;
            agent.run(request)
        };

        let mut response = result.map_err(|e| match e {
            ureq::Error::Timeout(_) => TilawahError::NetworkTimeout {
                url: target.to_string(),
                timeout_secs: UPSTREAM_TIMEOUT_SECS,
            },
            other => TilawahError::network(target, other.to_string()),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TilawahError::network(target, format!("reading body: {}", e)))?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for UpstreamFetcher {
    async fn fetch(&self, request: &Request) -> TilawahResult<Response> {
        let agent = self.agent.clone();
        let target = self.target(request);
        let method = request.method.clone();
        let headers = request.headers.clone();
        let body = request.body.clone();

        debug!("Fetching upstream: {} {}", method, target);

        tokio::task::spawn_blocking(move || {
            Self::send_blocking(&agent, &target, &method, &headers, body)
        })
        .await
        .map_err(|e| TilawahError::Internal(format!("upstream task failed: {}", e)))?
    }
}
