//! Durable FIFO of failed requests

use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Fetcher, Method, Request, RequestMode, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const QUEUE_FORMAT_VERSION: u32 = 1;

/// Credentials are never written to the queue file
const UNPERSISTED_HEADERS: &[&str] = &["authorization", "cookie", "proxy-authorization"];

fn is_persistable(name: &str) -> bool {
    !UNPERSISTED_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// A request waiting to be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: Uuid,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Method, URL and body digest; equal keys are the same request
    pub dedupe_key: String,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl QueuedRequest {
    fn from_request(request: &Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request
                .headers
                .iter()
                .filter(|(name, _)| is_persistable(name))
                .cloned()
                .collect(),
            body: request.body.clone(),
            dedupe_key: dedupe_key(request),
            enqueued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    /// Rebuild the original request for replay
    pub fn to_request(&self) -> Request {
        Request {
            method: self.method.clone(),
            url: self.url.clone(),
            mode: RequestMode::Subresource,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

fn dedupe_key(request: &Request) -> String {
    let body_digest = Sha256::digest(&request.body);
    format!(
        "{} {} {}",
        request.method,
        request.url,
        hex::encode(&body_digest[..8])
    )
}

/// Result of an enqueue, visible to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// New entry appended to the queue
    Added(Uuid),
    /// An identical request is already pending under this id
    Duplicate(Uuid),
}

impl Enqueued {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Added(id) | Self::Duplicate(id) => *id,
        }
    }
}

/// A replayed request and the response it finally got
#[derive(Debug, Clone)]
pub struct Delivered {
    pub request: QueuedRequest,
    pub response: Response,
}

/// What a replay pass did
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    pub delivered: Vec<Delivered>,
    pub dropped: Vec<QueuedRequest>,
    pub remaining: usize,
    /// Replay stopped early because the network was still unreachable
    pub interrupted: bool,
}

#[derive(Serialize, Deserialize)]
struct QueueFile {
    version: u32,
    entries: VecDeque<QueuedRequest>,
}

/// Persisted FIFO queue with at-least-once replay
///
/// Entries leave the queue only after the upstream answered them, so a crash
/// between delivery and persistence replays the entry again.
#[derive(Debug)]
pub struct SyncQueue {
    path: Option<PathBuf>,
    max_attempts: u32,
    max_entries: usize,
    entries: Mutex<VecDeque<QueuedRequest>>,
    replay_lock: Mutex<()>,
}

impl SyncQueue {
    /// Open a queue file, starting empty if it does not exist
    pub async fn open(path: impl Into<PathBuf>, max_attempts: u32) -> TilawahResult<Self> {
        let path = path.into();
        let entries = Self::load(&path).await?;
        debug!("Opened sync queue {} ({} pending)", path.display(), entries.len());

        Ok(Self {
            path: Some(path),
            max_attempts,
            max_entries: 0,
            entries: Mutex::new(entries),
            replay_lock: Mutex::new(()),
        })
    }

    /// A queue that is never written to disk
    pub fn in_memory(max_attempts: u32) -> Self {
        Self {
            path: None,
            max_attempts,
            max_entries: 0,
            entries: Mutex::new(VecDeque::new()),
            replay_lock: Mutex::new(()),
        }
    }

    /// Cap the number of pending entries; the oldest are dropped first
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn load(path: &Path) -> TilawahResult<VecDeque<QueuedRequest>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(VecDeque::new()),
            Err(e) => {
                return Err(TilawahError::io(
                    format!("reading sync queue {}", path.display()),
                    e,
                ));
            }
        };

        let file: QueueFile =
            serde_json::from_str(&content).map_err(|e| TilawahError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(file.entries)
    }

    async fn persist(&self, entries: &VecDeque<QueuedRequest>) -> TilawahResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = QueueFile {
            version: QUEUE_FORMAT_VERSION,
            entries: entries.clone(),
        };
        let content = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TilawahError::SyncPersist(e.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| TilawahError::SyncPersist(e.to_string()))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| TilawahError::SyncPersist(e.to_string()))
    }

    /// Append a request unless an identical one is already pending
    pub async fn enqueue(&self, request: &Request) -> TilawahResult<Enqueued> {
        let key = dedupe_key(request);
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.iter().find(|e| e.dedupe_key == key) {
            debug!("Request already queued for sync: {}", key);
            return Ok(Enqueued::Duplicate(existing.id));
        }

        let queued = QueuedRequest::from_request(request);
        let id = queued.id;
        entries.push_back(queued);
        while self.max_entries > 0 && entries.len() > self.max_entries {
            if let Some(oldest) = entries.pop_front() {
                warn!(
                    "Sync queue full, dropping {} {} queued at {}",
                    oldest.method, oldest.url, oldest.enqueued_at
                );
            }
        }
        self.persist(&entries).await?;

        info!("Queued {} {} for background sync", request.method, request.url);
        Ok(Enqueued::Added(id))
    }

    /// Snapshot of pending entries, oldest first
    pub async fn pending(&self) -> Vec<QueuedRequest> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every pending entry
    pub async fn clear(&self) -> TilawahResult<usize> {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        self.persist(&entries).await?;
        Ok(count)
    }

    async fn remove(&self, id: Uuid) -> TilawahResult<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|e| e.id != id);
        self.persist(&entries).await
    }

    /// Count a failed attempt; returns the entry if it was dropped
    async fn record_failure(&self, id: Uuid, reason: &str) -> TilawahResult<Option<QueuedRequest>> {
        let mut entries = self.entries.lock().await;
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return Ok(None);
        };

        let entry = &mut entries[pos];
        entry.attempts += 1;
        entry.last_error = Some(reason.to_string());

        let dropped = if self.max_attempts > 0 && entry.attempts >= self.max_attempts {
            warn!(
                "Dropping {} {} after {} failed sync attempts",
                entry.method, entry.url, entry.attempts
            );
            entries.remove(pos)
        } else {
            None
        };

        self.persist(&entries).await?;
        Ok(dropped)
    }

    /// Replay pending entries in order
    ///
    /// Stops at the first network failure so later entries never overtake
    /// earlier ones. A 5xx answer counts as a failed attempt; any other
    /// status is a delivery.
    pub async fn replay(&self, fetcher: &dyn Fetcher) -> TilawahResult<ReplayOutcome> {
        let _guard = self.replay_lock.lock().await;
        let mut outcome = ReplayOutcome::default();

        for entry in self.pending().await {
            match fetcher.fetch(&entry.to_request()).await {
                Ok(response) if response.status < 500 => {
                    self.remove(entry.id).await?;
                    debug!("Replayed {} {} -> {}", entry.method, entry.url, response.status);
                    outcome.delivered.push(Delivered {
                        request: entry,
                        response,
                    });
                }
                Ok(response) => {
                    let reason = format!("upstream answered {}", response.status);
                    if let Some(dropped) = self.record_failure(entry.id, &reason).await? {
                        outcome.dropped.push(dropped);
                    }
                }
                Err(err) => {
                    let network = err.is_network_failure();
                    if let Some(dropped) = self.record_failure(entry.id, &err.to_string()).await? {
                        outcome.dropped.push(dropped);
                    }
                    if network {
                        outcome.interrupted = true;
                        break;
                    }
                }
            }
        }

        outcome.remaining = self.len().await;
        if !outcome.delivered.is_empty() || !outcome.dropped.is_empty() {
            info!(
                "Sync replay: {} delivered, {} dropped, {} remaining",
                outcome.delivered.len(),
                outcome.dropped.len(),
                outcome.remaining
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    /// Answers by URL; unknown URLs fail as offline
    struct ScriptedFetcher {
        answers: HashMap<String, u16>,
        seen: StdMutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(answers: &[(&str, u16)]) -> Self {
            Self {
                answers: answers.iter().map(|(u, s)| (u.to_string(), *s)).collect(),
                seen: StdMutex::new(vec![]),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &Request) -> TilawahResult<Response> {
            self.seen.lock().unwrap().push(request.url.clone());
            match self.answers.get(&request.url) {
                Some(status) => Ok(Response::new(*status, "ok")),
                None => Err(TilawahError::network(&request.url, "offline")),
            }
        }
    }

    #[tokio::test]
    async fn duplicate_requests_are_reported() {
        let queue = SyncQueue::in_memory(5);
        let request = Request::get("/api/bookmarks").with_method(Method::Post).with_body("{\"ayah\":1}");

        let first = queue.enqueue(&request).await.unwrap();
        let second = queue.enqueue(&request).await.unwrap();

        assert!(matches!(first, Enqueued::Added(_)));
        assert_eq!(second, Enqueued::Duplicate(first.id()));
        assert_eq!(queue.len().await, 1);

        let other_body = request.clone().with_body("{\"ayah\":2}");
        assert!(matches!(
            queue.enqueue(&other_body).await.unwrap(),
            Enqueued::Added(_)
        ));
    }

    #[tokio::test]
    async fn persisted_queue_reloads_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");

        let queue = SyncQueue::open(&path, 5).await.unwrap();
        queue.enqueue(&Request::get("/api/a")).await.unwrap();
        queue.enqueue(&Request::get("/api/b")).await.unwrap();
        drop(queue);

        let reopened = SyncQueue::open(&path, 5).await.unwrap();
        let urls: Vec<_> = reopened.pending().await.into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["/api/a", "/api/b"]);
    }

    #[tokio::test]
    async fn replay_removes_delivered_entries() {
        let queue = SyncQueue::in_memory(5);
        queue.enqueue(&Request::get("/api/a")).await.unwrap();
        queue.enqueue(&Request::get("/api/b")).await.unwrap();

        let fetcher = ScriptedFetcher::new(&[("/api/a", 200), ("/api/b", 404)]);
        let outcome = queue.replay(&fetcher).await.unwrap();

        assert_eq!(outcome.delivered.len(), 2);
        assert_eq!(outcome.remaining, 0);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn replay_stops_at_network_failure() {
        let queue = SyncQueue::in_memory(5);
        queue.enqueue(&Request::get("/api/offline")).await.unwrap();
        queue.enqueue(&Request::get("/api/later")).await.unwrap();

        let fetcher = ScriptedFetcher::new(&[("/api/later", 200)]);
        let outcome = queue.replay(&fetcher).await.unwrap();

        assert!(outcome.interrupted);
        assert!(outcome.delivered.is_empty());
        assert_eq!(fetcher.seen(), vec!["/api/offline"]);

        let pending = queue.pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].attempts, 0);
    }

    #[tokio::test]
    async fn server_errors_count_toward_max_attempts() {
        let queue = SyncQueue::in_memory(2);
        queue.enqueue(&Request::get("/api/flaky")).await.unwrap();
        let fetcher = ScriptedFetcher::new(&[("/api/flaky", 503)]);

        let first = queue.replay(&fetcher).await.unwrap();
        assert!(first.dropped.is_empty());
        assert_eq!(first.remaining, 1);

        let second = queue.replay(&fetcher).await.unwrap();
        assert_eq!(second.dropped.len(), 1);
        assert_eq!(second.dropped[0].attempts, 2);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn full_queue_drops_oldest() {
        let queue = SyncQueue::in_memory(5).with_max_entries(2);
        for url in ["/api/a", "/api/b", "/api/c"] {
            queue
                .enqueue(&Request::get(url).with_method(Method::Post))
                .await
                .unwrap();
        }

        let urls: Vec<_> = queue.pending().await.into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["/api/b", "/api/c"]);
    }

    #[tokio::test]
    async fn credentials_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        let queue = SyncQueue::open(&path, 5).await.unwrap();

        let request = Request::get("/api/bookmarks")
            .with_method(Method::Post)
            .with_header("Cookie", "session=abc")
            .with_header("AUTHORIZATION", "Bearer secret")
            .with_header("Content-Type", "application/json");
        queue.enqueue(&request).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("session=abc"));
        assert!(!written.contains("Bearer secret"));

        let pending = queue.pending().await;
        assert_eq!(
            pending[0].headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[tokio::test]
    async fn corrupt_queue_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(matches!(
            SyncQueue::open(&path, 5).await,
            Err(TilawahError::StoreCorrupt { .. })
        ));
    }
}
