//! Directory-backed store backend
//!
//! Layout:
//!
//! ```text
//! <root>/<store-name>/<digest>.json   entry metadata
//! <root>/<store-name>/<digest>.body   raw response body
//! ```
//!
//! The digest is the first 16 bytes of SHA-256 over the entry key. The body
//! is renamed into place before its metadata, so a metadata file always
//! points at a complete body.

use super::{CacheStorage, CachedResponse, EntryInfo};
use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Metadata persisted next to each body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    stored_at: DateTime<Utc>,
    body_len: u64,
}

/// Stores persisted as directories under a root
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> TilawahResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.starts_with('.');
        if !valid {
            return Err(TilawahError::User(format!("Invalid store name: {}", name)));
        }
        Ok(self.root.join(name))
    }

    fn digest(key: &str) -> String {
        let hash = Sha256::digest(key.as_bytes());
        hex::encode(&hash[..16])
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> TilawahResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents)
            .await
            .map_err(|e| TilawahError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| TilawahError::io(format!("renaming into {}", path.display()), e))
    }

    async fn read_record(path: &Path) -> TilawahResult<Option<EntryRecord>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TilawahError::io(format!("reading {}", path.display()), e));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| TilawahError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> TilawahResult<()> {
        let dir = self.store_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| TilawahError::io(format!("creating store {}", dir.display()), e))
    }

    async fn has(&self, name: &str) -> TilawahResult<bool> {
        Ok(self.store_dir(name)?.is_dir())
    }

    async fn keys(&self) -> TilawahResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut names = vec![];
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| TilawahError::io("reading cache directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TilawahError::io("reading cache directory entry", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> TilawahResult<bool> {
        let dir = self.store_dir(name)?;
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| TilawahError::io(format!("deleting store {}", dir.display()), e))?;
        debug!("Deleted store directory {}", dir.display());
        Ok(true)
    }

    async fn match_request(
        &self,
        name: &str,
        request: &Request,
    ) -> TilawahResult<Option<CachedResponse>> {
        let key = request.cache_key();
        let dir = self.store_dir(name)?;
        let digest = Self::digest(&key);

        let Some(record) = Self::read_record(&dir.join(format!("{}.json", digest))).await? else {
            return Ok(None);
        };
        if record.key != key {
            warn!("Digest collision in {} for {}", name, key);
            return Ok(None);
        }

        let body_path = dir.join(format!("{}.body", digest));
        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Cache entry {} has no body, treating as miss", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(TilawahError::io(format!("reading {}", body_path.display()), e));
            }
        };

        Ok(Some(CachedResponse {
            response: Response {
                status: record.status,
                headers: record.headers,
                body,
            },
            stored_at: record.stored_at,
        }))
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> TilawahResult<()> {
        self.open(name).await?;

        let key = request.cache_key();
        let dir = self.store_dir(name)?;
        let digest = Self::digest(&key);
        let stored = response.without_hop_headers();

        let record = EntryRecord {
            key,
            status: stored.status,
            headers: stored.headers,
            stored_at: Utc::now(),
            body_len: stored.body.len() as u64,
        };

        Self::write_atomic(&dir.join(format!("{}.body", digest)), &stored.body).await?;
        let meta = serde_json::to_vec_pretty(&record)?;
        Self::write_atomic(&dir.join(format!("{}.json", digest)), &meta).await
    }

    async fn entries(&self, name: &str) -> TilawahResult<Vec<EntryInfo>> {
        let dir = self.store_dir(name)?;
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut infos = vec![];
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| TilawahError::io(format!("reading store {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TilawahError::io("reading store entry", e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => infos.push(EntryInfo {
                    key: record.key,
                    status: record.status,
                    size_bytes: record.body_len,
                    stored_at: record.stored_at,
                }),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }

        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }
}
