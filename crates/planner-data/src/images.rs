//! Local copies of remote icons.
//!
//! Icons are stored under a cache directory with a name derived from the
//! SHA-256 of their URL, keeping the URL's extension. Lookups go memory,
//! then disk, then network; concurrent lookups of one URL share a single
//! download.

use crate::coalesce::Coalescer;
use crate::{DataError, Transport};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Entry counts reported to front ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImageCacheStats {
    /// Icons resolved to a local file this session.
    pub memory: usize,
    /// Downloads currently in progress.
    pub downloading: usize,
}

/// Cache file name for `url`: 32 hex digits plus the URL's extension.
pub fn file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let stem = hex::encode(&digest[..16]);
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rfind('.') {
        Some(dot) if dot + 1 < last.len() => format!("{stem}{}", &last[dot..]),
        _ => stem,
    }
}

pub struct ImageCache<T> {
    dir: PathBuf,
    transport: T,
    entries: Coalescer<String, PathBuf>,
}

impl<T: Transport> ImageCache<T> {
    pub fn new(dir: impl Into<PathBuf>, transport: T) -> Self {
        Self {
            dir: dir.into(),
            transport,
            entries: Coalescer::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path for `url`, downloading it if needed.
    ///
    /// Empty URLs and failed downloads yield `None`; failures are logged
    /// and retried on the next call.
    pub async fn get(&self, url: &str) -> Option<PathBuf> {
        if url.is_empty() {
            return None;
        }
        match self.entries.get_or_fetch(url.to_string(), || self.load(url)).await {
            Ok(path) => Some(path.as_ref().clone()),
            Err(error) => {
                warn!(url, %error, "icon unavailable");
                None
            }
        }
    }

    async fn load(&self, url: &str) -> Result<PathBuf, DataError> {
        let path = self.dir.join(file_name(url));
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "icon found on disk");
            return Ok(path);
        }
        let bytes = self.transport.get_bytes(url).await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        debug!(url, bytes = bytes.len(), "icon downloaded");
        Ok(path)
    }

    /// Fetch `urls` concurrently; returns how many are now available.
    pub async fn preload(self: Arc<Self>, urls: Vec<String>) -> usize {
        let mut set = JoinSet::new();
        for url in urls {
            let cache = Arc::clone(&self);
            set.spawn(async move { cache.get(&url).await.is_some() });
        }
        let mut ready = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(true) => ready += 1,
                Ok(false) => {}
                Err(error) => warn!(%error, "preload task failed"),
            }
        }
        info!(ready, "icons preloaded");
        ready
    }

    /// Forget resolved icons and delete the cache directory.
    pub async fn clear(&self) -> Result<(), DataError> {
        self.entries.clear();
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(dir = %self.dir.display(), "image cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> ImageCacheStats {
        ImageCacheStats {
            memory: self.entries.ready_len(),
            downloading: self.entries.pending_len(),
        }
    }
}
