//! Where the two polled documents come from.
//!
//! The refresh pipeline only sees [`DocumentSource`]. Transport details stay in
//! the implementations: [`HttpSource`](crate::HttpSource) for a web server,
//! [`FileSource`] for a local directory and [`MemorySource`] for tests and
//! demos.

use crate::{Result, TrackerError};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Track feature collection
    Track,
    /// Latest-position record
    Latest,
}

impl Document {
    pub fn name(self) -> &'static str {
        match self {
            Document::Track => "track",
            Document::Latest => "latest",
        }
    }

    /// Conventional file name when both documents live in one directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Document::Track => "track.geojson",
            Document::Latest => "latest.json",
        }
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch and parse one document. Every call must observe the current
    /// state of the backing store.
    async fn fetch(&self, document: Document) -> Result<Value>;

    /// Where the document is expected, for the failure guidance text.
    fn location(&self, document: Document) -> String;
}

/// A shared source, so the host can keep a handle on it while the tracker polls.
#[async_trait]
impl<D: DocumentSource + ?Sized> DocumentSource for Arc<D> {
    async fn fetch(&self, document: Document) -> Result<Value> {
        (**self).fetch(document).await
    }

    fn location(&self, document: Document) -> String {
        (**self).location(document)
    }
}

// ============================================================================
// FileSource
// ============================================================================

/// Reads both documents from the local filesystem on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    track: PathBuf,
    latest: PathBuf,
}

impl FileSource {
    pub fn new(track: impl Into<PathBuf>, latest: impl Into<PathBuf>) -> Self {
        Self { track: track.into(), latest: latest.into() }
    }

    /// `track.geojson` and `latest.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(Document::Track.file_name()), dir.join(Document::Latest.file_name()))
    }

    fn path(&self, document: Document) -> &Path {
        match document {
            Document::Track => &self.track,
            Document::Latest => &self.latest,
        }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self, document: Document) -> Result<Value> {
        let path = self.path(document);
        let bytes = tokio::fs::read(path).await.map_err(|source| TrackerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!("[FileSource] Read {} ({} bytes)", path.display(), bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn location(&self, document: Document) -> String {
        self.path(document).display().to_string()
    }
}

// ============================================================================
// MemorySource
// ============================================================================

#[derive(Debug, Default)]
struct Documents {
    values: HashMap<Document, Value>,
    /// Documents that answer with an HTTP-like error status
    failures: HashMap<Document, u16>,
}

/// In-memory documents that can be swapped or made to fail between fetches.
///
/// A missing document answers like a web server would: status 404.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: Mutex<Documents>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new(track: Value, latest: Value) -> Self {
        let source = Self::default();
        source.set(Document::Track, track);
        source.set(Document::Latest, latest);
        source
    }

    /// Delay every fetch, to simulate a slow server.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, document: Document, value: Value) {
        self.lock().values.insert(document, value);
    }

    pub fn fail_with_status(&self, document: Document, status: u16) {
        self.lock().failures.insert(document, status);
    }

    pub fn recover(&self, document: Document) {
        self.lock().failures.remove(&document);
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch(&self, document: Document) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let documents = self.lock();
        if let Some(status) = documents.failures.get(&document) {
            return Err(TrackerError::Status { url: self.location(document), status: *status });
        }
        documents
            .values
            .get(&document)
            .cloned()
            .ok_or_else(|| TrackerError::Status { url: self.location(document), status: 404 })
    }

    fn location(&self, document: Document) -> String {
        format!("memory:{}", document.name())
    }
}
