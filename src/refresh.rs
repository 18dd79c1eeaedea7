//! Refresh pipeline stages.
//!
//! A refresh is fetch → validate → transform → apply. The first two stages
//! live here and end in a typed [`Snapshot`] or an error; the apply stage is
//! [`Tracker::apply`](crate::Tracker::apply).

use crate::format::format_timestamp;
use crate::source::{Document, DocumentSource};
use crate::{LatestPosition, Result, Snapshot};

/// Connection status shown next to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No refresh has run yet
    Idle,
    Updating,
    Online,
    Error,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "connecting…",
            Status::Updating => "updating…",
            Status::Online => "online",
            Status::Error => "error (data missing?)",
        }
    }
}

/// What a refresh cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// New data is on the map
    Applied { features: usize, fitted: bool },
    /// Nothing changed except the status
    Failed(String),
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

/// Fetch both documents concurrently and validate them together.
///
/// All or nothing: if either fetch or either validation fails there is no
/// snapshot.
pub async fn fetch_snapshot<D: DocumentSource + ?Sized>(source: &D) -> Result<Snapshot> {
    let (track, latest) = futures::try_join!(source.fetch(Document::Track), source.fetch(Document::Latest))?;
    Snapshot::from_documents(track, latest)
}

/// Status meta line after a successful refresh.
pub fn online_meta(latest: &LatestPosition) -> String {
    format!(
        "Last updated: {} · Lat/Lon: {:.5}, {:.5}",
        format_timestamp(&latest.ts),
        latest.latitude,
        latest.longitude
    )
}

/// Status meta line after a failed refresh.
pub fn error_guidance<D: DocumentSource + ?Sized>(source: &D) -> String {
    format!(
        "Provide {} and {}.",
        source.location(Document::Track),
        source.location(Document::Latest)
    )
}
