//! Read-only access to the external change-review system
//!
//! [`ChangeSource`] is the seam between the pipeline and the remote API:
//! [`github::GithubSource`] talks REST, tests plug in an in-memory source.
//! [`walker::ChangeWalker`] turns a source into the stream of manifest files
//! the reconciliation engine consumes.

pub mod github;
pub mod walker;

pub use github::GithubSource;
pub use walker::{ChangeWalker, ManifestRef, WalkPolicy};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A closed change request as seen by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub id: u64,
    pub title: String,
    /// `None` if the API reports the request as closed without a timestamp
    pub closed_at: Option<DateTime<Utc>>,
    /// Head revision; files of this request are fetched at this SHA
    pub head_sha: String,
}

/// Failure talking to the change-review system.
///
/// Fatal only for the initial listing; per change request or per file it is
/// logged and the item is skipped.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("rate limit exhausted for {url}")]
    RateLimited { url: String },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            FetchError::Decode {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Read-only view of the change-review system.
///
/// Listings are complete: implementations follow pagination themselves.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Closed change requests; `since` is a hint that lets the
    /// implementation stop paging early, callers still filter by date
    async fn closed_changes(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRequest>, FetchError>;

    /// Paths of all files touched by a change request
    async fn changed_files(&self, change_id: u64) -> Result<Vec<String>, FetchError>;

    /// Raw file content at a revision
    async fn file_content(&self, path: &str, revision: &str) -> Result<Vec<u8>, FetchError>;
}
