//! Change-source walker: closed change requests → manifest files

use super::{ChangeRequest, ChangeSource, FetchError};
use crate::models::{ManifestConfig, SourceConfig};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// One version-manifest file touched by a recently closed change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    pub change_id: u64,
    pub title: String,
    pub file_path: String,
    /// Revision the file is fetched at
    pub revision: String,
}

/// Filtering policy: trailing window plus manifest filename suffixes
#[derive(Debug, Clone)]
pub struct WalkPolicy {
    window: Duration,
    suffixes: Vec<String>,
}

impl WalkPolicy {
    pub fn new(window_days: i64, suffixes: &[String]) -> Self {
        Self {
            window: Duration::days(window_days),
            suffixes: suffixes.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn from_config(source: &SourceConfig, manifests: &ManifestConfig) -> Self {
        Self::new(source.window_days, &manifests.suffixes)
    }

    /// Start of the trailing window
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// True if the request was closed within the window ending at `now`
    pub fn is_recently_closed(&self, change: &ChangeRequest, now: DateTime<Utc>) -> bool {
        match change.closed_at {
            Some(closed_at) => now - closed_at <= self.window,
            None => false,
        }
    }

    /// True if `path` names a version manifest (case-insensitive suffix match)
    pub fn is_manifest(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
    }
}

/// Lazy walk over the manifest files of recently closed change requests.
///
/// Opening the walker performs the initial listing, whose failure is fatal.
/// File listings are fetched one change request at a time as the walk
/// advances; a failed listing skips that request. Every walk re-queries the
/// source, there is no persisted cursor.
pub struct ChangeWalker<'a, S: ChangeSource + ?Sized> {
    source: &'a S,
    policy: WalkPolicy,
    pending: VecDeque<ChangeRequest>,
    ready: VecDeque<ManifestRef>,
    skipped: Vec<u64>,
}

impl<'a, S: ChangeSource + ?Sized> ChangeWalker<'a, S> {
    pub async fn open(
        source: &'a S,
        policy: WalkPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        let changes = source.closed_changes(policy.window_start(now)).await?;
        let total = changes.len();
        let pending: VecDeque<ChangeRequest> = changes
            .into_iter()
            .filter(|c| policy.is_recently_closed(c, now))
            .collect();

        tracing::info!(
            listed = total,
            in_window = pending.len(),
            "listed closed change requests"
        );

        Ok(Self {
            source,
            policy,
            pending,
            ready: VecDeque::new(),
            skipped: Vec::new(),
        })
    }

    /// Next manifest file, or `None` once every change request is consumed
    pub async fn next(&mut self) -> Option<ManifestRef> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }

            let change = self.pending.pop_front()?;
            match self.source.changed_files(change.id).await {
                Ok(files) => {
                    let manifests: Vec<ManifestRef> = files
                        .into_iter()
                        .filter(|path| self.policy.is_manifest(path))
                        .map(|file_path| ManifestRef {
                            change_id: change.id,
                            title: change.title.clone(),
                            file_path,
                            revision: change.head_sha.clone(),
                        })
                        .collect();

                    if manifests.is_empty() {
                        tracing::debug!(change = change.id, "no version manifests, skipping");
                    }
                    self.ready.extend(manifests);
                }
                Err(e) => {
                    tracing::warn!(change = change.id, error = %e, "failed to list files, skipping change request");
                    self.skipped.push(change.id);
                }
            }
        }
    }

    /// Drain the walk into a vector
    pub async fn collect(mut self) -> Vec<ManifestRef> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }

    /// Change requests skipped so far because their file listing failed
    pub fn skipped(&self) -> &[u64] {
        &self.skipped
    }
}
