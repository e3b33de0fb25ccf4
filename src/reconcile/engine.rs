//! Reconciliation engine: manifests → new equivalence-name facts
//!
//! The engine is monotonically additive. Existing entries are never touched;
//! a fact is appended only if its identity key is absent both from the
//! registry and from everything appended earlier in the same run.

use super::extract::{extract, Extraction, VersionMetadata};
use crate::models::{EquivalenceNameEntry, IdentityKey, NameRegistry, Registry};
use crate::source::{ChangeSource, ChangeWalker, ManifestRef};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// What happened to one offered fact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    /// Identity key already known; expected, not an error
    DuplicateSuppressed,
    /// Nothing to record (empty name list)
    NoNames,
}

/// Append-only merge of new facts into an existing registry
#[derive(Debug)]
pub struct NameMerger {
    existing: NameRegistry,
    seen: HashSet<IdentityKey>,
    added: Vec<EquivalenceNameEntry>,
}

impl NameMerger {
    pub fn new(existing: NameRegistry) -> Self {
        let seen = existing.keys();
        Self {
            existing,
            seen,
            added: Vec::new(),
        }
    }

    /// Offer a fact; it is appended only if its key has not been seen
    pub fn offer(&mut self, vendor: &str, names: &[String], ts: DateTime<Utc>) -> MergeOutcome {
        if names.is_empty() {
            return MergeOutcome::NoNames;
        }

        let entry = EquivalenceNameEntry::new(vendor, names, ts);
        if self.seen.insert(entry.key()) {
            self.added.push(entry);
            MergeOutcome::Added
        } else {
            MergeOutcome::DuplicateSuppressed
        }
    }

    /// Entries appended so far, in discovery order
    pub fn added(&self) -> &[EquivalenceNameEntry] {
        &self.added
    }

    /// New entries, and the registry with them appended after all
    /// pre-existing entries
    pub fn finish(self) -> (Vec<EquivalenceNameEntry>, NameRegistry) {
        let mut registry = self.existing;
        registry.names.extend(self.added.iter().cloned());
        (self.added, registry)
    }
}

/// One manifest fetched during a run, kept for the scan summary
#[derive(Debug, Clone)]
pub struct ScannedManifest {
    pub manifest: ManifestRef,
    pub content: Vec<u8>,
    /// Placeholder (all empty) when the file was unparsable
    pub metadata: VersionMetadata,
    pub parsed: bool,
    pub outcome: MergeOutcome,
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub fetched: usize,
    pub fetch_failed: usize,
    pub unparsable: usize,
    pub added: usize,
    pub duplicates: usize,
}

/// Result of one reconciliation run
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub new_entries: Vec<EquivalenceNameEntry>,
    /// Pre-existing entries, unmodified, followed by `new_entries`
    pub registry: NameRegistry,
    pub scanned: Vec<ScannedManifest>,
    pub stats: ReconcileStats,
}

/// Drives fetch → extract → merge for a stream of manifests
pub struct Reconciler<'a, S: ChangeSource + ?Sized> {
    source: &'a S,
    now: DateTime<Utc>,
}

impl<'a, S: ChangeSource + ?Sized> Reconciler<'a, S> {
    /// `now` stamps every entry created in this run
    pub fn new(source: &'a S, now: DateTime<Utc>) -> Self {
        Self { source, now }
    }

    /// Reconcile an explicit list of manifests
    pub async fn reconcile(
        &self,
        manifests: impl IntoIterator<Item = ManifestRef>,
        existing: NameRegistry,
    ) -> ReconcileOutcome {
        let mut run = Run::new(existing);
        for manifest in manifests {
            self.ingest(&mut run, manifest).await;
        }
        run.finish()
    }

    /// Reconcile everything a walker yields, fetching lazily as it advances
    pub async fn reconcile_walk(
        &self,
        walker: &mut ChangeWalker<'_, S>,
        existing: NameRegistry,
    ) -> ReconcileOutcome {
        let mut run = Run::new(existing);
        while let Some(manifest) = walker.next().await {
            self.ingest(&mut run, manifest).await;
        }
        run.finish()
    }

    async fn ingest(&self, run: &mut Run, manifest: ManifestRef) {
        let content = match self
            .source
            .file_content(&manifest.file_path, &manifest.revision)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    change = manifest.change_id,
                    file = %manifest.file_path,
                    error = %e,
                    "failed to fetch manifest, skipping"
                );
                run.stats.fetch_failed += 1;
                return;
            }
        };
        run.stats.fetched += 1;

        let extraction = extract(&content);
        let parsed = extraction.is_parsed();
        if let Extraction::Unparsable(e) = &extraction {
            tracing::warn!(
                change = manifest.change_id,
                file = %manifest.file_path,
                error = %e,
                "could not parse manifest"
            );
            run.stats.unparsable += 1;
        }
        let metadata = extraction.into_metadata();

        let outcome = run
            .merger
            .offer(&metadata.vendor, &metadata.equivalent_versions, self.now);
        match outcome {
            MergeOutcome::Added => run.stats.added += 1,
            MergeOutcome::DuplicateSuppressed => run.stats.duplicates += 1,
            MergeOutcome::NoNames => {}
        }

        run.scanned.push(ScannedManifest {
            manifest,
            content,
            metadata,
            parsed,
            outcome,
        });
    }
}

struct Run {
    merger: NameMerger,
    scanned: Vec<ScannedManifest>,
    stats: ReconcileStats,
}

impl Run {
    fn new(existing: NameRegistry) -> Self {
        Self {
            merger: NameMerger::new(existing),
            scanned: Vec::new(),
            stats: ReconcileStats::default(),
        }
    }

    fn finish(self) -> ReconcileOutcome {
        let (new_entries, registry) = self.merger.finish();
        ReconcileOutcome {
            new_entries,
            registry,
            scanned: self.scanned,
            stats: self.stats,
        }
    }
}

/// Merge the `equiv_names` declared in the results document into the name
/// registry, with the same dedup and append-only rules as a scan
pub fn merge_registry_names(
    results: &Registry,
    existing: NameRegistry,
    now: DateTime<Utc>,
) -> (Vec<EquivalenceNameEntry>, NameRegistry) {
    let mut merger = NameMerger::new(existing);
    for record in results.iter() {
        merger.offer(&record.vendor, &record.equiv_names, now);
    }
    merger.finish()
}
