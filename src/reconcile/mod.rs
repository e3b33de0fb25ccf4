pub mod engine;
pub mod extract;

pub use engine::{
    merge_registry_names, MergeOutcome, NameMerger, ReconcileOutcome, ReconcileStats, Reconciler,
    ScannedManifest,
};
pub use extract::{extract, ExtractError, Extraction, VersionMetadata};
