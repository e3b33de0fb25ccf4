// equivreg - registry of certified-equivalent software versions
// Reconciles equivalence claims from closed change requests and publishes the registry as reports

pub mod cli;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod validator;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use models::{EquivalenceNameEntry, EquivregConfig, NameRegistry, Registry, VersionRecord};
pub use validator::{RecordSchema, SchemaError};
