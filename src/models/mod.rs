pub mod config;
pub mod names;
pub mod record;

pub use config::{
    EquivregConfig, ManifestConfig, PathsConfig, SchemaConfig, SourceConfig, CONFIG_FILE,
};
pub use names::{EquivalenceNameEntry, IdentityKey, NameRegistry};
pub use record::{Registry, VersionRecord};
