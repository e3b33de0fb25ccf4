use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One certified version in the canonical results document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionRecord {
    pub vendor: String,

    /// Equivalent product names declared for this vendor
    #[serde(default)]
    pub equiv_names: Vec<String>,

    pub application_id: String,

    /// Primary (certified) release
    pub version: String,

    /// Releases certified equivalent to `version`, in declaration order
    #[serde(default)]
    pub equiv_releases: Vec<String>,

    pub doc_type: Vec<String>,
    pub service: Vec<String>,

    /// Validation date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    pub gtw_version: String,
}

/// The canonical results document (`{"results": [...]}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    pub results: Vec<VersionRecord>,
}

impl Registry {
    pub fn new(results: Vec<VersionRecord>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VersionRecord> {
        self.results.iter()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
