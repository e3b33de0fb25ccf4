//! Equivalence-name facts and their append-only registry

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::path::Path;

/// Deduplication identity of an equivalence fact.
///
/// Vendor and names are upper-cased; the name list keeps its order, so
/// `["A", "B"]` and `["B", "A"]` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    vendor: String,
    names: Vec<String>,
}

impl IdentityKey {
    pub fn new(vendor: &str, names: &[String]) -> Self {
        Self {
            vendor: vendor.to_uppercase(),
            names: names.iter().map(|n| n.to_uppercase()).collect(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A vendor's declared set of equivalent names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceNameEntry {
    #[serde(rename = "appVendor")]
    pub vendor: String,

    /// When this fact was first recorded
    pub ts: DateTime<Utc>,

    pub equiv_names: Vec<String>,

    /// Fields this version does not know about, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl EquivalenceNameEntry {
    /// Build a normalized (upper-case) entry
    pub fn new(vendor: &str, names: &[String], ts: DateTime<Utc>) -> Self {
        let key = IdentityKey::new(vendor, names);
        Self {
            vendor: key.vendor,
            ts,
            equiv_names: key.names,
            extra: Map::new(),
        }
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.vendor, &self.equiv_names)
    }
}

/// The persisted equivalence-name document (`{"names": [...]}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRegistry {
    #[serde(default)]
    pub names: Vec<EquivalenceNameEntry>,

    /// Other top-level keys, preserved across load and save
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl NameRegistry {
    pub fn new(names: Vec<EquivalenceNameEntry>) -> Self {
        Self {
            names,
            extra: Map::new(),
        }
    }

    /// Load the registry; a missing file is an empty registry
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write the registry as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn keys(&self) -> HashSet<IdentityKey> {
        self.names.iter().map(EquivalenceNameEntry::key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entry_is_normalized() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let entry = EquivalenceNameEntry::new("Acme", &names(&["suite", "Suite Pro"]), ts);
        assert_eq!(entry.vendor, "ACME");
        assert_eq!(entry.equiv_names, names(&["SUITE", "SUITE PRO"]));
    }

    #[test]
    fn test_key_ignores_case_but_not_order() {
        assert_eq!(
            IdentityKey::new("Acme", &names(&["v1", "V1"])),
            IdentityKey::new("ACME", &names(&["V1", "v1"]))
        );
        assert_ne!(
            IdentityKey::new("Acme", &names(&["a", "b"])),
            IdentityKey::new("Acme", &names(&["b", "a"]))
        );
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"names": [{"appVendor": "ACME", "ts": "2024-05-01T10:00:00.123456Z", "equiv_names": ["A", "B"]}]}"#;
        let registry: NameRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names[0].vendor, "ACME");

        let value = serde_json::to_value(&registry).unwrap();
        assert_eq!(value["names"][0]["appVendor"], "ACME");
        assert!(value["names"][0]["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let registry = NameRegistry::load(&temp_dir.path().join("equiv_names.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_malformed_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("equiv_names.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(NameRegistry::load(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RESULTS/equiv_names.json");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let registry = NameRegistry::new(vec![EquivalenceNameEntry::new("acme", &names(&["x"]), ts)]);

        registry.save(&path).unwrap();
        assert_eq!(NameRegistry::load(&path).unwrap(), registry);
    }

    #[test]
    fn test_unknown_fields_survive_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("equiv_names.json");
        std::fs::write(
            &path,
            r#"{"names": [{"appVendor": "ACME", "ts": "2024-05-01T10:00:00Z", "equiv_names": ["A"], "source": "PR 12"}], "generated_by": "manual"}"#,
        )
        .unwrap();

        let registry = NameRegistry::load(&path).unwrap();
        assert_eq!(registry.names[0].extra["source"], "PR 12");
        registry.save(&path).unwrap();

        let saved: JsonValue = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["names"][0]["source"], "PR 12");
        assert_eq!(saved["generated_by"], "manual");
        assert_eq!(NameRegistry::load(&path).unwrap(), registry);
    }
}
