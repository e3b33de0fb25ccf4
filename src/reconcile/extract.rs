//! Metadata extraction from submitted version-descriptor files
//!
//! Descriptors have been authored by hand over several years, so field names
//! and the shape of the equivalence list vary. Lookups walk an explicit,
//! ordered alias table and stop at the first key present.

use serde_json::{Map, Value as JsonValue};

/// Vendor name, current key first
pub const VENDOR_KEYS: [&str; 2] = ["appVendor", "vendor"];
/// Application identifier
pub const APP_ID_KEYS: [&str; 2] = ["appID", "app_id"];
/// Primary (certified) version
pub const VERSION_KEYS: [&str; 2] = ["appVersion", "version"];
/// Equivalent versions: a list of strings or one comma-separated string
pub const EQUIVALENT_KEYS: [&str; 2] = ["equiv_releases", "equivalent_versions"];

/// Normalized content of one descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMetadata {
    pub vendor: String,
    pub application_id: String,
    pub primary_version: String,
    pub equivalent_versions: Vec<String>,
}

impl VersionMetadata {
    /// Equivalent versions joined for display
    pub fn equivalent_display(&self) -> String {
        self.equivalent_versions.join(", ")
    }
}

/// Why a descriptor could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("not valid UTF-8: {0}")]
    Encoding(String),

    #[error("not valid JSON: {0}")]
    Json(String),

    #[error("top-level value is not an object")]
    NotAnObject,

    #[error("missing field (tried {})", .0.join(", "))]
    MissingField(&'static [&'static str]),

    #[error("field '{field}' has an unsupported value: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Outcome of extracting one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(VersionMetadata),
    Unparsable(ExtractError),
}

impl Extraction {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    /// Parsed metadata, or the all-empty placeholder
    pub fn into_metadata(self) -> VersionMetadata {
        match self {
            Extraction::Parsed(metadata) => metadata,
            Extraction::Unparsable(_) => VersionMetadata::default(),
        }
    }
}

/// Extract metadata from raw descriptor bytes. Never fails: malformed input
/// yields [`Extraction::Unparsable`].
pub fn extract(bytes: &[u8]) -> Extraction {
    match try_extract(bytes) {
        Ok(metadata) => Extraction::Parsed(metadata),
        Err(e) => Extraction::Unparsable(e),
    }
}

fn try_extract(bytes: &[u8]) -> Result<VersionMetadata, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractError::Encoding(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| ExtractError::Json(e.to_string()))?;
    let object = value.as_object().ok_or(ExtractError::NotAnObject)?;

    Ok(VersionMetadata {
        vendor: required_scalar(object, &VENDOR_KEYS)?,
        application_id: required_scalar(object, &APP_ID_KEYS)?,
        primary_version: required_scalar(object, &VERSION_KEYS)?,
        equivalent_versions: match lookup(object, &EQUIVALENT_KEYS) {
            Some((key, value)) => equivalent_list(key, value)?,
            None => Vec::new(),
        },
    })
}

/// First alias present in `object`, with the key it was found under
fn lookup<'a>(
    object: &'a Map<String, JsonValue>,
    aliases: &'static [&'static str],
) -> Option<(&'static str, &'a JsonValue)> {
    aliases
        .iter()
        .find_map(|key| object.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn required_scalar(
    object: &Map<String, JsonValue>,
    aliases: &'static [&'static str],
) -> Result<String, ExtractError> {
    let (key, value) = lookup(object, aliases).ok_or(ExtractError::MissingField(aliases))?;
    match value {
        JsonValue::String(s) => Ok(s.trim().to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(ExtractError::InvalidField {
            field: key,
            reason: format!("expected a string, found {}", json_kind(other)),
        }),
    }
}

fn equivalent_list(key: &'static str, value: &JsonValue) -> Result<Vec<String>, ExtractError> {
    match value {
        JsonValue::String(s) => Ok(split_list(s)),
        // Both forms normalize the same way: trimmed, empty items dropped
        JsonValue::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    JsonValue::String(s) if s.trim().is_empty() => {}
                    JsonValue::String(s) => list.push(s.trim().to_string()),
                    other => {
                        return Err(ExtractError::InvalidField {
                            field: key,
                            reason: format!("list element is {}", json_kind(other)),
                        })
                    }
                }
            }
            Ok(list)
        }
        other => Err(ExtractError::InvalidField {
            field: key,
            reason: format!("expected a list or string, found {}", json_kind(other)),
        }),
    }
}

/// Split a comma-separated list, trimming and dropping empty segments
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(bytes: &[u8]) -> VersionMetadata {
        match extract(bytes) {
            Extraction::Parsed(m) => m,
            Extraction::Unparsable(e) => panic!("expected metadata, got {}", e),
        }
    }

    #[test]
    fn test_current_keys() {
        let meta = parsed(
            br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "2.0", "equiv_releases": ["2.0.1", "2.0.2"]}"#,
        );
        assert_eq!(meta.vendor, "Acme");
        assert_eq!(meta.application_id, "A1");
        assert_eq!(meta.primary_version, "2.0");
        assert_eq!(meta.equivalent_versions, vec!["2.0.1", "2.0.2"]);
    }

    #[test]
    fn test_version_alias_fallback() {
        let meta = parsed(br#"{"appVendor": "Acme", "appID": "A1", "version": "3.1"}"#);
        assert_eq!(meta.primary_version, "3.1");
        assert!(meta.equivalent_versions.is_empty());
    }

    #[test]
    fn test_first_alias_wins() {
        let meta = parsed(
            br#"{"vendor": "Old", "appVendor": "New", "app_id": "A1", "appVersion": "1", "version": "0"}"#,
        );
        assert_eq!(meta.vendor, "New");
        assert_eq!(meta.primary_version, "1");
    }

    #[test]
    fn test_comma_separated_equivalents() {
        let meta = parsed(
            br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "2.0", "equiv_releases": " 2.0.1, ,2.0.2 ,"}"#,
        );
        assert_eq!(meta.equivalent_versions, vec!["2.0.1", "2.0.2"]);
        assert_eq!(meta.equivalent_display(), "2.0.1, 2.0.2");
    }

    #[test]
    fn test_list_and_string_forms_normalize_alike() {
        let list = parsed(
            br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "2.0", "equiv_releases": [" 2.0.1", "", "2.0.2 "]}"#,
        );
        let string = parsed(
            br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "2.0", "equiv_releases": " 2.0.1,,2.0.2 "}"#,
        );
        assert_eq!(list.equivalent_versions, vec!["2.0.1", "2.0.2"]);
        assert_eq!(list.equivalent_versions, string.equivalent_versions);
    }

    #[test]
    fn test_numeric_version_accepted() {
        let meta = parsed(br#"{"appVendor": "Acme", "appID": "A1", "appVersion": 4}"#);
        assert_eq!(meta.primary_version, "4");
    }

    #[test]
    fn test_malformed_json_yields_placeholder() {
        let extraction = extract(b"{ \"appVendor\": ");
        assert!(matches!(extraction, Extraction::Unparsable(ExtractError::Json(_))));
        assert_eq!(extraction.into_metadata(), VersionMetadata::default());
    }

    #[test]
    fn test_bad_encoding_yields_placeholder() {
        let extraction = extract(&[0xff, 0xfe, 0x00]);
        assert!(matches!(extraction, Extraction::Unparsable(ExtractError::Encoding(_))));
    }

    #[test]
    fn test_missing_key_yields_placeholder() {
        let extraction = extract(br#"{"appVendor": "Acme", "appID": "A1"}"#);
        assert_eq!(
            extraction,
            Extraction::Unparsable(ExtractError::MissingField(&VERSION_KEYS))
        );
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            extract(b"[1, 2]"),
            Extraction::Unparsable(ExtractError::NotAnObject)
        );
    }

    #[test]
    fn test_mistyped_list_element() {
        let extraction = extract(
            br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "2.0", "equiv_releases": ["2.0.1", 7]}"#,
        );
        assert!(!extraction.is_parsed());
    }

    #[test]
    fn test_byte_order_mark_tolerated() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(br#"{"appVendor": "Acme", "appID": "A1", "appVersion": "1"}"#);
        assert!(extract(&bytes).is_parsed());
    }
}
