//! Closed-world JSON Schema validation for the results document
//!
//! The schema is generated from the configured enumerations, compiled once,
//! and every violation is collected before failing. Only a document with no
//! violations is converted into a typed [`Registry`].

use crate::models::{Registry, SchemaConfig};
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single schema violation, located by JSON pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Instance path (e.g. `/results/0/doc_type/1`); empty for the root
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// The results document failed validation; nothing derived from it may be emitted
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} schema violation(s):\n{}", .0.len(), format_violations(.0))]
    Violations(Vec<SchemaViolation>),

    #[error("Failed to compile schema: {0}")]
    Compile(String),
}

impl SchemaError {
    /// Violations carried by this error (empty for read/parse failures)
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            SchemaError::Violations(v) => v,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the JSON Schema of the results document for the given enumerations
pub fn schema_document(config: &SchemaConfig) -> JsonValue {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Results",
        "type": "object",
        "additionalProperties": false,
        "required": ["results"],
        "properties": {
            "results": {
                "type": "array",
                "items": { "$ref": "#/$defs/Result" }
            }
        },
        "$defs": {
            "Result": {
                "title": "Result",
                "type": "object",
                "additionalProperties": false,
                "required": [
                    "vendor",
                    "application_id",
                    "version",
                    "doc_type",
                    "service",
                    "date",
                    "gtw_version"
                ],
                "properties": {
                    "vendor": { "type": "string" },
                    "equiv_names": string_list.clone(),
                    "application_id": { "type": "string" },
                    "version": { "type": "string" },
                    "equiv_releases": string_list,
                    "doc_type": {
                        "type": "array",
                        "minItems": 1,
                        "items": { "enum": config.doc_types }
                    },
                    "service": {
                        "type": "array",
                        "minItems": 1,
                        "items": { "enum": config.services }
                    },
                    "date": {
                        "type": "string",
                        "format": "date",
                        "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}$"
                    },
                    "gtw_version": { "const": config.gateway_version }
                }
            }
        }
    })
}

/// Compiled validator for the results document
pub struct RecordSchema {
    document: JsonValue,
    validator: Validator,
}

impl RecordSchema {
    /// Compile the schema for the given enumerations
    pub fn new(config: &SchemaConfig) -> Result<Self, SchemaError> {
        let document = schema_document(config);
        let validator =
            Validator::new(&document).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self {
            document,
            validator,
        })
    }

    /// The JSON Schema this validator enforces
    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    /// Validate a results file
    pub fn validate_file(&self, path: &Path) -> Result<Registry, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.validate_str(&content)
    }

    /// Validate raw JSON text
    pub fn validate_str(&self, content: &str) -> Result<Registry, SchemaError> {
        let raw: JsonValue = serde_json::from_str(content)?;
        self.validate(&raw)
    }

    /// Validate a parsed document and convert it into a typed registry
    pub fn validate(&self, raw: &JsonValue) -> Result<Registry, SchemaError> {
        let violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(raw)
            .map(|error| SchemaViolation {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();

        if !violations.is_empty() {
            return Err(SchemaError::Violations(violations));
        }

        // Calendar checks (e.g. 2024-02-30) are left to the typed conversion
        Ok(Registry::deserialize(raw)?)
    }
}
