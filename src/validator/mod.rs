pub mod schema;

pub use schema::{schema_document, RecordSchema, SchemaError, SchemaViolation};
