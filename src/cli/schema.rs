use crate::models::EquivregConfig;
use crate::validator::schema_document;
use crate::Result;

/// Print the JSON Schema of the results document
pub fn run(config: &EquivregConfig) -> Result<()> {
    let schema = schema_document(&config.schema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
