use crate::models::{EquivregConfig, Registry};
use crate::validator::RecordSchema;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Validate the results document
pub fn run(config: &EquivregConfig, project_root: &Path) -> Result<()> {
    let results_path = project_root.join(&config.paths.results);
    println!(
        "{}",
        format!("🔍 Validating {}...", results_path.display()).cyan()
    );

    let registry = validate(config, &results_path)?;

    println!(
        "{}",
        format!(
            "✅ {} is valid ({} record(s))",
            results_path.display(),
            registry.len()
        )
        .green()
    );
    Ok(())
}

/// Load and validate the results document at `path`
pub fn validate(config: &EquivregConfig, path: &Path) -> Result<Registry> {
    let schema = RecordSchema::new(&config.schema)?;
    Ok(schema.validate_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_valid_and_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let config = EquivregConfig::default();
        let results = root.join(&config.paths.results);
        std::fs::create_dir_all(results.parent().unwrap()).unwrap();

        std::fs::write(&results, r#"{"results": []}"#).unwrap();
        assert!(run(&config, root).is_ok());

        std::fs::write(&results, r#"{"results": [{"vendor": "Acme"}]}"#).unwrap();
        let err = run(&config, root).unwrap_err();
        assert!(err.to_string().contains("schema violation"));
    }

    #[test]
    fn test_check_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(run(&EquivregConfig::default(), temp_dir.path()).is_err());
    }
}
