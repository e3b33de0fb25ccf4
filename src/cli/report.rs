use crate::models::EquivregConfig;
use crate::report::{markdown, project, ArtifactPaths, Artifacts};
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use std::path::Path;

/// Validate the results document and regenerate every report artifact.
///
/// All artifacts are rendered before the first one is written; a schema
/// failure leaves existing artifacts untouched.
pub fn run(config: &EquivregConfig, project_root: &Path) -> Result<()> {
    let paths = config.paths.resolve(project_root);

    println!("{}", "📊 Generating reports...".cyan());

    let registry = super::check::validate(config, &paths.results)?;
    let projection = project(&registry);

    let template = if paths.report_template.exists() {
        std::fs::read_to_string(&paths.report_template).with_context(|| {
            format!("Failed to read template {}", paths.report_template.display())
        })?
    } else {
        tracing::info!(
            template = %paths.report_template.display(),
            "template not found, using built-in template"
        );
        markdown::DEFAULT_TEMPLATE.to_string()
    };

    let artifacts = Artifacts::render(&projection, &template)?;
    let targets = ArtifactPaths {
        markdown: paths.report_markdown,
        csv: paths.report_csv,
        xlsx: paths.report_xlsx,
    };
    artifacts.write(&targets)?;

    println!(
        "{}",
        format!("✅ {} record(s) written", projection.rows.len()).green()
    );
    for path in [&targets.markdown, &targets.csv, &targets.xlsx] {
        println!("   • {}", path.display());
    }

    Ok(())
}
