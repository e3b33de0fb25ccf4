use crate::models::{EquivregConfig, NameRegistry};
use crate::reconcile::merge_registry_names;
use crate::Result;
use chrono::Utc;
use colored::Colorize;
use std::path::Path;

/// Record the `equiv_names` declared in the results document as
/// equivalence-name facts
pub fn run(config: &EquivregConfig, project_root: &Path) -> Result<()> {
    let paths = config.paths.resolve(project_root);

    let registry = super::check::validate(config, &paths.results)?;
    let existing = NameRegistry::load(&paths.names)?;
    let existed = paths.names.exists();

    let (added, names) = merge_registry_names(&registry, existing, Utc::now());

    if added.is_empty() && existed {
        println!("{}", "No new equivalence names.".yellow());
        return Ok(());
    }

    names.save(&paths.names)?;
    println!(
        "{}",
        format!(
            "✅ {} new equivalence name set(s), {} total → {}",
            added.len(),
            names.len(),
            paths.names.display()
        )
        .green()
    );
    for entry in &added {
        println!("   • {}: {}", entry.vendor, entry.equiv_names.join(", "));
    }

    Ok(())
}
