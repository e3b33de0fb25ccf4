use crate::models::{EquivregConfig, NameRegistry};
use crate::reconcile::{MergeOutcome, ReconcileOutcome, Reconciler, ScannedManifest};
use crate::report::spreadsheet;
use crate::source::{ChangeSource, ChangeWalker, GithubSource, WalkPolicy};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Options of the `scan` command
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Override of the configured window, in days
    pub days: Option<i64>,
    /// Report new entries without writing the name registry
    pub dry_run: bool,
    /// Keep a copy of every fetched manifest under this directory
    pub save_manifests: Option<PathBuf>,
    /// Write a spreadsheet summarizing every fetched manifest
    pub summary: Option<PathBuf>,
}

const SUMMARY_HEADER: [&str; 8] = [
    "PR #",
    "Title",
    "Version JSON file",
    "Local path",
    "Vendor",
    "App ID",
    "Main Version",
    "Equivalent Versions",
];

/// Scan recently closed change requests and append new equivalence names
pub async fn run(config: &EquivregConfig, project_root: &Path, options: ScanOptions) -> Result<()> {
    let paths = config.paths.resolve(project_root);

    // Read once up front; a malformed registry aborts before any network call
    let existing = NameRegistry::load(&paths.names)?;

    let token = config.source.token();
    if token.is_none() {
        tracing::warn!(
            env = %config.source.token_env,
            "no API credential set, using unauthenticated access"
        );
    }
    let source = GithubSource::new(&config.source, token)?;

    let window_days = options.days.unwrap_or(config.source.window_days);
    println!(
        "{}",
        format!(
            "🔍 Scanning {}/{} for change requests closed in the last {} day(s)...",
            config.source.owner, config.source.repo, window_days
        )
        .cyan()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Fetching change requests...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let now = Utc::now();
    let result = scan(&source, config, window_days, existing, now).await;
    spinner.finish_and_clear();
    let outcome = result?;

    print_outcome(&outcome);

    let saved_dir = match &options.save_manifests {
        Some(dir) => {
            let target = manifest_dir(&project_root.join(dir), now);
            let saved = save_manifests(&target, &outcome.scanned)?;
            println!("   📦 Saved {} manifest(s) under {}", saved, target.display());
            Some(target)
        }
        None => None,
    };

    if let Some(summary) = &options.summary {
        if outcome.scanned.is_empty() {
            println!("{}", "⚠️  No manifests scanned, summary not written.".yellow());
        } else {
            let bytes = spreadsheet::render(
                Some("Versions PRs"),
                &summary_lines(&outcome.scanned, saved_dir.as_deref()),
            )?;
            let target = project_root.join(summary);
            crate::report::write_file(&target, &bytes)?;
            println!("   📄 Summary written to {}", target.display());
        }
    }

    if outcome.new_entries.is_empty() {
        println!("{}", "No new equivalence names.".yellow());
    } else if options.dry_run {
        println!(
            "{}",
            format!(
                "Dry run: {} new entr(y/ies) not written to {}",
                outcome.new_entries.len(),
                paths.names.display()
            )
            .yellow()
        );
    } else {
        outcome.registry.save(&paths.names)?;
        println!(
            "{}",
            format!(
                "✅ {} new entr(y/ies) appended to {}",
                outcome.new_entries.len(),
                paths.names.display()
            )
            .green()
        );
    }

    Ok(())
}

/// Walk the source and reconcile every manifest against `existing`.
///
/// Only a failure of the initial listing is an error; per-item failures are
/// logged and counted in the outcome.
pub async fn scan<S: ChangeSource + ?Sized>(
    source: &S,
    config: &EquivregConfig,
    window_days: i64,
    existing: NameRegistry,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
    let policy = WalkPolicy::new(window_days, &config.manifests.suffixes);
    let mut walker = ChangeWalker::open(source, policy, now)
        .await
        .context("Failed to list closed change requests")?;

    let outcome = Reconciler::new(source, now)
        .reconcile_walk(&mut walker, existing)
        .await;

    if !walker.skipped().is_empty() {
        tracing::warn!(skipped = ?walker.skipped(), "change requests skipped after listing failures");
    }

    Ok(outcome)
}

fn print_outcome(outcome: &ReconcileOutcome) {
    let stats = &outcome.stats;
    println!(
        "   Manifests: {} fetched, {} failed, {} unparsable",
        stats.fetched, stats.fetch_failed, stats.unparsable
    );
    println!(
        "   Names:     {} new, {} already known",
        stats.added, stats.duplicates
    );

    for scanned in &outcome.scanned {
        let marker = match scanned.outcome {
            MergeOutcome::Added => "+".green(),
            MergeOutcome::DuplicateSuppressed => "=".bright_black(),
            MergeOutcome::NoNames => "·".bright_black(),
        };
        println!(
            "   {} PR #{} {} ({})",
            marker,
            scanned.manifest.change_id,
            scanned.manifest.file_path,
            if scanned.parsed {
                scanned.metadata.vendor.as_str()
            } else {
                "unparsable"
            }
        );
    }
}

/// Local file name of a saved manifest: `PR<id>_<basename>`
fn local_name(scanned: &ScannedManifest) -> String {
    let basename = Path::new(&scanned.manifest.file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| scanned.manifest.file_path.replace('/', "_"));
    format!("PR{}_{}", scanned.manifest.change_id, basename)
}

/// `<dir>/<date>/closed`, where a run's manifests are saved
fn manifest_dir(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    dir.join(now.format("%Y-%m-%d").to_string()).join("closed")
}

/// Write every fetched manifest into `target`
fn save_manifests(target: &Path, scanned: &[ScannedManifest]) -> Result<usize> {
    std::fs::create_dir_all(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    for item in scanned {
        let path = target.join(local_name(item));
        std::fs::write(&path, &item.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(scanned.len())
}

/// Summary rows; "Local path" is empty unless the manifests were saved
fn summary_lines(scanned: &[ScannedManifest], saved_dir: Option<&Path>) -> Vec<Vec<String>> {
    let mut lines = vec![SUMMARY_HEADER.iter().map(|h| h.to_string()).collect()];
    lines.extend(scanned.iter().map(|item| {
        vec![
            item.manifest.change_id.to_string(),
            item.manifest.title.clone(),
            local_name(item),
            saved_dir
                .map(|dir| dir.join(local_name(item)).display().to_string())
                .unwrap_or_default(),
            item.metadata.vendor.clone(),
            item.metadata.application_id.clone(),
            item.metadata.primary_version.clone(),
            item.metadata.equivalent_display(),
        ]
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::VersionMetadata;
    use crate::source::ManifestRef;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn scanned(change_id: u64, file_path: &str) -> ScannedManifest {
        ScannedManifest {
            manifest: ManifestRef {
                change_id,
                title: "Add release".to_string(),
                file_path: file_path.to_string(),
                revision: "abc".to_string(),
            },
            content: b"{}".to_vec(),
            metadata: VersionMetadata {
                vendor: "Acme".to_string(),
                application_id: "A1".to_string(),
                primary_version: "2.0".to_string(),
                equivalent_versions: vec!["2.0.1".to_string(), "2.0.2".to_string()],
            },
            parsed: true,
            outcome: MergeOutcome::Added,
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(&scanned(42, "vendors/acme/version.json")), "PR42_version.json");
    }

    #[test]
    fn test_save_manifests_layout() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let target = manifest_dir(temp_dir.path(), now);
        let saved = save_manifests(&target, &[scanned(7, "a/version.json")]).unwrap();
        assert_eq!(saved, 1);
        assert!(temp_dir
            .path()
            .join("2024-06-30/closed/PR7_version.json")
            .exists());
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(&[scanned(7, "a/version.json")], None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0], "PR #");
        assert_eq!(lines[0][3], "Local path");
        assert_eq!(lines[1][0], "7");
        assert_eq!(lines[1][3], "");
        assert_eq!(lines[1][7], "2.0.1, 2.0.2");
    }

    #[test]
    fn test_summary_lines_with_saved_manifests() {
        let dir = Path::new("pr_versions/2024-06-30/closed");
        let lines = summary_lines(&[scanned(7, "a/version.json")], Some(dir));
        assert_eq!(lines[1][2], "PR7_version.json");
        assert_eq!(
            lines[1][3],
            dir.join("PR7_version.json").display().to_string()
        );
        assert!(lines.iter().all(|line| line.len() == SUMMARY_HEADER.len()));
    }
}
