use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "equivreg.toml";

/// Change-review source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the REST API
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Environment variable holding the bearer credential (optional)
    pub token_env: String,
    /// Trailing window, in days, of closed change requests considered by a scan
    pub window_days: i64,
    /// Page size for listing endpoints
    pub per_page: u32,
    /// Upper bound for each individual request
    pub timeout_secs: u64,
    /// Longest wait accepted when the API reports an exhausted rate limit
    pub max_rate_limit_wait_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: "ministero-salute".to_string(),
            repo: "it-fse-accreditamento".to_string(),
            token_env: "GITHUB_TOKEN_IT_FSE_ACCREDITAMENTO_READ_ONLY".to_string(),
            window_days: 30,
            per_page: 100,
            timeout_secs: 30,
            max_rate_limit_wait_secs: 120,
        }
    }
}

impl SourceConfig {
    /// Read the credential from the configured environment variable.
    ///
    /// An unset or blank variable yields `None`; requests then go out
    /// unauthenticated.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Which submitted files count as version manifests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Case-insensitive filename suffixes
    pub suffixes: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            suffixes: vec!["version.json".to_string(), "versions.json".to_string()],
        }
    }
}

/// Closed enumerations of the results document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub doc_types: Vec<String>,
    pub services: Vec<String>,
    /// The only accepted `gtw_version` value for this schema generation
    pub gateway_version: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            doc_types: [
                "LDO",
                "LAB",
                "RAD",
                "VPS",
                "RSA",
                "CERT_VACC",
                "SING_VACC",
                "LAB_TRASF",
                "PSS",
                "RAP",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            services: vec!["VALIDATION".to_string(), "PUBLICATION".to_string()],
            gateway_version: "1.0".to_string(),
        }
    }
}

/// Input and output locations, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub results: PathBuf,
    pub names: PathBuf,
    pub report_template: PathBuf,
    pub report_markdown: PathBuf,
    pub report_csv: PathBuf,
    pub report_xlsx: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results: PathBuf::from("RESULTS/results.json"),
            names: PathBuf::from("RESULTS/equiv_names.json"),
            report_template: PathBuf::from("scripts/RESULTS.md.tpl"),
            report_markdown: PathBuf::from("RESULTS/README.md"),
            report_csv: PathBuf::from("RESULTS/results.csv"),
            report_xlsx: PathBuf::from("RESULTS/results.xlsx"),
        }
    }
}

impl PathsConfig {
    /// Resolve every relative path against `root`
    pub fn resolve(&self, root: &Path) -> Self {
        Self {
            results: root.join(&self.results),
            names: root.join(&self.names),
            report_template: root.join(&self.report_template),
            report_markdown: root.join(&self.report_markdown),
            report_csv: root.join(&self.report_csv),
            report_xlsx: root.join(&self.report_xlsx),
        }
    }
}

/// Top-level configuration, fixed for the duration of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquivregConfig {
    pub source: SourceConfig,
    pub manifests: ManifestConfig,
    pub schema: SchemaConfig,
    pub paths: PathsConfig,
}

impl EquivregConfig {
    /// Load config from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(path)
    }

    /// Load the config named on the command line, or `CONFIG_FILE` under
    /// `project_root`. Only the implicit file may be absent.
    pub fn locate(explicit: Option<&Path>, project_root: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_file(path)
            }
            None => Self::load(&project_root.join(CONFIG_FILE)),
        }
    }

    fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: EquivregConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}
