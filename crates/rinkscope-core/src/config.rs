// Configuration loading and parsing (config/analysis.toml).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::features::ReductionMode;

/// File name of the analysis configuration inside `config/` and `defaults/`.
pub const CONFIG_FILE_NAME: &str = "analysis.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub cohorts: BTreeMap<String, CohortConfig>,
    pub analyses: Vec<AnalysisConfig>,
}

impl Config {
    pub fn cohort(&self, name: &str) -> Option<&CohortConfig> {
        self.cohorts.get(name)
    }

    pub fn analysis(&self, name: &str) -> Option<&AnalysisConfig> {
        self.analyses.iter().find(|a| a.name == name)
    }
}

// ---------------------------------------------------------------------------
// analysis.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire analysis.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AnalysisFile {
    #[serde(default)]
    pipeline: PipelineConfig,
    #[serde(default)]
    output: OutputSection,
    #[serde(default)]
    cohorts: BTreeMap<String, CohortSection>,
    #[serde(default, rename = "analysis")]
    analyses: Vec<AnalysisConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Seed for every k-means fit. `None` lets each run draw a fresh seed.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_cluster_counts")]
    pub cluster_counts: Vec<usize>,
    #[serde(default = "default_scree_max_clusters")]
    pub scree_max_clusters: usize,
    /// Feature plotted on the x axis of unreduced scatter plots.
    #[serde(default = "default_projection_x")]
    pub projection_x: String,
    /// Feature plotted on the y axis of unreduced scatter plots.
    #[serde(default = "default_projection_y")]
    pub projection_y: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            seed: None,
            cluster_counts: default_cluster_counts(),
            scree_max_clusters: default_scree_max_clusters(),
            projection_x: default_projection_x(),
            projection_y: default_projection_y(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OutputSection {
    #[serde(default = "default_figures_dir")]
    figures_dir: String,
    #[serde(default = "default_reports_dir")]
    reports_dir: String,
    #[serde(default = "default_true")]
    render: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        OutputSection {
            figures_dir: default_figures_dir(),
            reports_dir: default_reports_dir(),
            render: true,
        }
    }
}

/// Output locations, resolved against the base directory.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub figures_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub render: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct CohortSection {
    #[serde(default)]
    seasons: Vec<String>,
}

/// An ordered list of season files combined into one dataset.
#[derive(Debug, Clone)]
pub struct CohortConfig {
    pub seasons: Vec<PathBuf>,
}

/// Which role partition of a cohort an analysis clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSelection {
    #[default]
    All,
    Offense,
    Defense,
}

/// Population the reference subgroup is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoonScope {
    Cohort,
    #[default]
    Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    pub cohort: String,
    #[serde(default)]
    pub role: RoleSelection,
    #[serde(default)]
    pub goons_from: GoonScope,
    pub mode: ReductionMode,
    #[serde(default = "default_true")]
    pub scree: bool,
    /// Single cluster count for the final labelled run.
    #[serde(default)]
    pub final_clusters: Option<usize>,
    /// Manually supplied player names highlighted alongside the computed
    /// reference subgroup.
    #[serde(default)]
    pub highlight: Vec<String>,
}

fn default_cluster_counts() -> Vec<usize> {
    vec![2, 3, 4, 5, 6]
}

fn default_scree_max_clusters() -> usize {
    5
}

fn default_projection_x() -> String {
    "PTS".into()
}

fn default_projection_y() -> String {
    "PIM".into()
}

fn default_figures_dir() -> String {
    "figs".into()
}

fn default_reports_dir() -> String {
    "reports".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/analysis.toml` relative to
/// `base_dir`. Relative season and output paths are resolved against
/// `base_dir`.
///
/// Does not copy defaults; see `load_config`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    load_config_file(&path, base_dir)
}

/// Load and validate an explicit config file. Relative paths inside it are
/// resolved against `base_dir`.
pub fn load_config_file(path: &Path, base_dir: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let file: AnalysisFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let output = OutputConfig {
        figures_dir: resolve(base_dir, &file.output.figures_dir),
        reports_dir: resolve(base_dir, &file.output.reports_dir),
        render: file.output.render,
    };

    let cohorts = file
        .cohorts
        .into_iter()
        .map(|(name, section)| {
            let seasons = section.seasons.iter().map(|s| resolve(base_dir, s)).collect();
            (name, CohortConfig { seasons })
        })
        .collect();

    let config = Config {
        pipeline: file.pipeline,
        output,
        cohorts,
        analyses: file.analyses,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy every file from `defaults/` into `config/` that is not there yet and
/// return the copied paths. `*.example` files stay behind. A base directory
/// with only `config/` is fine; one with neither is an error.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(copy_error(format!(
            "neither defaults/ nor config/ directory found in {}; \
             pass --base-dir or --config",
            base_dir.display()
        )));
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
    {
        let path = entry
            .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
            .path();
        let is_example = path.extension().is_some_and(|ext| ext == "example");
        if path.is_file() && !is_example {
            sources.push(path);
        }
    }
    sources.sort();

    let mut copied = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if copy_if_absent(&source, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Create `target` with the contents of `source` unless it already exists.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    use std::io::Write;

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    };
    let bytes = std::fs::read(source)
        .map_err(|e| copy_error(format!("cannot read {}: {e}", source.display())))?;
    dest.write_all(&bytes)
        .map_err(|e| copy_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: loads config relative to `base_dir` after copying
/// any missing defaults into `config/`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn resolve(base_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let pipeline = &config.pipeline;
    if pipeline.cluster_counts.is_empty() {
        return Err(invalid("pipeline.cluster_counts", "must not be empty"));
    }
    if let Some(k) = pipeline.cluster_counts.iter().find(|&&k| k == 0) {
        return Err(invalid(
            "pipeline.cluster_counts",
            format!("entries must be >= 1, got {k}"),
        ));
    }
    if pipeline.scree_max_clusters == 0 {
        return Err(invalid("pipeline.scree_max_clusters", "must be >= 1"));
    }
    for (field, value) in [
        ("pipeline.projection_x", &pipeline.projection_x),
        ("pipeline.projection_y", &pipeline.projection_y),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(field, "must name a feature column"));
        }
    }

    if config.cohorts.is_empty() {
        return Err(invalid("cohorts", "at least one cohort is required"));
    }
    for (name, cohort) in &config.cohorts {
        if cohort.seasons.is_empty() {
            return Err(invalid(
                format!("cohorts.{name}.seasons"),
                "must list at least one season file",
            ));
        }
    }

    if config.analyses.is_empty() {
        return Err(invalid("analysis", "at least one analysis is required"));
    }
    let mut seen = HashSet::new();
    for analysis in &config.analyses {
        if analysis.name.trim().is_empty() {
            return Err(invalid("analysis.name", "must not be empty"));
        }
        if !seen.insert(analysis.name.as_str()) {
            return Err(invalid(
                "analysis.name",
                format!("duplicate analysis name `{}`", analysis.name),
            ));
        }
        if !config.cohorts.contains_key(&analysis.cohort) {
            return Err(invalid(
                format!("analysis.{}.cohort", analysis.name),
                format!("unknown cohort `{}`", analysis.cohort),
            ));
        }
        if let Some(k) = analysis.final_clusters {
            if k < 2 {
                return Err(invalid(
                    format!("analysis.{}.final_clusters", analysis.name),
                    format!("must be >= 2, got {k}"),
                ));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
