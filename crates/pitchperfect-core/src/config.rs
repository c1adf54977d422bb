// Configuration loading and parsing (config/pitchperfect.toml).

use crate::cohort::CohortScope;
use crate::profile::{ProfileOptions, DEFAULT_RADAR_METRICS};
use crate::schema::MetricId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "pitchperfect.toml";

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
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub photo: PhotoConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Season table, relative to the working directory.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub per90_min_minutes: f64,
    pub min_cohort_size: usize,
    pub dribble_min_attempts: f64,
    pub xg_tolerance: f64,
    pub histogram_bins: usize,
    #[serde(default)]
    pub default_minutes_floor: u32,
    #[serde(default)]
    pub cohort_scope: CohortScope,
    /// Schema keys (`"goals"`, `"xg"`...) for the radar spokes, in order.
    #[serde(default = "default_radar_keys")]
    pub radar_metrics: Vec<String>,
}

fn default_radar_keys() -> Vec<String> {
    DEFAULT_RADAR_METRICS.iter().map(|m| m.key().to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// URL with `{player}` and `{team}` placeholders. Empty disables fetching.
    pub url_template: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Smallest accepted width and height, in pixels.
    pub min_dimension: u32,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        PhotoConfig {
            url_template: String::new(),
            timeout_secs: 5,
            user_agent: concat!("pitchperfect/", env!("CARGO_PKG_VERSION")).to_string(),
            min_dimension: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: "exports".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Radar metrics resolved against the schema. Unknown keys are dropped;
    /// `validate` rejects them before a loaded config is handed out.
    pub fn radar_metric_ids(&self) -> Vec<MetricId> {
        self.radar_metrics
            .iter()
            .filter_map(|k| MetricId::from_key(k))
            .collect()
    }

    pub fn profile_options(&self) -> ProfileOptions {
        ProfileOptions {
            cohort_scope: self.cohort_scope,
            min_cohort_size: self.min_cohort_size,
            per90_min_minutes: self.per90_min_minutes,
            xg_tolerance: self.xg_tolerance,
            dribble_min_attempts: self.dribble_min_attempts,
            histogram_bins: self.histogram_bins,
            radar_metrics: self.radar_metric_ids(),
            ..ProfileOptions::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pitchperfect.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/pitchperfect.toml` to `config/` when the user has no
/// config yet. Returns the path written, or `None` when a config was
/// already present. An existing config is never touched.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }
    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if !default.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config at {} and no {} to copy it from",
                target.display(),
                default.display()
            ),
        });
    }
    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", default.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&default, &target).map_err(copy_err)?;
    info!("created {} from defaults", target.display());
    Ok(Some(target))
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.path.trim().is_empty() {
        return Err(invalid("data.path", "must not be empty"));
    }

    let a = &config.analysis;
    if a.per90_min_minutes.is_nan() || a.per90_min_minutes <= 0.0 {
        return Err(invalid(
            "analysis.per90_min_minutes",
            format!("must be > 0, got {}", a.per90_min_minutes),
        ));
    }
    if a.min_cohort_size == 0 {
        return Err(invalid("analysis.min_cohort_size", "must be >= 1"));
    }
    if a.histogram_bins == 0 {
        return Err(invalid("analysis.histogram_bins", "must be >= 1"));
    }
    if a.dribble_min_attempts.is_nan() || a.dribble_min_attempts < 0.0 {
        return Err(invalid(
            "analysis.dribble_min_attempts",
            format!("must be >= 0, got {}", a.dribble_min_attempts),
        ));
    }
    if a.xg_tolerance.is_nan() || a.xg_tolerance < 0.0 {
        return Err(invalid(
            "analysis.xg_tolerance",
            format!("must be >= 0, got {}", a.xg_tolerance),
        ));
    }
    if a.radar_metrics.is_empty() {
        return Err(invalid("analysis.radar_metrics", "must list at least one metric"));
    }
    for key in &a.radar_metrics {
        match MetricId::from_key(key) {
            None => {
                return Err(invalid(
                    "analysis.radar_metrics",
                    format!("unknown metric key '{key}'"),
                ))
            }
            Some(m) if !m.percentile_eligible() => {
                return Err(invalid(
                    "analysis.radar_metrics",
                    format!("metric '{key}' cannot be percentile-scored"),
                ))
            }
            Some(_) => {}
        }
    }

    if config.photo.min_dimension == 0 {
        return Err(invalid("photo.min_dimension", "must be > 0"));
    }
    if config.photo.timeout_secs == 0 {
        return Err(invalid("photo.timeout_secs", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
