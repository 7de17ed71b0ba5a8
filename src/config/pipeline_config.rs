//! Pipeline configuration: store connection, training, correction, output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "REVENUE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pipeline.toml";

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Relational store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Train/test split and model fitting
    #[serde(default)]
    pub training: TrainingConfig,

    /// Write-back of corrected revenue values
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Plot and results artifacts
    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `explicit` path (from `--config`); errors are fatal
    /// 2. `$REVENUE_CONFIG`
    /// 3. `./pipeline.toml`
    /// 4. Built-in defaults
    ///
    /// Environment overrides are applied last, then the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let config = Self::load_from_file(path)?;
                info!(path = %path.display(), "Loaded pipeline config");
                config
            }
            None => Self::search(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn search() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded pipeline config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded pipeline config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No pipeline.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys only warn; the typed parse and `validate()` decide
    /// whether the file is usable.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// The password is only ever taken from the environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let db = &mut self.database;
        if let Some(v) = lookup("REVENUE_DB_HOST") {
            db.host = v;
        }
        if let Some(v) = lookup("REVENUE_DB_PORT") {
            match v.parse() {
                Ok(port) => db.port = port,
                Err(_) => warn!(value = %v, "Ignoring unparseable REVENUE_DB_PORT"),
            }
        }
        if let Some(v) = lookup("REVENUE_DB_NAME") {
            db.dbname = v;
        }
        if let Some(v) = lookup("REVENUE_DB_USER") {
            db.user = v;
        }
        if let Some(v) = lookup("REVENUE_TABLE") {
            db.table = v;
        }
        db.password = lookup("REVENUE_DB_PASSWORD").or_else(|| lookup("PGPASSWORD"));
        db.url = lookup("DATABASE_URL");
    }

    /// Serialize the effective config. Secrets are never written.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate value ranges.
    ///
    /// Rules:
    /// - `training.test_fraction` strictly between 0 and 1
    /// - `training.min_rows` at least 2
    /// - `correction.threshold` finite and > 0
    /// - `database.port` non-zero
    /// - `database.table` a plain SQL identifier
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Database
// ============================================================================

/// PostgreSQL connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub dbname: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    /// Destination / source table for both stages
    pub table: String,
    /// From `REVENUE_DB_PASSWORD` or `PGPASSWORD` only
    #[serde(skip)]
    pub password: Option<String>,
    /// Full connection string from `DATABASE_URL`; takes precedence over
    /// the individual fields when set
    #[serde(skip)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dbname: defaults::DEFAULT_DB_NAME.to_string(),
            user: defaults::DEFAULT_DB_USER.to_string(),
            host: defaults::DEFAULT_DB_HOST.to_string(),
            port: defaults::DEFAULT_DB_PORT,
            table: defaults::DEFAULT_TABLE.to_string(),
            password: None,
            url: None,
        }
    }
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Held-out fraction for the test partition
    pub test_fraction: f64,
    /// Shuffle seed; identical data and seed give identical coefficients
    pub seed: u64,
    /// Minimum stored rows required to train
    pub min_rows: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: defaults::TEST_FRACTION,
            seed: defaults::SPLIT_SEED,
            min_rows: defaults::MIN_TRAINING_ROWS,
        }
    }
}

// ============================================================================
// Correction
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Write corrections back to the store (false = plan and report only)
    pub enabled: bool,
    /// Relative deviation above which a value is corrected
    pub threshold: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: defaults::CORRECTION_THRESHOLD,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the plot and results files
    pub dir: PathBuf,
    pub plot_file: String,
    pub results_file: String,
    /// Render the scatter plot (needs system fonts)
    pub plot: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            plot_file: defaults::PLOT_FILE.to_string(),
            results_file: defaults::RESULTS_FILE.to_string(),
            plot: true,
        }
    }
}

impl OutputConfig {
    pub fn plot_path(&self) -> PathBuf {
        self.dir.join(&self.plot_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(&self.results_file)
    }
}
