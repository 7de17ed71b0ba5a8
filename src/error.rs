//! Pipeline error taxonomy
//!
//! Every stage fails fast with one of these variants so callers can tell a
//! bad input file apart from a store outage or a training data shortfall.

use std::path::PathBuf;

/// Why a table failed schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaProblem {
    /// A required column is absent after name normalization.
    Missing,
    /// Two source columns normalize to the same name.
    Duplicate,
    /// A cell does not hold the type the column requires.
    InvalidValue,
}

impl std::fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing required column"),
            Self::Duplicate => write!(f, "duplicate column"),
            Self::InvalidValue => write!(f, "invalid value in column"),
        }
    }
}

/// Errors raised by the ingest and training stages
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input file could not be read or parsed.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The input file extension (or explicit format hint) is not supported.
    #[error("unsupported file type: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// The table does not carry the columns the pipeline needs.
    #[error("schema error: {problem}: {column}")]
    Schema { column: String, problem: SchemaProblem },

    /// Writing to or reading from the relational store failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Not enough stored rows to split and fit.
    #[error("insufficient data: {rows} rows available, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    /// The regression solver rejected the training partition.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// Writing the plot or results file failed.
    #[error("report error: {0}")]
    Report(String),

    /// A correction update failed; the correction batch was not committed.
    #[error("correction for id {id} failed: {message}")]
    Correction { id: i64, message: String },
}

impl PipelineError {
    pub(crate) fn load<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn missing_column(column: &str) -> Self {
        Self::Schema {
            column: column.to_string(),
            problem: SchemaProblem::Missing,
        }
    }

    /// Short, stable name of the failure kind (used in log fields).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load { .. } => "LoadError",
            Self::UnsupportedFormat { .. } => "UnsupportedFormatError",
            Self::Schema { .. } => "SchemaError",
            Self::Persistence(_) => "PersistenceError",
            Self::InsufficientData { .. } => "InsufficientDataError",
            Self::ModelFit(_) => "ModelFitError",
            Self::Report(_) => "ReportError",
            Self::Correction { .. } => "CorrectionError",
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_column() {
        let err = PipelineError::missing_column("refund_amount");
        let msg = err.to_string();
        assert!(msg.contains("refund_amount"));
        assert!(msg.contains("missing required column"));
        assert_eq!(err.kind(), "SchemaError");
    }

    #[test]
    fn test_load_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PipelineError::load("data/missing.csv", io);
        assert!(err.to_string().contains("data/missing.csv"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
