use std::path::PathBuf;
use thiserror::Error;

/// Errors raised around the analysis core: reading and parsing workflow
/// files, loading the trust policy, and compiling its patterns.
///
/// The analysis components themselves never fail; these errors only occur
/// before a document reaches them.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in '{path}'")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no 'jobs' section found in workflow '{path}'")]
    MissingJobs { path: PathBuf },

    #[error("invalid trust pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse policy file '{path}'")]
    Policy {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to search '{path}' for workflow files: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error("invalid expression delimiters: {0}")]
    InvalidDelimiters(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
