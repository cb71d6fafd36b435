use crate::error::{Result, ScanError};
use crate::security::expression::{Delimiters, DEFAULT_CLOSE, DEFAULT_OPEN};
use crate::security::injection::{AnalysisOptions, DuplicatePolicy};
use crate::security::trust::{builtin_rules, TrustClassifier, TrustRule, TrustVerdict};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the policy file, relative to the repository root.
pub const DEFAULT_POLICY_PATH: &str = ".scriptguard/policy.toml";

/// Trust policy loaded from `.scriptguard/policy.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrustPolicy {
    #[serde(default)]
    pub expressions: ExpressionSettings,
    #[serde(default)]
    pub trust: TrustSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionSettings {
    /// Token opening a templated expression
    #[serde(default = "default_open")]
    pub open: String,

    /// Token closing a templated expression
    #[serde(default = "default_close")]
    pub close: String,
}

impl Default for ExpressionSettings {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
        }
    }
}

fn default_open() -> String {
    DEFAULT_OPEN.to_string()
}

fn default_close() -> String {
    DEFAULT_CLOSE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSettings {
    /// Start from the built-in untrusted/trusted tables
    #[serde(default = "default_true")]
    pub include_defaults: bool,

    /// Extra attacker-controlled path patterns
    #[serde(default)]
    pub untrusted: Vec<PatternEntry>,

    /// Extra runner-controlled path patterns
    #[serde(default)]
    pub trusted: Vec<PatternEntry>,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            include_defaults: true,
            untrusted: Vec::new(),
            trusted: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportSettings {
    /// Collapse identical findings within one document
    #[serde(default)]
    pub deduplicate: bool,
}

/// Load a trust policy from a TOML file.
pub fn load_policy(path: &Path) -> Result<TrustPolicy> {
    let content = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let policy: TrustPolicy = toml::from_str(&content).map_err(|source| ScanError::Policy {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "loaded policy '{}' ({} extra untrusted, {} extra trusted patterns)",
        path.display(),
        policy.trust.untrusted.len(),
        policy.trust.trusted.len()
    );
    Ok(policy)
}

/// Load the policy at `path` if given, else the nearest default policy file
/// found from `start` upwards, else the built-in policy.
pub fn resolve_policy(path: Option<&Path>, start: &Path) -> Result<TrustPolicy> {
    if let Some(path) = path {
        return load_policy(path);
    }
    match find_policy(start) {
        Some(found) => load_policy(&found),
        None => Ok(TrustPolicy::default()),
    }
}

/// Look for `.scriptguard/policy.toml` in `start` and its ancestors, stopping
/// at the first repository root (a directory with `.git` or `.github`).
/// `start` may be a workflow file, a workflows directory or a repository root.
pub fn find_policy(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir.is_file() {
            continue;
        }
        let candidate = dir.join(DEFAULT_POLICY_PATH);
        if candidate.is_file() {
            return Some(candidate);
        }
        let base = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        if base.join(".git").exists() || base.join(".github").is_dir() {
            break;
        }
    }
    None
}

impl TrustPolicy {
    /// Compile the classification table. Custom patterns get ids
    /// `custom-U<n>` / `custom-T<n>`.
    pub fn build_classifier(&self) -> Result<TrustClassifier> {
        let mut rules = if self.trust.include_defaults {
            builtin_rules()?
        } else {
            Vec::new()
        };

        for (i, entry) in self.trust.untrusted.iter().enumerate() {
            rules.push(TrustRule::new(
                &format!("custom-U{}", i + 1),
                &entry.pattern,
                TrustVerdict::Untrusted,
                &entry.description,
            )?);
        }
        for (i, entry) in self.trust.trusted.iter().enumerate() {
            rules.push(TrustRule::new(
                &format!("custom-T{}", i + 1),
                &entry.pattern,
                TrustVerdict::Trusted,
                &entry.description,
            )?);
        }

        Ok(TrustClassifier::new(rules))
    }

    pub fn analysis_options(&self) -> Result<AnalysisOptions> {
        Ok(AnalysisOptions {
            delimiters: Delimiters::new(&self.expressions.open, &self.expressions.close)?,
            duplicates: if self.report.deduplicate {
                DuplicatePolicy::Collapse
            } else {
                DuplicatePolicy::KeepAll
            },
        })
    }
}
