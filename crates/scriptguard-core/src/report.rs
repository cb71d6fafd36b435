use crate::assessment::{self, ControlOutcome, ControlResult};
use crate::parser::document::PipelineDocument;
use crate::security::injection::{AnalysisResult, Finding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events an outside contributor can fire while the workflow runs with the
/// base repository's token and secrets.
const PRIVILEGED_TRIGGERS: &[&str] = &[
    "pull_request_target",
    "issue_comment",
    "issues",
    "discussion",
    "discussion_comment",
    "pull_request_review",
    "pull_request_review_comment",
    "workflow_run",
];

/// Severity level for reported findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Info,
}

impl Severity {
    pub fn symbol(&self) -> &str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Info => "INFO",
        }
    }
}

/// Whether any trigger of the document hands privileged context to outsiders.
pub fn has_privileged_trigger(doc: &PipelineDocument) -> bool {
    PRIVILEGED_TRIGGERS.iter().any(|t| doc.has_trigger(t))
}

/// Remediation text for an untrusted finding.
pub fn recommendation(finding: &Finding) -> String {
    let var = env_var_name(&finding.expression);
    format!(
        "Pass the value through an environment variable instead of interpolating it:\n  \
         env:\n    {var}: ${{{{ {expr} }}}}\n  \
         run: echo \"${var}\"",
        var = var,
        expr = finding.expression
    )
}

/// Derive a shell-friendly variable name from the last path segments,
/// e.g. `github.event.issue.title` -> `ISSUE_TITLE`.
fn env_var_name(expression: &str) -> String {
    let segments: Vec<&str> = expression
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty() && s.parse::<u64>().is_err())
        .collect();
    let tail = &segments[segments.len().saturating_sub(2)..];
    if tail.is_empty() {
        return "UNTRUSTED_VALUE".to_string();
    }
    tail.join("_").to_uppercase()
}

/// Analysis of one workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub pipeline_name: String,
    pub source_file: String,
    pub provider: String,
    pub triggers: Vec<String>,
    pub job_count: usize,
    pub step_count: usize,
    /// Severity of the untrusted findings in this document.
    pub severity: Severity,
    pub result: AnalysisResult,
    pub outcome: ControlOutcome,
}

impl ScanReport {
    pub fn new(doc: &PipelineDocument, result: AnalysisResult) -> Self {
        let severity = if has_privileged_trigger(doc) {
            Severity::Critical
        } else {
            Severity::High
        };
        let outcome = assessment::assess_document(&result);
        Self {
            pipeline_name: doc.name.clone(),
            source_file: doc.source_file.clone(),
            provider: doc.provider.clone(),
            triggers: doc.triggers.clone(),
            job_count: doc.job_count(),
            step_count: doc.step_count(),
            severity,
            result,
            outcome,
        }
    }

    /// Severity for unrecognized expressions: worth a closer look when the
    /// workflow is reachable from outside.
    pub fn review_severity(&self) -> Severity {
        if self.severity == Severity::Critical {
            Severity::Medium
        } else {
            Severity::Info
        }
    }
}

/// Per-file entry of a repository scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileReport {
    Scanned(ScanReport),
    Unparseable {
        source_file: String,
        error: String,
        outcome: ControlOutcome,
    },
}

impl FileReport {
    pub fn unparseable(source_file: String, error: String) -> Self {
        let outcome = assessment::assess_unparseable(&source_file, &error);
        FileReport::Unparseable {
            source_file,
            error,
            outcome,
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            FileReport::Scanned(report) => &report.source_file,
            FileReport::Unparseable { source_file, .. } => source_file,
        }
    }

    pub fn outcome(&self) -> &ControlOutcome {
        match self {
            FileReport::Scanned(report) => &report.outcome,
            FileReport::Unparseable { outcome, .. } => outcome,
        }
    }
}

/// Aggregate report over every workflow file of a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    pub outcome: ControlOutcome,
}

impl RepositoryReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        let outcomes: Vec<ControlOutcome> = files.iter().map(|f| f.outcome().clone()).collect();
        Self {
            generated_at: Utc::now(),
            outcome: assessment::assess_repository(&outcomes),
            files,
        }
    }

    pub fn scanned(&self) -> impl Iterator<Item = &ScanReport> {
        self.files.iter().filter_map(|f| match f {
            FileReport::Scanned(report) => Some(report),
            FileReport::Unparseable { .. } => None,
        })
    }

    pub fn untrusted_count(&self) -> usize {
        self.scanned().map(|r| r.result.untrusted_count()).sum()
    }

    pub fn review_count(&self) -> usize {
        self.scanned().map(|r| r.result.review_count()).sum()
    }

    pub fn unparseable_count(&self) -> usize {
        self.files.len() - self.scanned().count()
    }

    /// 1 on failure, or on needs-review when `fail_on_review` is set; else 0.
    pub fn exit_code(&self, fail_on_review: bool) -> i32 {
        match self.outcome.result {
            ControlResult::Failed => 1,
            ControlResult::NeedsReview if fail_on_review => 1,
            _ => 0,
        }
    }
}
