use crate::security::injection::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Result states understood by the assessment framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlResult {
    Passed,
    Failed,
    NeedsReview,
}

impl ControlResult {
    pub fn symbol(&self) -> &str {
        match self {
            ControlResult::Passed => "PASSED",
            ControlResult::Failed => "FAILED",
            ControlResult::NeedsReview => "NEEDS REVIEW",
        }
    }
}

/// A control result plus the message shown to the assessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOutcome {
    pub result: ControlResult,
    pub message: String,
}

impl ControlOutcome {
    fn new(result: ControlResult, message: String) -> Self {
        Self { result, message }
    }
}

/// Map one analyzed document to a control outcome.
pub fn assess_document(result: &AnalysisResult) -> ControlOutcome {
    if !result.safe {
        let offending: Vec<String> = result
            .findings
            .iter()
            .map(|f| format!("{} ({})", f.expression, f.location()))
            .collect();
        return ControlOutcome::new(
            ControlResult::Failed,
            format!(
                "Untrusted input interpolated into workflow scripts: {}",
                offending.join(", ")
            ),
        );
    }

    let message = match result.review_count() {
        0 => "No untrusted inputs found in workflow scripts".to_string(),
        n => format!(
            "No untrusted inputs found in workflow scripts; {} unrecognized expression(s) left for manual review",
            n
        ),
    };
    ControlOutcome::new(ControlResult::Passed, message)
}

/// Outcome for a document that could not be read or parsed. Never passes or
/// fails by default.
pub fn assess_unparseable(source_file: &str, error: &str) -> ControlOutcome {
    ControlOutcome::new(
        ControlResult::NeedsReview,
        format!("Workflow '{}' could not be analyzed: {}", source_file, error),
    )
}

/// Fold per-document outcomes: any failure fails, else any review request
/// needs review, else pass.
pub fn assess_repository(outcomes: &[ControlOutcome]) -> ControlOutcome {
    if outcomes.is_empty() {
        return ControlOutcome::new(
            ControlResult::Passed,
            "No workflow files found; there are no pipeline scripts to inject into".to_string(),
        );
    }

    let count = |wanted: ControlResult| outcomes.iter().filter(|o| o.result == wanted).count();
    let failed = count(ControlResult::Failed);
    let review = count(ControlResult::NeedsReview);

    if failed > 0 {
        ControlOutcome::new(
            ControlResult::Failed,
            format!(
                "{} of {} workflow file(s) interpolate untrusted input into scripts",
                failed,
                outcomes.len()
            ),
        )
    } else if review > 0 {
        ControlOutcome::new(
            ControlResult::NeedsReview,
            format!(
                "{} of {} workflow file(s) could not be analyzed",
                review,
                outcomes.len()
            ),
        )
    } else {
        ControlOutcome::new(
            ControlResult::Passed,
            format!(
                "All {} workflow file(s) are free of untrusted script inputs",
                outcomes.len()
            ),
        )
    }
}
