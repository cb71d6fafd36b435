use crate::parser::document::PipelineDocument;
use crate::security::expression::{extract_with, Delimiters};
use crate::security::trust::{TrustClassifier, TrustVerdict};
use crate::security::walker::script_bodies;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One classified expression and where it was interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub job_id: String,
    pub step_index: usize,
    pub step_name: Option<String>,
    pub expression: String,
    /// 1-based line inside the step's script.
    pub line: usize,
    /// 1-based column of the open delimiter on that line.
    pub column: usize,
    pub verdict: TrustVerdict,
    /// Id of the trust rule that decided the verdict.
    pub rule_id: Option<String>,
}

impl Finding {
    /// Location as `job.steps[index]`.
    pub fn location(&self) -> String {
        format!("{}.steps[{}]", self.job_id, self.step_index)
    }
}

/// What to do with identical findings inside one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Report every occurrence.
    #[default]
    KeepAll,
    /// Keep the first of each identical (job, step, expression, verdict).
    Collapse,
}

/// Knobs for a single document analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub delimiters: Delimiters,
    pub duplicates: DuplicatePolicy,
}

/// Safety verdict for one pipeline document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// True iff `findings` is empty.
    pub safe: bool,
    /// Untrusted expressions in executable scripts, in document order.
    pub findings: Vec<Finding>,
    /// Unrecognized expressions. Never affect `safe`.
    pub needs_review: Vec<Finding>,
    pub scripts_scanned: usize,
    pub expressions_scanned: usize,
}

impl AnalysisResult {
    pub fn untrusted_count(&self) -> usize {
        self.findings.len()
    }

    pub fn review_count(&self) -> usize {
        self.needs_review.len()
    }
}

/// Aggregate classified findings into a single verdict.
///
/// Collects every untrusted finding rather than stopping at the first one.
/// `scripts_scanned` is left for the caller to fill in.
pub fn detect<I>(findings: I, duplicates: DuplicatePolicy) -> AnalysisResult
where
    I: IntoIterator<Item = Finding>,
{
    let mut result = AnalysisResult::default();
    let mut seen = HashSet::new();

    for finding in findings {
        result.expressions_scanned += 1;

        if duplicates == DuplicatePolicy::Collapse {
            let key = (
                finding.job_id.clone(),
                finding.step_index,
                finding.expression.clone(),
                finding.verdict,
            );
            if !seen.insert(key) {
                continue;
            }
        }

        match finding.verdict {
            TrustVerdict::Untrusted => result.findings.push(finding),
            TrustVerdict::Unrecognized => result.needs_review.push(finding),
            TrustVerdict::Trusted => {}
        }
    }

    result.safe = result.findings.is_empty();
    result
}

/// Classify every expression of every script body in one document.
pub fn classify_document(
    doc: &PipelineDocument,
    classifier: &TrustClassifier,
    delimiters: &Delimiters,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for body in script_bodies(doc) {
        for expr in extract_with(body.script, delimiters) {
            let (verdict, rule) = classifier.classify_with_rule(&expr.text);
            findings.push(Finding {
                job_id: body.job_id.to_string(),
                step_index: body.step_index,
                step_name: body.step_name.map(String::from),
                expression: expr.text,
                line: expr.line,
                column: expr.column,
                verdict,
                rule_id: rule.map(|r| r.id.clone()),
            });
        }
    }

    findings
}

/// Run walker, extractor, classifier and detector over one document.
pub fn analyze_document(
    doc: &PipelineDocument,
    classifier: &TrustClassifier,
    options: &AnalysisOptions,
) -> AnalysisResult {
    let findings = classify_document(doc, classifier, &options.delimiters);
    let mut result = detect(findings, options.duplicates);
    result.scripts_scanned = script_bodies(doc).count();

    log::debug!(
        "{}: {} scripts, {} expressions, {} untrusted, {} unrecognized",
        doc.source_file,
        result.scripts_scanned,
        result.expressions_scanned,
        result.untrusted_count(),
        result.review_count()
    );
    result
}
