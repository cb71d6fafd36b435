//! Script-injection analysis over one pipeline document.
//!
//! The stages run in one direction and never mutate each other's output:
//! [`walker`] yields script bodies, [`expression`] pulls templated payloads
//! out of them, [`trust`] classifies each payload and [`injection`] folds the
//! classifications into an [`AnalysisResult`].

pub mod expression;
pub mod injection;
pub mod trust;
pub mod walker;

pub use injection::{AnalysisOptions, AnalysisResult, DuplicatePolicy, Finding};
pub use trust::{TrustClassifier, TrustVerdict};

use crate::parser::document::PipelineDocument;

/// Analyze a document with the built-in trust tables and default options.
pub fn scan(doc: &PipelineDocument) -> AnalysisResult {
    injection::analyze_document(doc, TrustClassifier::shared(), &AnalysisOptions::default())
}
