pub mod assessment;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod policy;
pub mod report;
pub mod sarif;
pub mod scanner;
pub mod security;

pub use assessment::{ControlOutcome, ControlResult};
pub use error::{Result, ScanError};
pub use parser::document::{Job, PipelineDocument, Step};
pub use parser::github::GitHubActionsParser;
pub use policy::TrustPolicy;
pub use report::{FileReport, RepositoryReport, ScanReport, Severity};
pub use security::{AnalysisOptions, AnalysisResult, DuplicatePolicy, Finding, TrustClassifier, TrustVerdict};
