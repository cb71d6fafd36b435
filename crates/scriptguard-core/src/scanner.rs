use crate::parser::document::PipelineDocument;
use crate::parser::github::GitHubActionsParser;
use crate::report::{FileReport, RepositoryReport, ScanReport};
use crate::security::injection::{analyze_document, AnalysisOptions, AnalysisResult};
use crate::security::trust::TrustClassifier;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Read, parse and analyze one workflow file.
///
/// Read and parse failures become an unparseable entry; the analysis core
/// is not invoked for them.
pub fn scan_file(path: &Path, classifier: &TrustClassifier, options: &AnalysisOptions) -> FileReport {
    match GitHubActionsParser::parse_file(path) {
        Ok(doc) => {
            let result = analyze_document(&doc, classifier, options);
            FileReport::Scanned(ScanReport::new(&doc, result))
        }
        Err(e) => {
            log::warn!("skipping analysis of '{}': {}", path.display(), e);
            FileReport::unparseable(path.to_string_lossy().to_string(), error_chain(&e))
        }
    }
}

/// Scan many workflow files in parallel. Each file is independent; the
/// classifier is shared read-only by every worker.
pub fn scan_files(
    paths: &[PathBuf],
    classifier: &TrustClassifier,
    options: &AnalysisOptions,
) -> RepositoryReport {
    log::debug!("scanning {} workflow file(s)", paths.len());
    let files: Vec<FileReport> = paths
        .par_iter()
        .map(|path| scan_file(path, classifier, options))
        .collect();
    RepositoryReport::new(files)
}

/// Analyze already-parsed documents in parallel.
pub fn scan_documents(
    docs: &[PipelineDocument],
    classifier: &TrustClassifier,
    options: &AnalysisOptions,
) -> Vec<AnalysisResult> {
    docs.par_iter()
        .map(|doc| analyze_document(doc, classifier, options))
        .collect()
}

/// Render an error with its sources, `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::ControlResult;
    use crate::discovery::discover_workflow_files;
    use crate::parser::document::{Job, Step};
    use std::fs;
    use tempfile::TempDir;

    const SAFE: &str = r#"
name: Safe
on: push
jobs:
  build:
    steps:
      - run: echo ${{ github.sha }}
"#;

    const UNSAFE: &str = r#"
name: Unsafe
on: issue_comment
jobs:
  reply:
    steps:
      - run: echo "${{ github.event.comment.body }}"
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_scan_files_mixed_outcomes() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "safe.yml", SAFE),
            write(&dir, "unsafe.yml", UNSAFE),
            write(&dir, "broken.yml", "jobs: [unclosed"),
        ];

        let report = scan_files(&paths, TrustClassifier::shared(), &AnalysisOptions::default());
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.files[0].outcome().result, ControlResult::Passed);
        assert_eq!(report.files[1].outcome().result, ControlResult::Failed);
        assert_eq!(report.files[2].outcome().result, ControlResult::NeedsReview);
        assert_eq!(report.outcome.result, ControlResult::Failed);
        assert_eq!(report.untrusted_count(), 1);
    }

    #[test]
    fn test_repository_without_workflows_passes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".github")).unwrap();
        write(&dir, ".github/dependabot.yml", "version: 2\nupdates: []\n");
        write(&dir, "docker-compose.yml", "services:\n  db:\n    image: postgres\n");

        let files = discover_workflow_files(dir.path()).unwrap();
        let report = scan_files(&files, TrustClassifier::shared(), &AnalysisOptions::default());
        assert!(report.files.is_empty());
        assert_eq!(report.outcome.result, ControlResult::Passed);
        assert_eq!(report.exit_code(true), 0);
    }

    #[test]
    fn test_missing_file_needs_review() {
        let dir = TempDir::new().unwrap();
        let report = scan_file(
            &dir.path().join("gone.yml"),
            TrustClassifier::shared(),
            &AnalysisOptions::default(),
        );
        match report {
            FileReport::Unparseable { error, .. } => assert!(error.contains("failed to read")),
            FileReport::Scanned(_) => panic!("missing file must not be analyzed"),
        }
    }

    #[test]
    fn test_scan_documents_matches_sequential_analysis() {
        let docs: Vec<PipelineDocument> = (0..32)
            .map(|i| {
                let mut doc = PipelineDocument::new(
                    format!("wf{}", i),
                    format!("wf{}.yml", i),
                    "github-actions".into(),
                );
                let mut job = Job::new("job".into(), "Job".into());
                let run = if i % 3 == 0 {
                    "echo ${{ github.event.issue.body }}"
                } else {
                    "echo ${{ secrets.TOKEN }}"
                };
                job.steps.push(Step::script("run", run));
                doc.add_job(job);
                doc
            })
            .collect();

        let classifier = TrustClassifier::shared();
        let options = AnalysisOptions::default();
        let parallel = scan_documents(&docs, classifier, &options);
        let sequential: Vec<_> = docs
            .iter()
            .map(|d| analyze_document(d, classifier, &options))
            .collect();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.iter().filter(|r| !r.safe).count(), 11);
    }
}
