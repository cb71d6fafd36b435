use crate::error::{Result, ScanError};
use crate::parser::document::*;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

pub const PROVIDER: &str = "github-actions";

/// Parser for GitHub Actions workflow YAML files.
pub struct GitHubActionsParser;

impl GitHubActionsParser {
    /// Parse a GitHub Actions workflow file into a pipeline document.
    pub fn parse_file(path: &Path) -> Result<PipelineDocument> {
        let content = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path.to_string_lossy().to_string())
    }

    /// Parse GitHub Actions YAML content into a pipeline document.
    pub fn parse(content: &str, source_file: String) -> Result<PipelineDocument> {
        let yaml: Value = serde_yaml::from_str(content).map_err(|source| ScanError::Yaml {
            path: PathBuf::from(&source_file),
            source,
        })?;

        let name = yaml
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unnamed Workflow")
            .to_string();

        let jobs = yaml
            .get("jobs")
            .and_then(|v| v.as_mapping())
            .ok_or_else(|| ScanError::MissingJobs {
                path: PathBuf::from(&source_file),
            })?;

        let mut doc = PipelineDocument::new(name, source_file, PROVIDER.to_string());
        doc.triggers = Self::parse_triggers(&yaml);

        // serde_yaml mappings preserve insertion order, so jobs keep file order.
        for (job_id, job_config) in jobs {
            let job_id = match job_id.as_str() {
                Some(id) => id.to_string(),
                None => {
                    log::warn!("{}: skipping job with non-string id", doc.source_file);
                    continue;
                }
            };
            doc.add_job(Self::parse_job(&job_id, job_config));
        }

        log::debug!(
            "parsed '{}' ({} jobs, {} steps)",
            doc.source_file,
            doc.job_count(),
            doc.step_count()
        );
        Ok(doc)
    }

    fn parse_triggers(yaml: &Value) -> Vec<String> {
        // YAML 1.1 readers may turn a bare `on` key into a boolean.
        let on = match yaml.get("on").or_else(|| yaml.get(Value::Bool(true))) {
            Some(v) => v,
            None => return Vec::new(),
        };

        match on {
            Value::String(event) => vec![event.clone()],
            Value::Sequence(events) => events
                .iter()
                .filter_map(|e| e.as_str().map(String::from))
                .collect(),
            Value::Mapping(map) => map
                .keys()
                .filter_map(|event| event.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parse_job(job_id: &str, config: &Value) -> Job {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(job_id)
            .to_string();

        let mut job = Job::new(job_id.to_string(), name);

        if let Some(steps) = config.get("steps").and_then(|v| v.as_sequence()) {
            job.steps = steps.iter().map(Self::parse_step).collect();
        }

        job
    }

    fn parse_step(step: &Value) -> Step {
        let field = |key: &str| step.get(key).and_then(|v| v.as_str()).map(String::from);

        Step {
            name: field("name"),
            uses: field("uses"),
            run: field("run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_workflow() {
        let yaml = r#"
name: CI
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Build
        run: npm run build
  test:
    needs: build
    runs-on: ubuntu-latest
    steps:
      - name: Test
        run: npm test
"#;
        let doc = GitHubActionsParser::parse(yaml, "ci.yml".to_string()).unwrap();
        assert_eq!(doc.job_count(), 2);
        assert_eq!(doc.name, "CI");
        assert_eq!(doc.provider, PROVIDER);
        assert_eq!(doc.jobs[0].id, "build");
        assert_eq!(doc.jobs[1].id, "test");

        let build = doc.get_job("build").unwrap();
        assert_eq!(build.steps.len(), 2);
        assert_eq!(build.steps[0].uses.as_deref(), Some("actions/checkout@v4"));
        assert_eq!(build.steps[0].run, None);
        assert_eq!(build.steps[1].run.as_deref(), Some("npm run build"));
    }

    #[test]
    fn test_parse_triggers() {
        let yaml = r#"
on:
  push:
    branches: [main]
  pull_request_target:
jobs:
  noop:
    runs-on: ubuntu-latest
"#;
        let doc = GitHubActionsParser::parse(yaml, "ci.yml".to_string()).unwrap();
        assert_eq!(doc.triggers.len(), 2);
        assert_eq!(doc.triggers, vec!["push", "pull_request_target"]);
        assert!(doc.has_trigger("pull_request_target"));
        assert_eq!(doc.name, "Unnamed Workflow");
    }

    #[test]
    fn test_parse_trigger_list_and_block_script() {
        let yaml = r#"
name: Scan
on: [workflow_dispatch, issues]
jobs:
  scan:
    runs-on: ubuntu-latest
    steps:
      - name: Multi-line
        run: |
          echo one
          echo two
"#;
        let doc = GitHubActionsParser::parse(yaml, "scan.yml".to_string()).unwrap();
        assert!(doc.has_trigger("workflow_dispatch"));
        assert!(doc.has_trigger("issues"));

        let scan = doc.get_job("scan").unwrap();
        assert_eq!(scan.steps[0].run.as_deref(), Some("echo one\necho two\n"));
    }

    #[test]
    fn test_missing_jobs_is_an_error() {
        let err = GitHubActionsParser::parse("name: CI\non: push\n", "ci.yml".to_string()).unwrap_err();
        assert!(matches!(err, ScanError::MissingJobs { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let err = GitHubActionsParser::parse("jobs: [unclosed", "ci.yml".to_string()).unwrap_err();
        assert!(matches!(err, ScanError::Yaml { .. }));
    }

    #[test]
    fn test_non_string_run_is_treated_as_absent() {
        let yaml = r#"
jobs:
  odd:
    steps:
      - run: [not, a, script]
"#;
        let doc = GitHubActionsParser::parse(yaml, "odd.yml".to_string()).unwrap();
        assert_eq!(doc.jobs[0].steps[0].run, None);
    }
}
