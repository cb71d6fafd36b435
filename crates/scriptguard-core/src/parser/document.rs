use serde::{Deserialize, Serialize};

/// A single step within a CI job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: Option<String>,
    /// Reusable action reference. Recorded, never analyzed.
    pub uses: Option<String>,
    /// Inline script handed to the runner's shell.
    pub run: Option<String>,
}

impl Step {
    /// A step that only runs an inline script.
    pub fn script(name: &str, run: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            uses: None,
            run: Some(run.to_string()),
        }
    }

    /// A step that only invokes an action.
    pub fn action(uses: &str) -> Self {
        Self {
            name: None,
            uses: Some(uses.to_string()),
            run: None,
        }
    }
}

/// A job: an identifier plus its ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
}

impl Job {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            steps: Vec::new(),
        }
    }
}

/// A parsed pipeline definition. Jobs keep file order; the document is
/// never mutated once the parser hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub name: String,
    pub source_file: String,
    pub provider: String,
    /// Event names from the `on` key.
    pub triggers: Vec<String>,
    pub jobs: Vec<Job>,
}

impl PipelineDocument {
    pub fn new(name: String, source_file: String, provider: String) -> Self {
        Self {
            name,
            source_file,
            provider,
            triggers: Vec::new(),
            jobs: Vec::new(),
        }
    }

    pub fn add_job(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Get total step count across all jobs.
    pub fn step_count(&self) -> usize {
        self.jobs.iter().map(|j| j.steps.len()).sum()
    }

    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn has_trigger(&self, event: &str) -> bool {
        self.triggers.iter().any(|t| t == event)
    }
}
