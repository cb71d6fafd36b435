use crate::parser::document::PipelineDocument;

/// One executable script body and where it lives in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptBody<'a> {
    pub job_id: &'a str,
    /// 0-based position in the job's `steps` list.
    pub step_index: usize,
    pub step_name: Option<&'a str>,
    pub script: &'a str,
}

/// Yield every non-empty `run:` script in document order.
///
/// Steps without a script (action-only steps) are skipped but still count
/// towards `step_index`, so locations line up with the YAML.
pub fn script_bodies(doc: &PipelineDocument) -> impl Iterator<Item = ScriptBody<'_>> {
    doc.jobs.iter().flat_map(|job| {
        job.steps.iter().enumerate().filter_map(move |(step_index, step)| {
            let script = step.run.as_deref()?;
            if script.trim().is_empty() {
                return None;
            }
            Some(ScriptBody {
                job_id: &job.id,
                step_index,
                step_name: step.name.as_deref(),
                script,
            })
        })
    })
}
