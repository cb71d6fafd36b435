use crate::error::{Result, ScanError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// How far an expression's data source can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustVerdict {
    /// Runner-controlled or already sanitized.
    Trusted,
    /// Attacker-influenceable text.
    Untrusted,
    /// Not covered by any rule. Needs a human look.
    Unrecognized,
}

impl TrustVerdict {
    pub fn label(&self) -> &str {
        match self {
            TrustVerdict::Trusted => "trusted",
            TrustVerdict::Untrusted => "untrusted",
            TrustVerdict::Unrecognized => "unrecognized",
        }
    }
}

/// Built-in rule definition: (id, pattern, description).
type RuleDef = (&'static str, &'static str, &'static str);

/// Event payload paths whose text comes from outside the repository.
/// Unanchored, so a dangerous path inside a larger expression still matches.
const UNTRUSTED_RULES: &[RuleDef] = &[
    ("SG-U01", r"(?i)\bgithub\.event\.issue\.(?:title|body)\b", "Issue title or body"),
    ("SG-U02", r"(?i)\bgithub\.event\.pull_request\.(?:title|body)\b", "Pull request title or body"),
    (
        "SG-U03",
        r"(?i)\bgithub\.event\.pull_request\.head\.(?:ref|label|repo\.(?:default_branch|description|full_name|name))\b",
        "Pull request head branch, label or fork repository",
    ),
    (
        "SG-U04",
        r"(?i)\bgithub\.event\.(?:comment|review|review_comment)\.body\b",
        "Comment or review body",
    ),
    ("SG-U05", r"(?i)\bgithub\.event\.discussion\.(?:title|body)\b", "Discussion title or body"),
    (
        "SG-U06",
        r"(?i)\bgithub\.event\.commits\.(?:[\w*-]+\.)*message\b",
        "Commit message in the pushed commit list",
    ),
    (
        "SG-U07",
        r"(?i)\bgithub\.event\.commits\.(?:[\w*-]+\.)*author\.(?:email|name)\b",
        "Commit author in the pushed commit list",
    ),
    (
        "SG-U08",
        r"(?i)\bgithub\.event\.head_commit\.(?:message|author\.email|author\.name)\b",
        "Head commit message or author",
    ),
    ("SG-U09", r"(?i)\bgithub\.event\.pages\.(?:[\w*-]+\.)*page_name\b", "Wiki page name"),
    (
        "SG-U10",
        r"(?i)\bgithub\.event\.workflow_run\.(?:head_branch|display_title|head_commit\.(?:message|author\.email|author\.name)|pull_requests\.(?:[\w*-]+\.)*head\.ref)\b",
        "Triggering workflow run branch, title or commit",
    ),
    ("SG-U11", r"(?i)\bgithub\.head_ref\b", "Pull request head branch name"),
    (
        "SG-U12",
        r"(?i)\bgithub\.event(?:\.(?:issue|pull_request(?:\.head(?:\.repo)?)?|comment|review|review_comment|discussion|head_commit|commits|pages|workflow_run))?(?:$|[^\w.\[*-])",
        "Whole event object, e.g. passed to toJSON",
    ),
];

/// Paths the runner controls or that were declared inside the workflow.
/// Anchored, so the whole payload must be one of these.
const TRUSTED_RULES: &[RuleDef] = &[
    ("SG-T01", r"^secrets\.[\w-]+$", "Secret reference"),
    ("SG-T02", r"^github\.token$", "Job token"),
    (
        "SG-T03",
        r"^github\.(?:workspace|sha|run_id|run_number|run_attempt|repository|repository_id|repository_owner|repository_owner_id|event_name|job|action_path|server_url|api_url|graphql_url|retention_days|workflow|workflow_ref|workflow_sha|ref_type)$",
        "Runner-owned workflow metadata",
    ),
    (
        "SG-T04",
        r"^github\.event\.(?:number|(?:issue|pull_request|discussion)\.number|pull_request\.(?:head|base)\.sha|workflow_run\.id|merge_group\.base_sha)$",
        "Numeric event id or commit SHA",
    ),
    (
        "SG-T05",
        r"^runner\.(?:os|arch|name|temp|tool_cache|debug|environment)$",
        "Runner property",
    ),
    ("SG-T06", r"^env\.[\w-]+$", "Declared environment variable"),
    ("SG-T07", r"^vars\.[\w-]+$", "Configuration variable"),
    ("SG-T08", r"^matrix(?:\.[\w-]+)+$", "Matrix value"),
    (
        "SG-T09",
        r"^steps\.[\w-]+\.(?:outputs\.[\w-]+|outcome|conclusion)$",
        "Prior step output or status",
    ),
    ("SG-T10", r"^needs\.[\w-]+\.(?:outputs\.[\w-]+|result)$", "Upstream job output or result"),
    (
        "SG-T11",
        r"^(?:job\.(?:status|container\.id|container\.network)|strategy\.(?:job-index|job-total|fail-fast|max-parallel))$",
        "Job or strategy property",
    ),
    ("SG-T12", r"^(?:true|false|null|-?\d+(?:\.\d+)?|'[^']*')$", "Literal value"),
];

static SINGLE_QUOTED_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*'([^']*)'\s*\]").expect("valid index regex"));
static DOUBLE_QUOTED_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[\s*"([^"]*)"\s*\]"#).expect("valid index regex"));
static BARE_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*([^\]\s]*)\s*\]").expect("valid index regex"));

static SHARED: LazyLock<TrustClassifier> = LazyLock::new(|| {
    TrustClassifier::new(builtin_rules().expect("built-in trust patterns compile"))
});

/// Rewrite bracket access into dotted form and trim the payload:
/// `commits[0]` -> `commits.0`, `issue['title']` -> `issue.title`.
pub fn normalize_path(expression: &str) -> String {
    let path = SINGLE_QUOTED_INDEX.replace_all(expression.trim(), ".$1");
    let path = DOUBLE_QUOTED_INDEX.replace_all(&path, ".$1");
    BARE_INDEX.replace_all(&path, ".$1").into_owned()
}

/// One entry of the classification table.
#[derive(Debug, Clone)]
pub struct TrustRule {
    pub id: String,
    pub verdict: TrustVerdict,
    pub description: String,
    pattern: Regex,
}

impl TrustRule {
    pub fn new(id: &str, pattern: &str, verdict: TrustVerdict, description: &str) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|source| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            id: id.to_string(),
            verdict,
            description: description.to_string(),
            pattern: compiled,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Compile the built-in untrusted and trusted tables.
pub fn builtin_rules() -> Result<Vec<TrustRule>> {
    let untrusted = UNTRUSTED_RULES
        .iter()
        .map(|(id, pattern, desc)| TrustRule::new(id, pattern, TrustVerdict::Untrusted, desc));
    let trusted = TRUSTED_RULES
        .iter()
        .map(|(id, pattern, desc)| TrustRule::new(id, pattern, TrustVerdict::Trusted, desc));
    untrusted.chain(trusted).collect()
}

/// Table-driven classifier. Read-only after construction and safe to share
/// across threads by reference.
#[derive(Debug, Clone)]
pub struct TrustClassifier {
    rules: Vec<TrustRule>,
}

impl TrustClassifier {
    /// Build a classifier. Untrusted rules are moved ahead of all other rules
    /// (keeping their relative order), so they win any conflict.
    pub fn new(mut rules: Vec<TrustRule>) -> Self {
        rules.sort_by_key(|r| r.verdict != TrustVerdict::Untrusted);
        Self { rules }
    }

    /// The process-wide classifier over the built-in tables.
    pub fn shared() -> &'static TrustClassifier {
        &SHARED
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[TrustRule] {
        &self.rules
    }

    pub fn classify(&self, expression: &str) -> TrustVerdict {
        self.classify_with_rule(expression).0
    }

    /// Classify and return the first rule that matched, if any.
    pub fn classify_with_rule(&self, expression: &str) -> (TrustVerdict, Option<&TrustRule>) {
        let path = normalize_path(expression);
        match self.rules.iter().find(|rule| rule.is_match(&path)) {
            Some(rule) => (rule.verdict, Some(rule)),
            None => (TrustVerdict::Unrecognized, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(expr: &str) -> TrustVerdict {
        TrustClassifier::shared().classify(expr)
    }

    #[test]
    fn test_builtin_rules_compile() {
        let rules = builtin_rules().unwrap();
        assert_eq!(rules.len(), UNTRUSTED_RULES.len() + TRUSTED_RULES.len());
    }

    #[test]
    fn test_attacker_controlled_paths_are_untrusted() {
        for expr in [
            "github.event.issue.title",
            "github.event.issue.body",
            "github.event.pull_request.title",
            "github.event.pull_request.body",
            "github.event.pull_request.head.ref",
            "github.event.comment.body",
            "github.event.review.body",
            "github.event.review_comment.body",
            "github.event.discussion.title",
            "github.event.discussion.body",
            "github.event.head_commit.message",
            "github.event.head_commit.author.email",
            "github.event.workflow_run.head_branch",
            "github.head_ref",
        ] {
            assert_eq!(classify(expr), TrustVerdict::Untrusted, "{expr}");
        }
    }

    #[test]
    fn test_commit_messages_with_arbitrary_segments() {
        for expr in [
            "github.event.commits.0.message",
            "github.event.commits.*.message",
            "github.event.commits[0].message",
            "github.event.commits[*].message",
            "github.event.commits.arbitrary.data.message",
            "github.event.commits[0].author.name",
            "github.event.pages[0].page_name",
        ] {
            assert_eq!(classify(expr), TrustVerdict::Untrusted, "{expr}");
        }
    }

    #[test]
    fn test_runner_controlled_paths_are_trusted() {
        for expr in [
            "secrets.TOKEN",
            "github.workspace",
            "github.sha",
            "github.token",
            "github.event.pull_request.number",
            "runner.os",
            "env.NODE_VERSION",
            "vars.REGISTRY",
            "matrix.node",
            "matrix.config.os",
            "steps.build.outputs.version",
            "steps.build.outcome",
            "needs.setup.outputs.cache-key",
            "job.status",
            "true",
            "42",
            "'literal'",
        ] {
            assert_eq!(classify(expr), TrustVerdict::Trusted, "{expr}");
        }
    }

    #[test]
    fn test_unknown_paths_are_unrecognized() {
        for expr in [
            "inputs.tag",
            "github.ref_name",
            "github.event.label.name",
            "format('{0}-{1}', github.sha, matrix.os)",
            "githubnodotevent.commits.arbitrary.data.message",
        ] {
            assert_eq!(classify(expr), TrustVerdict::Unrecognized, "{expr}");
        }
    }

    #[test]
    fn test_whole_event_objects_are_untrusted() {
        for expr in [
            "toJSON(github.event)",
            "github.event",
            "github.event.issue",
            "toJSON(github.event.pull_request)",
            "toJson(github.event.commits)",
            "github.event.pull_request.head.repo.full_name",
            "github.event['issue']",
        ] {
            assert_eq!(classify(expr), TrustVerdict::Untrusted, "{expr}");
        }
        // Scalar fields of the same objects keep their own verdicts.
        assert_eq!(classify("github.event.issue.number"), TrustVerdict::Trusted);
        assert_eq!(classify("github.event_name"), TrustVerdict::Trusted);
        assert_eq!(classify("github.event.label.name"), TrustVerdict::Unrecognized);
        assert_eq!(classify("toJSON(github.event.label)"), TrustVerdict::Unrecognized);
    }

    #[test]
    fn test_untrusted_wins_inside_compound_expressions() {
        assert_eq!(
            classify("github.event.issue.title || secrets.FALLBACK"),
            TrustVerdict::Untrusted
        );
        assert_eq!(
            classify("format('{0}', github.event.pull_request.body)"),
            TrustVerdict::Untrusted
        );
        assert_eq!(classify("GitHub.Event.Issue.Title"), TrustVerdict::Untrusted);
    }

    #[test]
    fn test_untrusted_precedence_over_conflicting_trusted_rule() {
        // A permissive trusted rule listed first still loses.
        let rules = vec![
            TrustRule::new("allow-all", r"^github\..*$", TrustVerdict::Trusted, "everything").unwrap(),
            TrustRule::new("issue", r"\bgithub\.event\.issue\.title\b", TrustVerdict::Untrusted, "title")
                .unwrap(),
        ];
        let classifier = TrustClassifier::new(rules);
        assert_eq!(classifier.rules()[0].id, "issue");
        assert_eq!(classifier.classify("github.event.issue.title"), TrustVerdict::Untrusted);
        assert_eq!(classifier.classify("github.sha"), TrustVerdict::Trusted);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = TrustClassifier::shared();
        for expr in ["github.event.issue.title", "secrets.X", "inputs.y"] {
            let first = classifier.classify(expr);
            for _ in 0..10 {
                assert_eq!(classifier.classify(expr), first);
            }
        }
    }

    #[test]
    fn test_classify_with_rule_reports_match() {
        let (verdict, rule) = TrustClassifier::shared().classify_with_rule("github.event.commits.0.message");
        assert_eq!(verdict, TrustVerdict::Untrusted);
        assert_eq!(rule.map(|r| r.id.as_str()), Some("SG-U06"));

        let (verdict, rule) = TrustClassifier::shared().classify_with_rule("inputs.tag");
        assert_eq!(verdict, TrustVerdict::Unrecognized);
        assert!(rule.is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(" github.event.commits[0].message "), "github.event.commits.0.message");
        assert_eq!(normalize_path("github.event.issue['title']"), "github.event.issue.title");
        assert_eq!(normalize_path(r#"github.event["issue"].body"#), "github.event.issue.body");
        assert_eq!(normalize_path("github.sha"), "github.sha");
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = TrustRule::new("bad", "(unclosed", TrustVerdict::Trusted, "bad").unwrap_err();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }
}
