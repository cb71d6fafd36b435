use crate::assessment::ControlResult;
use crate::report::{recommendation, RepositoryReport, ScanReport, Severity};
use crate::security::injection::Finding;
use serde_json::json;

const INJECTION_RULE: &str = "SG001";
const REVIEW_RULE: &str = "SG002";

/// Generate a SARIF 2.1.0 log from a repository report.
/// SARIF (Static Analysis Results Interchange Format) is consumed by
/// GitHub Code Scanning, VS Code, and other tools.
pub fn to_sarif(report: &RepositoryReport) -> serde_json::Value {
    let results: Vec<serde_json::Value> = report
        .scanned()
        .flat_map(|scan| {
            let injections = scan
                .result
                .findings
                .iter()
                .map(move |f| sarif_result(INJECTION_RULE, scan.severity, f, scan));
            let reviews = scan
                .result
                .needs_review
                .iter()
                .map(move |f| sarif_result(REVIEW_RULE, scan.review_severity(), f, scan));
            injections.chain(reviews)
        })
        .collect();

    let notifications: Vec<serde_json::Value> = report
        .files
        .iter()
        .filter(|f| f.outcome().result == ControlResult::NeedsReview)
        .map(|f| {
            json!({
                "level": "warning",
                "message": { "text": f.outcome().message.clone() },
            })
        })
        .collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "scriptguard",
                    "version": env!("CARGO_PKG_VERSION"),
                    "informationUri": "https://github.com/scriptguard/scriptguard",
                    "rules": [
                        sarif_rule(
                            INJECTION_RULE,
                            "ScriptInjection",
                            "Untrusted input interpolated into a run script",
                            "Attacker-controlled context (issue titles, comment bodies, commit messages, \
                             branch names) is substituted into the script before the shell runs it, \
                             so it can inject commands.",
                            "error",
                        ),
                        sarif_rule(
                            REVIEW_RULE,
                            "UnrecognizedExpression",
                            "Expression with an unrecognized data source",
                            "The expression matches neither the trusted nor the untrusted table. \
                             Review whether its value can be influenced from outside the repository.",
                            "note",
                        ),
                    ],
                }
            },
            "results": results,
            "invocations": [{
                "executionSuccessful": true,
                "toolExecutionNotifications": notifications,
            }]
        }]
    })
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Info => "note",
    }
}

fn sarif_rule(id: &str, name: &str, short: &str, full: &str, default_level: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "shortDescription": { "text": short },
        "fullDescription": { "text": full },
        "helpUri": "https://securitylab.github.com/research/github-actions-untrusted-input/",
        "defaultConfiguration": { "level": default_level },
    })
}

fn sarif_result(rule_id: &str, severity: Severity, finding: &Finding, scan: &ScanReport) -> serde_json::Value {
    let text = if rule_id == INJECTION_RULE {
        format!(
            "`{}` is interpolated into the script of {}.\n\nRecommendation: {}",
            finding.expression,
            finding.location(),
            recommendation(finding)
        )
    } else {
        format!(
            "`{}` in {} has an unrecognized data source; review it manually.",
            finding.expression,
            finding.location()
        )
    };

    json!({
        "ruleId": rule_id,
        "level": level(severity),
        "message": { "text": text },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": { "uri": scan.source_file.clone() },
                "region": { "startLine": 1 },
            },
            "logicalLocations": [{
                "fullyQualifiedName": format!("jobs.{}", finding.location()),
                "kind": "member",
            }],
        }],
        "properties": {
            "severity": severity.symbol(),
            "expression": finding.expression.clone(),
            "scriptLine": finding.line,
            "scriptColumn": finding.column,
            "trustRule": finding.rule_id.clone(),
        }
    })
}
