use colored::*;
use scriptguard_core::assessment::{ControlOutcome, ControlResult};
use scriptguard_core::parser::document::PipelineDocument;
use scriptguard_core::report::{recommendation, FileReport, RepositoryReport, ScanReport, Severity};
use scriptguard_core::security::injection::Finding;
use scriptguard_core::security::trust::{TrustClassifier, TrustVerdict};

/// Print a full repository scan to the terminal.
pub fn print_repository_report(report: &RepositoryReport) {
    println!();
    println!(
        "{}",
        format!(
            " scriptguard v{}: {} workflow file(s)",
            env!("CARGO_PKG_VERSION"),
            report.files.len()
        )
        .bold()
    );
    println!();

    for file in &report.files {
        match file {
            FileReport::Scanned(scan) => print_scan_report(scan),
            FileReport::Unparseable { source_file, error, .. } => {
                println!(" {} {}", outcome_tag(ControlResult::NeedsReview), source_file.bold());
                println!("   {} Could not be analyzed: {}", "|".dimmed(), error);
                println!();
            }
        }
    }

    println!(" {}", "=".repeat(60).dimmed());
    println!();
    println!(" {}", "Summary".bold().underline());
    println!(
        " {} Untrusted expressions:   {}",
        "|-".dimmed(),
        count_colored(report.untrusted_count(), "red")
    );
    println!(
        " {} Needs manual review:     {}",
        "|-".dimmed(),
        count_colored(report.review_count(), "yellow")
    );
    println!(
        " {} Unparseable files:       {}",
        "|-".dimmed(),
        count_colored(report.unparseable_count(), "yellow")
    );
    print_outcome(&report.outcome);
    println!();
}

fn print_scan_report(scan: &ScanReport) {
    println!(
        " {} {} ({})",
        outcome_tag(scan.outcome.result),
        scan.source_file.bold(),
        scan.pipeline_name.cyan()
    );
    println!(
        "   {} {} jobs, {} steps, {} scripts, {} expressions",
        "|".dimmed(),
        scan.job_count,
        scan.step_count,
        scan.result.scripts_scanned,
        scan.result.expressions_scanned
    );
    if !scan.triggers.is_empty() {
        println!("   {} Triggers: {}", "|".dimmed(), scan.triggers.join(", "));
    }
    println!();

    for finding in &scan.result.findings {
        print_finding(finding, scan.severity);
        println!();
    }
    for finding in &scan.result.needs_review {
        print_review(finding, scan.review_severity());
    }
    if !scan.result.needs_review.is_empty() {
        println!();
    }
}

fn print_finding(finding: &Finding, severity: Severity) {
    println!(
        "   {} {}",
        severity_tag(severity),
        format!("Script injection via {}", finding.expression).bold()
    );
    println!(
        "     {} {} (script line {}, column {}){}",
        "|".dimmed(),
        finding.location(),
        finding.line,
        finding.column,
        finding
            .step_name
            .as_deref()
            .map(|n| format!(", step '{}'", n))
            .unwrap_or_default()
    );
    for line in recommendation(finding).lines() {
        println!("     {} {}", "|".dimmed(), line.dimmed());
    }
}

fn print_review(finding: &Finding, severity: Severity) {
    println!(
        "   {} {} at {} (unrecognized source, review manually)",
        severity_tag(severity),
        finding.expression,
        finding.location()
    );
}

fn print_outcome(outcome: &ControlOutcome) {
    println!(" {} Result: {}", "|-".dimmed(), outcome_tag(outcome.result));
    println!(" {} {}", "|-".dimmed(), outcome.message);
}

fn severity_tag(severity: Severity) -> String {
    let label = format!(" {} ", severity.symbol());
    match severity {
        Severity::Critical => label.on_red().white().bold().to_string(),
        Severity::High => label.on_yellow().black().bold().to_string(),
        Severity::Medium => label.on_blue().white().bold().to_string(),
        Severity::Info => label.dimmed().to_string(),
    }
}

fn outcome_tag(result: ControlResult) -> String {
    let label = format!("[{}]", result.symbol());
    match result {
        ControlResult::Passed => label.green().bold().to_string(),
        ControlResult::Failed => label.red().bold().to_string(),
        ControlResult::NeedsReview => label.yellow().bold().to_string(),
    }
}

fn verdict_tag(verdict: TrustVerdict) -> String {
    let label = format!("{:<12}", verdict.label());
    match verdict {
        TrustVerdict::Trusted => label.green().to_string(),
        TrustVerdict::Untrusted => label.red().bold().to_string(),
        TrustVerdict::Unrecognized => label.yellow().to_string(),
    }
}

fn count_colored(count: usize, color: &str) -> String {
    if count > 0 {
        count.to_string().color(color).bold().to_string()
    } else {
        "0".to_string()
    }
}

/// Print every expression of one document with its verdict.
pub fn print_expressions(doc: &PipelineDocument, findings: &[Finding]) {
    println!();
    println!("{}", format!(" Expressions in {}", doc.source_file).bold());
    println!();

    if findings.is_empty() {
        println!(" {} No templated expressions in run scripts.", "OK".green().bold());
        println!();
        return;
    }

    for finding in findings {
        println!(
            " {} {:<24} {} {}",
            verdict_tag(finding.verdict),
            format!("{}:{}:{}", finding.location(), finding.line, finding.column),
            finding.expression,
            finding
                .rule_id
                .as_deref()
                .map(|id| format!("[{}]", id).dimmed().to_string())
                .unwrap_or_default()
        );
    }
    println!();
}

/// Print the trust table in evaluation order.
pub fn print_rules(classifier: &TrustClassifier) {
    println!();
    println!("{}", " Trust rules (evaluated top to bottom, first match wins)".bold());
    println!();
    for rule in classifier.rules() {
        println!(
            " {} {:<10} {}",
            verdict_tag(rule.verdict),
            rule.id,
            rule.description
        );
        println!("   {} {}", "|".dimmed(), rule.pattern().dimmed());
    }
    println!();
}
