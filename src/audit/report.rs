use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{context, Environment};
use serde::Serialize;

use crate::audit::audit::AuditResult;
use crate::github::TargetKind;

const REPORT_TEMPLATE: &str = include_str!("../../templates/report.html");

/// One rendered table row, ready for the template
#[derive(Debug, Serialize)]
struct Row {
    repository: String,
    check: String,
    status: &'static str,
    passed: bool,
    observed: String,
    expected: &'static str,
}

/// HTML report generator. A pure projection of the audit result into a
/// single self-contained artifact; nothing here reinterprets findings.
pub struct AuditReport;

impl AuditReport {
    /// The artifact name is derived only from the target, so repeated
    /// runs against the same account overwrite the same file.
    pub fn file_name(target_name: &str) -> String {
        format!("{}_audit_report.html", target_name)
    }

    /// Renders the full HTML document
    pub fn generate_html(result: &AuditResult) -> Result<String> {
        let rows: Vec<Row> = result
            .findings()
            .into_iter()
            .map(|f| Row {
                repository: f.repository,
                check: f.check.to_string(),
                status: if f.passed { "Correct" } else { "Incorrect" },
                passed: f.passed,
                observed: f.observed,
                expected: f.expected,
            })
            .collect();

        let repo_names: Vec<&str> = result.repos.iter().map(|r| r.name.as_str()).collect();
        let target_kind = match result.target.kind {
            TargetKind::Organization => "Organization",
            TargetKind::User => "User",
        };

        let mut env = Environment::new();
        env.add_template("report.html", REPORT_TEMPLATE)
            .context("invalid report template")?;
        let template = env.get_template("report.html")?;

        let html = template
            .render(context! {
                target => result.target.name,
                target_kind => target_kind,
                generated_at => chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                repo_count => result.repos.len(),
                member_count => result.members.len(),
                owner_count => result.code_owners.len(),
                failed_count => rows.iter().filter(|r| !r.passed).count(),
                repos => repo_names,
                members => result.members,
                code_owners => result.code_owners,
                rows => rows,
            })
            .context("failed to render report")?;

        Ok(html)
    }

    /// Writes the artifact into `dir` and returns its path
    pub fn write(result: &AuditResult, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(Self::file_name(&result.target.name));
        let html = Self::generate_html(result)?;
        fs::write(&path, html)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(path)
    }
}
