use std::path::Path;

use clap::CommandFactory;

use gh_audit::audit::{Audit, AuditReport, AuditResult, CheckId};
use gh_audit::cli;
use gh_audit::config::AuditConfig;
use gh_audit::github::GitHubClient;
use gh_audit::output::Output;

#[tokio::main]
async fn main() {
    // Initialize output system
    Output::init();

    // Check for completion generation request
    if let Ok(shell) = std::env::var("GH_AUDIT_GENERATE_COMPLETIONS") {
        let mut app = cli::Cli::command();
        cli::generate_completions(&shell, &mut app);
        return;
    }

    let opts = cli::parse();

    if let Err(e) = run(opts).await {
        Output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(opts: cli::Cli) -> anyhow::Result<()> {
    // Configuration is resolved before any network activity; a missing
    // token never gets as far as building a client.
    let config = AuditConfig::resolve(
        opts.api_url.clone(),
        opts.jobs,
        std::env::var("GITHUB_TOKEN").ok(),
    )?;

    let client = GitHubClient::new(&config)?;
    cmd_audit(&client, &config, &opts.target, opts.verbose).await
}

async fn cmd_audit(
    client: &GitHubClient,
    config: &AuditConfig,
    target: &str,
    verbose: bool,
) -> anyhow::Result<()> {
    if verbose {
        Output::info(&format!("Auditing {} via {}", target, config.api_url));
    }

    let audit = Audit::new(client, config.jobs);
    let pb = Output::progress_bar(0);
    let result = audit.run(target, Some(&pb)).await?;
    pb.finish_and_clear();

    let report_path = AuditReport::write(&result, Path::new("."))?;

    print_summary(&result, verbose);
    Output::success(&format!("HTML report saved to {}", report_path.display()));

    Ok(())
}

fn print_summary(result: &AuditResult, verbose: bool) {
    Output::heading(&format!("{} GitHub Audit", result.target.name));
    Output::info(&format!(
        "{} repositories, {} members, {} code owners",
        result.repos.len(),
        result.members.len(),
        result.code_owners.len()
    ));

    let findings = result.findings();

    if verbose {
        for repo in &result.repos {
            Output::heading(&repo.name);
            for finding in findings.iter().filter(|f| f.repository == repo.name) {
                let mark = if finding.passed { "✓" } else { "✗" };
                Output::list_item(&format!(
                    "{} {}: {} (expected {})",
                    mark, finding.check, finding.observed, finding.expected
                ));
            }
        }
    }

    let rows: Vec<(&str, String, String)> = result
        .repos
        .iter()
        .map(|repo| {
            let failed = findings
                .iter()
                .filter(|f| f.repository == repo.name && !f.passed)
                .count();
            (
                repo.name.as_str(),
                format!("{}/{}", failed, CheckId::PROTECTION.len() + 1),
                repo.codeowners.to_string(),
            )
        })
        .collect();
    Output::repo_table(&rows);

    let failed = findings.iter().filter(|f| !f.passed).count();
    if failed == 0 {
        Output::success("All checks passed");
    } else {
        Output::warning(&format!("{} failing check(s)", failed));
    }
}
