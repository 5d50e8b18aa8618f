use std::fmt;

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;

use crate::audit::checks::{ProtectionStatus, RepoAudit, RepoChecker, Toggle};
use crate::github::{ApiError, GitHubClient, Target};

/// Audit runner: resolves the target, collects members and
/// repositories, fans the per-repository checks out and aggregates
/// everything into one `AuditResult`.
pub struct Audit<'a> {
    client: &'a GitHubClient,
    jobs: usize,
}

impl<'a> Audit<'a> {
    pub fn new(client: &'a GitHubClient, jobs: usize) -> Self {
        Audit {
            client,
            jobs: jobs.max(1),
        }
    }

    /// Runs the complete audit. Identity and collection failures abort
    /// the run; per-repository check failures are captured as finding
    /// states inside the result.
    pub async fn run(
        &self,
        target_name: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<AuditResult> {
        let target = match self.client.resolve_target(target_name).await {
            Ok(target) => target,
            Err(ApiError::PermissionDenied) => {
                return Err(anyhow!("Access to account '{}' denied", target_name));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to resolve account '{}'", target_name)));
            }
        };

        let (members, code_owners) = self.collect_members(&target).await?;

        let repos = self
            .client
            .repositories(&target)
            .await
            .map_err(|e| collection_error("repositories", e))?;

        if let Some(pb) = progress {
            pb.set_length(repos.len() as u64);
        }

        let checker = RepoChecker::new(self.client, &target.name);
        let mut audits: Vec<RepoAudit> = stream::iter(repos.into_iter().map(|repo| {
            let checker = &checker;
            async move {
                let audit = checker.check(&repo.name).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                audit
            }
        }))
        .buffer_unordered(self.jobs)
        .collect()
        .await;

        // Fan-out order carries no meaning; sort so identical runs
        // produce identical reports.
        audits.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(AuditResult {
            target,
            members,
            code_owners,
            repos: audits,
        })
    }

    /// Member and code-owner collection. User targets degrade to the
    /// singleton member list and no code owners.
    async fn collect_members(&self, target: &Target) -> Result<(Vec<String>, Vec<String>)> {
        if !target.is_organization() {
            return Ok((vec![target.name.clone()], Vec::new()));
        }

        let members = self
            .client
            .org_members(&target.name, None)
            .await
            .map_err(|e| collection_error("organization members", e))?
            .into_iter()
            .map(|m| m.login)
            .collect();

        let code_owners = self
            .client
            .org_members(&target.name, Some("admin"))
            .await
            .map_err(|e| collection_error("organization admins", e))?
            .into_iter()
            .map(|m| m.login)
            .collect();

        Ok((members, code_owners))
    }
}

fn collection_error(what: &str, err: ApiError) -> anyhow::Error {
    match err {
        ApiError::PermissionDenied => anyhow!("Access to {} denied", what),
        other => anyhow::Error::new(other).context(format!("Failed to collect {}", what)),
    }
}

/// The aggregated outcome of one run. Built once, consumed once by the
/// report renderer; never mutated afterwards.
#[derive(Debug)]
pub struct AuditResult {
    pub target: Target,
    pub members: Vec<String>,
    pub code_owners: Vec<String>,
    pub repos: Vec<RepoAudit>,
}

impl AuditResult {
    /// Applies the evaluation policy to every repository, producing the
    /// flat union of report rows. Ordering is presentation-only.
    pub fn findings(&self) -> Vec<Finding> {
        self.repos.iter().flat_map(evaluate).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.findings().iter().filter(|f| !f.passed).count()
    }
}

/// The checked attributes. One report row exists per (repository,
/// attribute) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckId {
    PrApprovals,
    SignedCommits,
    EnforceAdmins,
    AllowForcePushes,
    AllowDeletions,
    ConversationResolution,
    Codeowners,
}

impl CheckId {
    /// The protection-derived attributes, in report order
    pub const PROTECTION: [CheckId; 6] = [
        CheckId::PrApprovals,
        CheckId::SignedCommits,
        CheckId::EnforceAdmins,
        CheckId::AllowForcePushes,
        CheckId::AllowDeletions,
        CheckId::ConversationResolution,
    ];

    pub fn expected(self) -> &'static str {
        match self {
            CheckId::PrApprovals => "2+",
            CheckId::SignedCommits
            | CheckId::EnforceAdmins
            | CheckId::ConversationResolution => "Enabled",
            CheckId::AllowForcePushes | CheckId::AllowDeletions => "Disabled",
            CheckId::Codeowners => "Set and Valid",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckId::PrApprovals => "PR Approvals Required",
            CheckId::SignedCommits => "Signed Commits",
            CheckId::EnforceAdmins => "Enforce Admins",
            CheckId::AllowForcePushes => "Allow Force Pushes",
            CheckId::AllowDeletions => "Allow Deletions",
            CheckId::ConversationResolution => "Required Conversation Resolution",
            CheckId::Codeowners => "CODEOWNERS Status",
        };
        write!(f, "{}", name)
    }
}

/// One evaluated report row: observed value, expected value, verdict
#[derive(Debug, Clone)]
pub struct Finding {
    pub repository: String,
    pub check: CheckId,
    pub observed: String,
    pub expected: &'static str,
    pub passed: bool,
}

/// The fixed evaluation policy. Produces exactly seven rows per
/// repository: six protection attributes plus the CODEOWNERS status.
pub fn evaluate(repo: &RepoAudit) -> Vec<Finding> {
    let mut rows = Vec::with_capacity(CheckId::PROTECTION.len() + 1);

    match &repo.protection {
        ProtectionStatus::Configured(rules) => {
            let evaluated = [
                (
                    CheckId::PrApprovals,
                    rules.required_approvals.to_string(),
                    rules.required_approvals >= 2,
                ),
                (
                    CheckId::SignedCommits,
                    rules.signed_commits.to_string(),
                    rules.signed_commits == Toggle::Enabled,
                ),
                (
                    CheckId::EnforceAdmins,
                    rules.enforce_admins.to_string(),
                    rules.enforce_admins == Toggle::Enabled,
                ),
                (
                    CheckId::AllowForcePushes,
                    rules.allow_force_pushes.to_string(),
                    rules.allow_force_pushes == Toggle::Disabled,
                ),
                (
                    CheckId::AllowDeletions,
                    rules.allow_deletions.to_string(),
                    rules.allow_deletions == Toggle::Disabled,
                ),
                (
                    CheckId::ConversationResolution,
                    rules.conversation_resolution.to_string(),
                    rules.conversation_resolution == Toggle::Enabled,
                ),
            ];

            for (check, observed, passed) in evaluated {
                rows.push(Finding {
                    repository: repo.name.clone(),
                    check,
                    observed,
                    expected: check.expected(),
                    passed,
                });
            }
        }
        sentinel => {
            // No protection, denied or failed: every protection row
            // carries the sentinel as its observed value and fails.
            let observed = sentinel.to_string();
            for check in CheckId::PROTECTION {
                rows.push(Finding {
                    repository: repo.name.clone(),
                    check,
                    observed: observed.clone(),
                    expected: check.expected(),
                    passed: false,
                });
            }
        }
    }

    rows.push(Finding {
        repository: repo.name.clone(),
        check: CheckId::Codeowners,
        observed: repo.codeowners.to_string(),
        expected: CheckId::Codeowners.expected(),
        passed: repo.codeowners.passed(),
    });

    rows
}
