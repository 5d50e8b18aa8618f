use std::fmt;

use crate::github::{ApiError, EnabledFlag, GitHubClient, ProtectionPayload};

/// Candidate CODEOWNERS locations, probed in order at the default
/// branch ref. The first decisive outcome wins.
pub const CODEOWNERS_LOCATIONS: [&str; 3] = [".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

const FALLBACK_BRANCH: &str = "main";

/// Classification of a repository's CODEOWNERS file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeownersStatus {
    /// Present with non-whitespace content
    Valid,
    /// Present but empty after trimming
    Empty,
    /// No candidate location has the file
    Missing,
    PermissionDenied,
    /// The probe hit an unexpected response; carries the failing
    /// location and branch
    Error(String),
}

impl CodeownersStatus {
    pub fn passed(&self) -> bool {
        matches!(self, CodeownersStatus::Valid)
    }
}

impl fmt::Display for CodeownersStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeownersStatus::Valid => write!(f, "Set and Valid"),
            CodeownersStatus::Empty => write!(f, "Set but Invalid (Empty)"),
            CodeownersStatus::Missing => write!(f, "Not Set (File Missing)"),
            CodeownersStatus::PermissionDenied => write!(f, "Permission Denied"),
            CodeownersStatus::Error(detail) => write!(f, "{}", detail),
        }
    }
}

/// A two-state branch protection setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Enabled,
    Disabled,
}

impl Toggle {
    /// Absent sub-objects in the protection payload mean disabled
    fn from_flag(flag: Option<&EnabledFlag>) -> Toggle {
        if flag.map(|f| f.enabled).unwrap_or(false) {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Enabled => write!(f, "Enabled"),
            Toggle::Disabled => write!(f, "Disabled"),
        }
    }
}

/// The named branch protection settings, extracted from a configured
/// protection rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionRules {
    pub required_approvals: u32,
    pub dismiss_stale_reviews: Toggle,
    pub signed_commits: Toggle,
    pub enforce_admins: Toggle,
    pub allow_force_pushes: Toggle,
    pub allow_deletions: Toggle,
    pub conversation_resolution: Toggle,
}

impl From<ProtectionPayload> for ProtectionRules {
    fn from(payload: ProtectionPayload) -> Self {
        let reviews = payload.required_pull_request_reviews.unwrap_or_default();

        ProtectionRules {
            required_approvals: reviews.required_approving_review_count.unwrap_or(0),
            dismiss_stale_reviews: if reviews.dismiss_stale_reviews.unwrap_or(false) {
                Toggle::Enabled
            } else {
                Toggle::Disabled
            },
            signed_commits: Toggle::from_flag(payload.required_signatures.as_ref()),
            enforce_admins: Toggle::from_flag(payload.enforce_admins.as_ref()),
            allow_force_pushes: Toggle::from_flag(payload.allow_force_pushes.as_ref()),
            allow_deletions: Toggle::from_flag(payload.allow_deletions.as_ref()),
            conversation_resolution: Toggle::from_flag(
                payload.required_conversation_resolution.as_ref(),
            ),
        }
    }
}

/// Branch protection state of a repository's default branch. A branch
/// with no protection rule is a valid terminal state, distinct from a
/// denied or failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionStatus {
    Configured(ProtectionRules),
    NotConfigured,
    PermissionDenied,
    /// Carries the status code or transport detail of the failed check
    Error(String),
}

impl fmt::Display for ProtectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionStatus::Configured(_) => write!(f, "Configured"),
            ProtectionStatus::NotConfigured => write!(f, "No Protection"),
            ProtectionStatus::PermissionDenied => write!(f, "Permission Denied"),
            ProtectionStatus::Error(detail) => write!(f, "Error Checking Protection ({})", detail),
        }
    }
}

/// One repository's findings. Always present for every repository in a
/// run, even when the underlying checks fail.
#[derive(Debug, Clone)]
pub struct RepoAudit {
    pub name: String,
    pub default_branch: String,
    pub codeowners: CodeownersStatus,
    pub protection: ProtectionStatus,
}

/// Runs both sub-checks against a single repository
pub struct RepoChecker<'a> {
    client: &'a GitHubClient,
    owner: &'a str,
}

impl<'a> RepoChecker<'a> {
    pub fn new(client: &'a GitHubClient, owner: &'a str) -> Self {
        RepoChecker { client, owner }
    }

    /// Resolves the default branch, then evaluates CODEOWNERS and branch
    /// protection against it. Check failures become finding states; this
    /// never aborts the run.
    pub async fn check(&self, repo: &str) -> RepoAudit {
        let branch = match self.client.repo_details(self.owner, repo).await {
            Ok(details) => details
                .default_branch
                .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
            Err(ApiError::PermissionDenied) => {
                return RepoAudit {
                    name: repo.to_string(),
                    default_branch: FALLBACK_BRANCH.to_string(),
                    codeowners: CodeownersStatus::PermissionDenied,
                    protection: ProtectionStatus::PermissionDenied,
                };
            }
            Err(e) => {
                let detail = error_detail(&e);
                return RepoAudit {
                    name: repo.to_string(),
                    default_branch: FALLBACK_BRANCH.to_string(),
                    codeowners: CodeownersStatus::Error(format!(
                        "Error Resolving Default Branch ({})",
                        detail
                    )),
                    protection: ProtectionStatus::Error(detail),
                };
            }
        };

        let codeowners = self.check_codeowners(repo, &branch).await;
        let protection = self.check_protection(repo, &branch).await;

        RepoAudit {
            name: repo.to_string(),
            default_branch: branch,
            codeowners,
            protection,
        }
    }

    /// Probes the candidate locations in order. Content, emptiness,
    /// permission denial and unexpected responses are all decisive:
    /// probing stops at the first, it never falls through to the next
    /// candidate after an error.
    async fn check_codeowners(&self, repo: &str, branch: &str) -> CodeownersStatus {
        for location in CODEOWNERS_LOCATIONS {
            match self
                .client
                .file_content(self.owner, repo, location, branch)
                .await
            {
                Ok(Some(content)) => return classify_codeowners_content(&content),
                Ok(None) => continue,
                Err(ApiError::PermissionDenied) => return CodeownersStatus::PermissionDenied,
                Err(_) => {
                    return CodeownersStatus::Error(format!(
                        "Error Checking {} for {} branch",
                        location, branch
                    ));
                }
            }
        }
        CodeownersStatus::Missing
    }

    async fn check_protection(&self, repo: &str, branch: &str) -> ProtectionStatus {
        match self.client.branch_protection(self.owner, repo, branch).await {
            Ok(Some(payload)) => ProtectionStatus::Configured(ProtectionRules::from(payload)),
            Ok(None) => ProtectionStatus::NotConfigured,
            Err(ApiError::PermissionDenied) => ProtectionStatus::PermissionDenied,
            Err(e) => ProtectionStatus::Error(error_detail(&e)),
        }
    }
}

fn error_detail(err: &ApiError) -> String {
    match err {
        ApiError::Status(code) => code.to_string(),
        other => other.to_string(),
    }
}

/// Classifies decoded CODEOWNERS content. Pure, so re-running against
/// identical content always yields the same answer.
pub(crate) fn classify_codeowners_content(content: &str) -> CodeownersStatus {
    if content.trim().is_empty() {
        CodeownersStatus::Empty
    } else {
        CodeownersStatus::Valid
    }
}
