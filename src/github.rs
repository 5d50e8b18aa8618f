use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AuditConfig;

/// Error surface of the GitHub REST client. Identity and collection
/// callers propagate these as run-fatal; the per-repository checker
/// catches them and degrades to finding states.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("not found")]
    NotFound,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Organization,
    User,
}

/// The audited account. Resolved once per run; immutable thereafter.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
}

impl Target {
    pub fn is_organization(&self) -> bool {
        self.kind == TargetKind::Organization
    }
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(rename = "type")]
    account_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoDetails {
    pub default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    content: Option<String>,
}

/// Branch protection settings as returned by the API. Absent sub-objects
/// mean the corresponding rule is disabled.
#[derive(Debug, Default, Deserialize)]
pub struct ProtectionPayload {
    pub required_pull_request_reviews: Option<PullRequestReviews>,
    pub required_signatures: Option<EnabledFlag>,
    pub enforce_admins: Option<EnabledFlag>,
    pub allow_force_pushes: Option<EnabledFlag>,
    pub allow_deletions: Option<EnabledFlag>,
    pub required_conversation_resolution: Option<EnabledFlag>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PullRequestReviews {
    pub required_approving_review_count: Option<u32>,
    pub dismiss_stale_reviews: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnabledFlag {
    #[serde(default)]
    pub enabled: bool,
}

/// Thin client over the GitHub REST API. Holds the single reqwest client
/// and the resolved configuration; no other module builds URLs or headers.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(config: &AuditConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", config.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(concat!("gh-audit/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(GitHubClient {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// GET with the shared status mapping: 403 is permission denial and
    /// 404 is its own state; everything else non-2xx is an opaque status.
    async fn get(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::FORBIDDEN => Err(ApiError::PermissionDenied),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            s => Err(ApiError::Status(s.as_u16())),
        }
    }

    /// Collects a paginated listing by following Link rel="next" headers
    /// until exhausted. All-or-nothing: an error on any page is the
    /// error of the whole collection.
    async fn collect_pages<T: DeserializeOwned>(&self, first: String) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut url = Some(first);

        while let Some(current) = url {
            let response = self.get(&current).await?;
            url = next_page_url(response.headers());
            let page: Vec<T> = response.json().await?;
            items.extend(page);
        }

        Ok(items)
    }

    /// Determines whether the target name is an organization or an
    /// individual account.
    pub async fn resolve_target(&self, name: &str) -> Result<Target, ApiError> {
        let url = format!("{}/users/{}", self.api_url, name);
        let account: Account = self.get(&url).await?.json().await?;

        let kind = if account.account_type == "Organization" {
            TargetKind::Organization
        } else {
            TargetKind::User
        };

        Ok(Target {
            name: name.to_string(),
            kind,
        })
    }

    /// Lists organization members, optionally filtered by role
    pub async fn org_members(
        &self,
        org: &str,
        role: Option<&str>,
    ) -> Result<Vec<Member>, ApiError> {
        let url = match role {
            Some(role) => format!("{}/orgs/{}/members?role={}", self.api_url, org, role),
            None => format!("{}/orgs/{}/members", self.api_url, org),
        };
        self.collect_pages(url).await
    }

    /// Lists all repositories owned by the target. Organizations and
    /// users use different listing endpoints.
    pub async fn repositories(&self, target: &Target) -> Result<Vec<Repo>, ApiError> {
        let url = if target.is_organization() {
            format!("{}/orgs/{}/repos", self.api_url, target.name)
        } else {
            format!("{}/users/{}/repos", self.api_url, target.name)
        };
        self.collect_pages(url).await
    }

    /// Fetches repository metadata (used for the default branch)
    pub async fn repo_details(&self, owner: &str, repo: &str) -> Result<RepoDetails, ApiError> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, repo);
        Ok(self.get(&url).await?.json().await?)
    }

    /// Fetches a file's decoded content at the given ref. `Ok(None)`
    /// means the path does not exist on that branch.
    pub async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Option<String>, ApiError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url, owner, repo, path, reference
        );

        let response = match self.get(&url).await {
            Ok(r) => r,
            Err(ApiError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let file: ContentFile = response.json().await?;
        let decoded = match file.content {
            Some(encoded) => decode_content(&encoded)?,
            None => String::new(),
        };
        Ok(Some(decoded))
    }

    /// Fetches branch protection settings. `Ok(None)` means the branch
    /// has no protection rule configured, which is a valid state rather
    /// than an error.
    pub async fn branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<ProtectionPayload>, ApiError> {
        let url = format!(
            "{}/repos/{}/{}/branches/{}/protection",
            self.api_url, owner, repo, branch
        );

        match self.get(&url).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Extracts the rel="next" URL from a Link response header
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(value)
}

pub(crate) fn parse_next_link(value: &str) -> Option<String> {
    for part in value.split(',') {
        let mut pieces = part.split(';');
        let url_piece = match pieces.next() {
            Some(p) => p.trim(),
            None => continue,
        };
        if !pieces.any(|p| p.trim() == "rel=\"next\"") {
            continue;
        }
        if let Some(url) = url_piece
            .strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
        {
            return Some(url.to_string());
        }
    }
    None
}

/// Decodes base64 file content. The API wraps the payload in newlines,
/// so whitespace is stripped before decoding.
pub(crate) fn decode_content(encoded: &str) -> Result<String, ApiError> {
    let compact: String = encoded.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ApiError::Payload(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
