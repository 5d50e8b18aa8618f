use base64::{engine::general_purpose::STANDARD, Engine as _};

use gh_audit::config::{AuditConfig, FileConfig};
use gh_audit::github::GitHubClient;

use crate::test_server::TestServer;

/// Configuration pointing at a test server, bypassing the real config
/// directory and environment
pub fn test_config(api_url: &str) -> AuditConfig {
    AuditConfig::from_parts(
        Some(api_url.to_string()),
        Some(1),
        Some("test-token".to_string()),
        FileConfig::default(),
    )
    .unwrap()
}

pub fn test_client(api_url: &str) -> GitHubClient {
    GitHubClient::new(&test_config(api_url)).unwrap()
}

/// A contents-API response body for the given file text, base64-encoded
/// the way the API returns it (wrapped in newlines)
pub fn content_body(text: &str) -> String {
    let mut encoded = STANDARD.encode(text);
    // the real API chunks the payload across lines
    if encoded.len() > 8 {
        encoded.insert(8, '\n');
    }
    format!(
        "{{\"content\": \"{}\", \"encoding\": \"base64\"}}",
        encoded.replace('\n', "\\n")
    )
}

/// Registers the account-type lookup for a target
pub async fn register_account(server: &TestServer, name: &str, kind: &str) {
    server
        .add_json(
            &format!("/users/{}", name),
            &format!("{{\"login\": \"{}\", \"type\": \"{}\"}}", name, kind),
        )
        .await;
}

fn login_list(logins: &[&str]) -> String {
    let entries: Vec<String> = logins
        .iter()
        .map(|l| format!("{{\"login\": \"{}\"}}", l))
        .collect();
    format!("[{}]", entries.join(", "))
}

fn repo_list(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|n| format!("{{\"name\": \"{}\"}}", n))
        .collect();
    format!("[{}]", entries.join(", "))
}

/// Registers a complete organization: account type, member and admin
/// listings, the repository listing, and per-repo metadata with "main"
/// as the default branch.
pub async fn register_org(
    server: &TestServer,
    org: &str,
    repos: &[&str],
    members: &[&str],
    admins: &[&str],
) {
    register_account(server, org, "Organization").await;
    server
        .add_json(&format!("/orgs/{}/members", org), &login_list(members))
        .await;
    server
        .add_json(
            &format!("/orgs/{}/members?role=admin", org),
            &login_list(admins),
        )
        .await;
    server
        .add_json(&format!("/orgs/{}/repos", org), &repo_list(repos))
        .await;

    for repo in repos {
        server
            .add_json(
                &format!("/repos/{}/{}", org, repo),
                "{\"default_branch\": \"main\"}",
            )
            .await;
    }
}
