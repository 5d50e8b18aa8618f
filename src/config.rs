use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Runtime configuration, built once at startup and passed to every
/// collaborator. There is no ambient global state; everything that talks
/// to the API receives this object.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// GitHub API base URL, without trailing slash
    pub api_url: String,
    /// Bearer credential from the GITHUB_TOKEN environment variable
    pub token: String,
    /// Number of repositories checked concurrently (1 = sequential)
    pub jobs: usize,
}

/// Optional on-disk settings, read from {config_dir}/gh-audit/config.toml
/// when present. The file is never written by the tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub jobs: Option<usize>,
}

impl FileConfig {
    /// Loads the config file if it exists, otherwise returns defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(FileConfig::default()),
            },
        };

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: FileConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(FileConfig::default())
        }
    }

    /// Default location: {config_dir}/gh-audit/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gh-audit").join("config.toml"))
    }
}

impl AuditConfig {
    /// Resolves the effective configuration. CLI values override the config
    /// file, which overrides built-in defaults. The token comes only from
    /// the environment; its absence is fatal before any network activity.
    pub fn resolve(
        api_url: Option<String>,
        jobs: Option<usize>,
        token: Option<String>,
    ) -> Result<Self> {
        let file = FileConfig::load(None)?;
        Self::from_parts(api_url, jobs, token, file)
    }

    /// Same as `resolve`, with the file layer supplied by the caller.
    /// Tests use this to avoid touching the real config directory.
    pub fn from_parts(
        api_url: Option<String>,
        jobs: Option<usize>,
        token: Option<String>,
        file: FileConfig,
    ) -> Result<Self> {
        let token = match token {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                return Err(anyhow!(
                    "GitHub token not set in environment variables.\n\
                     Please set the GITHUB_TOKEN variable before running, e.g.:\n\
                     export GITHUB_TOKEN='your_token_here'"
                ))
            }
        };

        let api_url = api_url
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let jobs = jobs.or(file.jobs).unwrap_or(1).max(1);

        Ok(AuditConfig {
            api_url,
            token,
            jobs,
        })
    }
}
