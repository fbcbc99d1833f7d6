//! Configuration management.
//!
//! Values are layered, highest priority first:
//! 1. Command-line flag
//! 2. Environment variable (clap reads both into the same field)
//! 3. Config file, `~/.shadowsync/config.json` (or `$SHADOWSYNC_CONFIG`)
//! 4. Built-in default
//!
//! The core never reads the environment. Commands resolve everything here
//! into [`BitbucketConfig`], [`AzureConfig`] and [`GitHubConfig`] and hand
//! those to the pullers and the shadow repository.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::Url;
use crate::model::Signature;
use crate::source::SourceKind;

pub const DEFAULT_BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_AZURE_API: &str = "https://dev.azure.com";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";

// ── Settings (partial, as written by the user) ────────────────

/// Bitbucket settings from flags, environment or config file.
#[derive(Args, Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BitbucketSettings {
    /// Bitbucket API base URL
    #[arg(id = "bitbucket-api-url", long = "bitbucket-api-url", env = "BITBUCKET_API_URL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Bitbucket workspace to scan
    #[arg(id = "bitbucket-workspace", long = "bitbucket-workspace", env = "BITBUCKET_WORKSPACE")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Bitbucket user name
    #[arg(id = "bitbucket-username", long = "bitbucket-username", env = "BITBUCKET_USERNAME")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Bitbucket app password
    #[arg(id = "bitbucket-app-password", long = "bitbucket-app-password", env = "BITBUCKET_APP_PASSWORD", hide_env_values = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,

    /// Commit author email to mirror
    #[arg(id = "bitbucket-mail", long = "bitbucket-mail", env = "BITBUCKET_MAIL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
}

/// Azure DevOps settings from flags, environment or config file.
#[derive(Args, Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureSettings {
    /// Azure DevOps API base URL
    #[arg(id = "azure-api-url", long = "azure-api-url", env = "AZURE_API_URL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Azure DevOps organization
    #[arg(id = "azure-org", long = "azure-org", env = "AZURE_ORG")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Azure DevOps project
    #[arg(id = "azure-project", long = "azure-project", env = "AZURE_PROJECT")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Azure DevOps personal access token
    #[arg(id = "azure-token", long = "azure-token", env = "AZURE_TOKEN", hide_env_values = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Commit author email to mirror
    #[arg(id = "azure-mail", long = "azure-mail", env = "AZURE_MAIL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
}

/// GitHub (destination) settings from flags, environment or config file.
#[derive(Args, Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubSettings {
    /// GitHub API base URL
    #[arg(id = "github-api-url", long = "github-api-url", env = "GITHUB_API_URL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Owner of the shadow repository
    #[arg(id = "github-owner", long = "github-owner", env = "GITHUB_OWNER")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// GitHub token with `repo` scope
    #[arg(id = "github-token", long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Author name of shadow commits (default: owner)
    #[arg(id = "github-username", long = "github-username", env = "GITHUB_USERNAME")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Author email of shadow commits
    #[arg(id = "github-mail", long = "github-mail", env = "GITHUB_MAIL")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,

    /// Shadow repository name (default depends on the source)
    #[arg(id = "github-repo", long = "github-repo", env = "GITHUB_REPO")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Branch receiving shadow commits
    #[arg(id = "github-branch", long = "github-branch", env = "GITHUB_BRANCH")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Contents of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShadowSyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitbucket: Option<BitbucketSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSettings>,
}

impl ShadowSyncConfig {
    /// Copy with every secret replaced by `***`.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***".to_string());
        let mut copy = self.clone();
        if let Some(bb) = copy.bitbucket.as_mut() {
            bb.app_password = mask(&bb.app_password);
        }
        if let Some(az) = copy.azure.as_mut() {
            az.token = mask(&az.token);
        }
        if let Some(gh) = copy.github.as_mut() {
            gh.token = mask(&gh.token);
        }
        copy
    }

    /// Overlay `flags` on top of this file config, field by field.
    #[must_use]
    pub fn overlay(
        &self,
        bitbucket: &BitbucketSettings,
        azure: &AzureSettings,
        github: &GitHubSettings,
    ) -> Self {
        let file_bb = self.bitbucket.clone().unwrap_or_default();
        let file_az = self.azure.clone().unwrap_or_default();
        let file_gh = self.github.clone().unwrap_or_default();

        Self {
            bitbucket: Some(BitbucketSettings {
                api_url: layer(&bitbucket.api_url, &file_bb.api_url),
                workspace: layer(&bitbucket.workspace, &file_bb.workspace),
                username: layer(&bitbucket.username, &file_bb.username),
                app_password: layer(&bitbucket.app_password, &file_bb.app_password),
                mail: layer(&bitbucket.mail, &file_bb.mail),
            }),
            azure: Some(AzureSettings {
                api_url: layer(&azure.api_url, &file_az.api_url),
                organization: layer(&azure.organization, &file_az.organization),
                project: layer(&azure.project, &file_az.project),
                token: layer(&azure.token, &file_az.token),
                mail: layer(&azure.mail, &file_az.mail),
            }),
            github: Some(GitHubSettings {
                api_url: layer(&github.api_url, &file_gh.api_url),
                owner: layer(&github.owner, &file_gh.owner),
                token: layer(&github.token, &file_gh.token),
                username: layer(&github.username, &file_gh.username),
                mail: layer(&github.mail, &file_gh.mail),
                repo: layer(&github.repo, &file_gh.repo),
                branch: layer(&github.branch, &file_gh.branch),
            }),
        }
    }
}

/// First non-blank value of `primary`, then `fallback`.
fn layer(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn require(value: Option<&String>, what: &str, flag: &str, env: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| Error::Config(format!("missing {what} (--{flag} or {env})")))
}

fn parse_api_url(value: Option<&String>, default: &str) -> Result<Url> {
    let raw = value.map_or(default, String::as_str);
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid API URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::Config(format!("API URL must be http(s): '{raw}'")));
    }
    Ok(url)
}

// ── Resolved configuration (what the core receives) ───────────

/// Everything the Bitbucket puller needs.
#[derive(Debug, Clone)]
pub struct BitbucketConfig {
    pub api_url: Url,
    pub workspace: String,
    pub username: String,
    pub app_password: String,
}

/// Everything the Azure puller needs.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub api_url: Url,
    pub organization: String,
    pub project: String,
    pub token: String,
}

/// Everything the shadow repository needs.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: Url,
    pub owner: String,
    pub token: String,
    pub author: Signature,
    pub repo: String,
    pub branch: String,
}

/// A source host plus the identity whose commits are mirrored.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Bitbucket(BitbucketConfig),
    Azure(AzureConfig),
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub config: SourceConfig,
    pub identity: String,
}

impl ResolvedSource {
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self.config {
            SourceConfig::Bitbucket(_) => SourceKind::Bitbucket,
            SourceConfig::Azure(_) => SourceKind::Azure,
        }
    }
}

impl BitbucketSettings {
    /// Resolve into a [`ResolvedSource`], failing on the first missing value.
    pub fn resolve(&self) -> Result<ResolvedSource> {
        let config = BitbucketConfig {
            api_url: parse_api_url(self.api_url.as_ref(), DEFAULT_BITBUCKET_API)?,
            workspace: require(self.workspace.as_ref(), "Bitbucket workspace", "bitbucket-workspace", "BITBUCKET_WORKSPACE")?,
            username: require(self.username.as_ref(), "Bitbucket user name", "bitbucket-username", "BITBUCKET_USERNAME")?,
            app_password: require(self.app_password.as_ref(), "Bitbucket app password", "bitbucket-app-password", "BITBUCKET_APP_PASSWORD")?,
        };
        let identity = require(self.mail.as_ref(), "Bitbucket commit email", "bitbucket-mail", "BITBUCKET_MAIL")?;

        Ok(ResolvedSource {
            config: SourceConfig::Bitbucket(config),
            identity: identity.trim().to_string(),
        })
    }
}

impl AzureSettings {
    /// Resolve into a [`ResolvedSource`], failing on the first missing value.
    pub fn resolve(&self) -> Result<ResolvedSource> {
        let config = AzureConfig {
            api_url: parse_api_url(self.api_url.as_ref(), DEFAULT_AZURE_API)?,
            organization: require(self.organization.as_ref(), "Azure organization", "azure-org", "AZURE_ORG")?,
            project: require(self.project.as_ref(), "Azure project", "azure-project", "AZURE_PROJECT")?,
            token: require(self.token.as_ref(), "Azure token", "azure-token", "AZURE_TOKEN")?,
        };
        let identity = require(self.mail.as_ref(), "Azure commit email", "azure-mail", "AZURE_MAIL")?;

        Ok(ResolvedSource {
            config: SourceConfig::Azure(config),
            identity: identity.trim().to_string(),
        })
    }
}

impl GitHubSettings {
    /// Resolve the destination; `source` picks the default repository name.
    pub fn resolve(&self, source: SourceKind) -> Result<GitHubConfig> {
        let owner = require(self.owner.as_ref(), "GitHub owner", "github-owner", "GITHUB_OWNER")?;
        let token = require(self.token.as_ref(), "GitHub token", "github-token", "GITHUB_TOKEN")?;
        let mail = require(self.mail.as_ref(), "GitHub commit email", "github-mail", "GITHUB_MAIL")?;

        Ok(GitHubConfig {
            api_url: parse_api_url(self.api_url.as_ref(), DEFAULT_GITHUB_API)?,
            author: Signature {
                name: self.username.clone().unwrap_or_else(|| owner.clone()),
                email: mail,
            },
            repo: self
                .repo
                .clone()
                .unwrap_or_else(|| source.default_shadow_repo().to_string()),
            branch: self.branch.clone().unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            owner,
            token,
        })
    }
}

impl ShadowSyncConfig {
    /// Resolve the source settings for `kind`.
    pub fn source(&self, kind: SourceKind) -> Result<ResolvedSource> {
        match kind {
            SourceKind::Bitbucket => self.bitbucket.clone().unwrap_or_default().resolve(),
            SourceKind::Azure => self.azure.clone().unwrap_or_default().resolve(),
        }
    }

    /// Resolve the destination settings.
    pub fn destination(&self, source: SourceKind) -> Result<GitHubConfig> {
        self.github.clone().unwrap_or_default().resolve(source)
    }
}

// ── Config file ───────────────────────────────────────────────

/// Location of the config file.
///
/// `$SHADOWSYNC_CONFIG` if set, otherwise `~/.shadowsync/config.json`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SHADOWSYNC_CONFIG") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    directories::BaseDirs::new().map(|b| b.home_dir().join(".shadowsync").join("config.json"))
}

/// Load the config file at `path`; a missing file is an empty config.
pub fn load_config(path: &Path) -> Result<ShadowSyncConfig> {
    if !path.exists() {
        return Ok(ShadowSyncConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Load the config file from its default location.
pub fn load_default_config() -> Result<ShadowSyncConfig> {
    match config_path() {
        Some(path) => load_config(&path),
        None => Ok(ShadowSyncConfig::default()),
    }
}
