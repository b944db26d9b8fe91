//! Configuration for encore-rehost.
//!
//! Two sources:
//! 1. Environment variables for the content store credentials
//!    (GITHUB_TOKEN, GITHUB_USER, REPO_NAME, BRANCH). Required, checked at
//!    startup before any network call. A `.env` file in the current
//!    directory or a parent fills in variables the environment lacks.
//! 2. An optional YAML file for upstream endpoints, exclusion rules and
//!    output names. Every field has a default.
//!
//! Config file discovery (first hit wins):
//! - Explicit `--config` path
//! - `.encore-rehost/config.yaml` in the current directory or a parent
//! - `<config dir>/encore-rehost/config.yaml` (e.g. ~/.config on Linux)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_OWNER: &str = "GITHUB_USER";
pub const ENV_REPO: &str = "REPO_NAME";
pub const ENV_BRANCH: &str = "BRANCH";

pub const DEFAULT_BRANCH: &str = "main";

/// Configuration errors (all fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0} (set GITHUB_TOKEN, GITHUB_USER and REPO_NAME, or put them in .env)")]
    MissingVar(&'static str),

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

// ============================================================================
// Content store (environment)
// ============================================================================

/// Content store coordinates and credential
#[derive(Clone)]
pub struct StoreConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,

    /// REST API root
    pub api_url: String,

    /// Host serving raw file contents
    pub raw_url: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("token", &"***")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("raw_url", &self.raw_url)
            .finish()
    }
}

impl StoreConfig {
    /// Read credentials from the process environment, then a discovered `.env`
    ///
    /// Variables already set in the environment win over the file.
    pub fn from_env(endpoints: &StoreEndpoints) -> Result<Self, ConfigError> {
        let file_vars = match find_upwards(".env") {
            Some(path) => read_env_file(&path)?,
            None => HashMap::new(),
        };

        Self::from_lookup(
            |key| {
                std::env::var(key)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .or_else(|| file_vars.get(key).cloned())
            },
            endpoints,
        )
    }

    /// Read credentials through an arbitrary lookup (empty values count as missing)
    pub fn from_lookup<F>(lookup: F, endpoints: &StoreEndpoints) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let token = required(ENV_TOKEN)?;
        let owner = required(ENV_OWNER)?;
        let repo = required(ENV_REPO)?;
        let branch = lookup(ENV_BRANCH)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        Ok(Self {
            token,
            owner,
            repo,
            branch,
            api_url: endpoints.api_url.trim_end_matches('/').to_string(),
            raw_url: endpoints.raw_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public URL of an object: `{raw_url}/{owner}/{repo}/{branch}/{path}`
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_url,
            self.owner,
            self.repo,
            self.branch,
            path.trim_start_matches('/')
        )
    }
}

// ============================================================================
// Config file schema
// ============================================================================

/// Settings loaded from the YAML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub upstream: UpstreamConfig,
    pub roles: RolesConfig,
    pub weapons: WeaponsConfig,
    pub store: StoreEndpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API root, e.g. https://api.encore.moe
    pub base_url: String,

    /// Language segment of listing URLs
    pub language: String,

    /// Prefix for relative asset paths
    pub resource_base: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.encore.moe".to_string(),
            language: "en".to_string(),
            resource_base: "https://api.encore.moe/resource/Data".to_string(),
        }
    }
}

impl UpstreamConfig {
    fn root(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.language)
    }

    pub fn role_listing_url(&self) -> String {
        format!("{}/character/", self.root())
    }

    pub fn role_detail_url(&self, id: u32) -> String {
        format!("{}/character/{}", self.root(), id)
    }

    pub fn weapon_listing_url(&self) -> String {
        format!("{}/weapon/", self.root())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub skip_ids: Vec<u32>,
    pub exclude_names: Vec<String>,
    pub portrait: PortraitConfig,

    /// Catalog file name
    pub output: String,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            skip_ids: Vec::new(),
            exclude_names: Vec::new(),
            portrait: PortraitConfig::default(),
            output: "roles.json".to_string(),
        }
    }
}

/// Where portraits are re-sourced from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortraitConfig {
    /// Secondary provider root
    pub host: String,

    /// Path segment the kept part of the path starts at
    pub marker: String,

    /// Extension served by the secondary provider
    pub extension: String,
}

impl Default for PortraitConfig {
    fn default() -> Self {
        Self {
            host: "https://files.wuthery.com/p/GameData".to_string(),
            marker: "/UI/".to_string(),
            extension: "webp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponsConfig {
    pub skip_ids: Vec<u32>,
    pub exclude_names: Vec<String>,

    /// Prefix removed from the engine object path
    pub strip_prefix: String,

    /// Source URL template, `{path}` is replaced by the object path
    pub icon_template: String,

    pub output: String,
}

impl Default for WeaponsConfig {
    fn default() -> Self {
        Self {
            skip_ids: Vec::new(),
            exclude_names: Vec::new(),
            strip_prefix: "/Game/Aki/".to_string(),
            icon_template: "https://api.encore.moe/resource/Data/Game/Aki/{path}.png".to_string(),
            output: "weapons.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreEndpoints {
    pub api_url: String,
    pub raw_url: String,
}

impl Default for StoreEndpoints {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML content
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Fully resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub store: StoreConfig,
    pub settings: Settings,

    /// Config file the settings came from (if any)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Resolve settings and credentials
    ///
    /// Fails before anything touches the network when a credential is missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let settings = match config_file {
            Some(ref path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        let store = StoreConfig::from_env(&settings.store)?;

        Ok(Self {
            store,
            settings,
            config_file,
        })
    }
}

/// Variables declared in a `.env` file
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect())
        .map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })
}

/// First existing `relative` under the current directory or one of its parents
fn find_upwards(relative: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(relative);
        if candidate.exists() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Find a config file in the current directory, its parents, then the user config dir
fn find_config_file() -> Option<PathBuf> {
    if let Some(found) = find_upwards(".encore-rehost/config.yaml") {
        return Some(found);
    }

    dirs::config_dir()
        .map(|dir| dir.join("encore-rehost").join("config.yaml"))
        .filter(|path| path.exists())
}
