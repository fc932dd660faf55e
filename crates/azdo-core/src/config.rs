//! Configuration management for azdo-tools.
//!
//! Settings come from two layers:
//!
//! 1. An optional TOML file in a platform-specific location:
//!    - **macOS/Linux**: `~/.config/azdo-tools/config.toml`
//!    - **Windows**: `%APPDATA%\azdo-tools\config.toml`
//! 2. Environment variables, which override the file.
//!
//! [`Config::resolve`] merges both into [`Settings`] once at startup. Missing
//! required values are fatal there, never per tool call.
//!
//! # Example
//!
//! ```ignore
//! use azdo_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("azure_devops.org_url", "https://dev.azure.com/contoso")?;
//! config.set("azure_devops.default_project", "Fabrikam")?;
//! config.save()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "azdo-tools";

/// Organization URL, e.g. `https://dev.azure.com/contoso`.
pub const ENV_ORG_URL: &str = "AZURE_DEVOPS_ORG_URL";
/// Bare organization name, expanded to a `dev.azure.com` URL.
pub const ENV_ORG: &str = "AZURE_DEVOPS_ORG";
/// Personal access token.
pub const ENV_PAT: &str = "AZURE_DEVOPS_PAT";
/// Project used when a tool call does not name one.
pub const ENV_DEFAULT_PROJECT: &str = "AZURE_DEVOPS_DEFAULT_PROJECT";
/// Port of the HTTP transport.
pub const ENV_HTTP_PORT: &str = "MCP_HTTP_PORT";
/// Idle timeout of HTTP sessions, in seconds.
pub const ENV_SESSION_TIMEOUT: &str = "MCP_SESSION_TIMEOUT_SECS";

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 1800;

// =============================================================================
// Configuration structures
// =============================================================================

/// Contents of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Organization settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_devops: Option<AzureDevOpsConfig>,

    /// Transport settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

/// Azure DevOps organization configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureDevOpsConfig {
    /// Organization URL
    pub org_url: String,
    /// Project used when a tool call omits one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

/// MCP transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout_secs: Option<u64>,
}

/// Fully resolved runtime settings.
#[derive(Clone)]
pub struct Settings {
    pub org_url: String,
    pub pat: String,
    pub default_project: Option<String>,
    pub http_port: u16,
    pub session_timeout: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("org_url", &self.org_url)
            .field("pat", &"<redacted>")
            .field("default_project", &self.default_project)
            .field("http_port", &self.http_port)
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `azure_devops.org_url`, `server.http_port`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "azure_devops" => {
                let config = self.azure_devops.get_or_insert_with(Default::default);
                match field {
                    "org_url" | "url" => config.org_url = value.to_string(),
                    "default_project" | "project" => {
                        config.default_project = Some(value.to_string())
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown azure_devops config field: {}",
                            field
                        )))
                    }
                }
            }
            "server" => {
                let config = self.server.get_or_insert_with(Default::default);
                match field {
                    "http_port" | "port" => config.http_port = Some(parse_port(value)?),
                    "session_timeout_secs" | "session_timeout" => {
                        config.session_timeout_secs = Some(parse_timeout(value)?)
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown server config field: {}",
                            field
                        )))
                    }
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `azure_devops.org_url`, `server.http_port`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "azure_devops" => {
                let Some(config) = &self.azure_devops else {
                    return Ok(None);
                };
                match field {
                    "org_url" | "url" => Ok(Some(config.org_url.clone())),
                    "default_project" | "project" => Ok(config.default_project.clone()),
                    _ => Err(Error::Config(format!(
                        "Unknown azure_devops config field: {}",
                        field
                    ))),
                }
            }
            "server" => {
                let Some(config) = &self.server else {
                    return Ok(None);
                };
                match field {
                    "http_port" | "port" => Ok(config.http_port.map(|p| p.to_string())),
                    "session_timeout_secs" | "session_timeout" => {
                        Ok(config.session_timeout_secs.map(|s| s.to_string()))
                    }
                    _ => Err(Error::Config(format!(
                        "Unknown server config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }

    /// Organization URL from the environment, falling back to the file.
    pub fn org_url(&self, env: &impl Fn(&str) -> Option<String>) -> Option<String> {
        non_empty(env(ENV_ORG_URL))
            .or_else(|| non_empty(env(ENV_ORG)).map(|org| format!("https://dev.azure.com/{}", org)))
            .or_else(|| {
                self.azure_devops
                    .as_ref()
                    .and_then(|c| non_empty(Some(c.org_url.clone())))
            })
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Merge file and environment into runtime settings.
    ///
    /// `env` looks up environment variables; `stored_token` is consulted
    /// with the organization name when `AZURE_DEVOPS_PAT` is unset.
    pub fn resolve(
        &self,
        env: impl Fn(&str) -> Option<String>,
        stored_token: impl FnOnce(&str) -> Result<Option<String>>,
    ) -> Result<Settings> {
        let org_url = self.org_url(&env).ok_or_else(|| {
            Error::Config(format!(
                "Organization URL is not configured: set {} or azure_devops.org_url",
                ENV_ORG_URL
            ))
        })?;

        if !(org_url.starts_with("https://") || org_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Organization URL must start with http:// or https://: {}",
                org_url
            )));
        }

        let pat = match non_empty(env(ENV_PAT)) {
            Some(pat) => pat,
            None => {
                let org = organization_name(&org_url).ok_or_else(|| {
                    Error::Config(format!("Cannot derive organization name from {}", org_url))
                })?;
                stored_token(org.as_str())?.ok_or_else(|| {
                    Error::Config(format!(
                        "Personal access token is not configured: set {} or run `azdo auth login`",
                        ENV_PAT
                    ))
                })?
            }
        };

        let file_project = self
            .azure_devops
            .as_ref()
            .and_then(|c| c.default_project.clone());
        let default_project = non_empty(env(ENV_DEFAULT_PROJECT)).or(non_empty(file_project));

        let server = self.server.clone().unwrap_or_default();
        let http_port = match non_empty(env(ENV_HTTP_PORT)) {
            Some(value) => parse_port(&value)?,
            None => server.http_port.unwrap_or(DEFAULT_HTTP_PORT),
        };
        let session_timeout_secs = match non_empty(env(ENV_SESSION_TIMEOUT)) {
            Some(value) => parse_timeout(&value)?,
            None => server
                .session_timeout_secs
                .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS),
        };

        Ok(Settings {
            org_url,
            pat,
            default_project,
            http_port,
            session_timeout: Duration::from_secs(session_timeout_secs),
        })
    }
}

/// Organization name from its URL.
///
/// `https://dev.azure.com/contoso` and `https://contoso.visualstudio.com`
/// both yield `contoso`.
pub fn organization_name(org_url: &str) -> Option<String> {
    let rest = org_url
        .trim_end_matches('/')
        .split_once("://")
        .map(|(_, rest)| rest)?;
    let mut parts = rest.split('/');
    let host = parts.next()?;

    if let Some(org) = host.strip_suffix(".visualstudio.com") {
        return Some(org.to_string()).filter(|o| !o.is_empty());
    }

    parts
        .last()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| Error::Config(format!("Invalid HTTP port: {}", value)))
}

fn parse_timeout(value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| Error::Config(format!("Invalid session timeout: {}", value)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Tests
// =============================================================================
