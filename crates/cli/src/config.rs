use anyhow::{Context, Result};
use datachat_core::config::is_set;
use datachat_core::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// CLI configuration loaded from TOML file.
///
/// Every field is optional. A value here only applies when the matching
/// `DATACHAT_*` variable is not set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Agent server base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Start in demo mode without `--demo`
    #[serde(default)]
    pub demo: bool,

    /// Print tool and code logs after each response
    #[serde(default)]
    pub show_logs: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_min_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_max_delay_ms: Option<u64>,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/datachat/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("datachat");
        Ok(config_dir)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// A missing file yields defaults and a commented default file is written.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        match std::fs::read_to_string(config_path) {
            Ok(content) => {
                debug!(?config_path, "Loading config");
                toml::from_str(&content)
                    .with_context(|| format!("failed to parse config: {}", config_path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?config_path, "Config file not found, using defaults");
                if let Err(e) = write_template(config_path) {
                    warn!(?config_path, error = %e, "Could not write default config");
                }
                Ok(Self::default())
            }
            Err(e) => Err(e)
                .with_context(|| format!("failed to read config: {}", config_path.display())),
        }
    }

    /// Fill in values the environment left unset.
    pub fn layer_onto(&self, config: &mut Config) {
        let profile = config.profile.clone();
        let unset = |key: &str| !is_set(&profile, key);

        if let Some(ref url) = self.server_url {
            if unset("DATACHAT_SERVER_URL") {
                config.agent.base_url = url.clone();
            }
        }
        if let Some(ref app) = self.app_name {
            if unset("DATACHAT_APP_NAME") {
                config.agent.app_name = app.clone();
            }
        }
        if let Some(ref user) = self.user_id {
            if unset("DATACHAT_USER_ID") {
                config.agent.user_id = user.clone();
            }
        }
        if let Some(ms) = self.demo_min_delay_ms {
            if unset("DATACHAT_DEMO_MIN_DELAY_MS") {
                config.demo.min_delay_ms = ms;
            }
        }
        if let Some(ms) = self.demo_max_delay_ms {
            if unset("DATACHAT_DEMO_MAX_DELAY_MS") {
                config.demo.max_delay_ms = ms;
            }
        }
        if config.demo.min_delay_ms > config.demo.max_delay_ms {
            std::mem::swap(&mut config.demo.min_delay_ms, &mut config.demo.max_delay_ms);
        }
    }
}

/// Write the commented template so users can see every key.
fn write_template(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_FILE)
}

const DEFAULT_FILE: &str = r#"# datachat configuration. Environment variables (DATACHAT_*) and
# command-line flags take precedence over these values.

# server_url = "http://localhost:8000"
# app_name = "data_agent_chatbot"
# user_id = "local_user"
# demo = false
# show_logs = false
# demo_min_delay_ms = 1000
# demo_max_delay_ms = 3000
"#;
