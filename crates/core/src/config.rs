use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// `DATACHAT_*` lookups scoped to one profile.
///
/// With profile `STAGING`, `DATACHAT_SERVER_URL` is read from
/// `STAGING_DATACHAT_SERVER_URL` when that is set and non-empty, and from the
/// bare key otherwise. Empty values count as unset.
#[derive(Debug, Clone, Copy)]
struct ProfiledEnv<'a> {
    profile: &'a str,
}

impl<'a> ProfiledEnv<'a> {
    fn new(profile: &'a str) -> Self {
        Self { profile }
    }

    fn get(&self, key: &str) -> Option<String> {
        let read = |k: &str| env::var(k).ok().filter(|v| !v.is_empty());
        if !self.profile.is_empty() {
            if let Some(v) = read(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        read(key)
    }

    fn text(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Unparseable numbers fall back to `default` with a warning.
    fn number(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, default, "Ignoring non-numeric config value");
                default
            }),
        }
    }
}

/// Whether `key` is set (non-empty) for `profile`, prefixed or not.
pub fn is_set(profile: &str, key: &str) -> bool {
    ProfiledEnv::new(profile).get(key).is_some()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub agent: AgentConfig,
    pub demo: DemoConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DATACHAT_PROFILE`. When set (e.g. `STAGING`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = ProfiledEnv::new("").text("DATACHAT_PROFILE", "");
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            agent: AgentConfig::from_env_profiled(p),
            demo: DemoConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  agent:  url={}, app={}, user={}",
            self.agent.base_url,
            self.agent.app_name,
            self.agent.user_id
        );
        tracing::info!(
            "  demo:   delay={}..={}ms",
            self.demo.min_delay_ms,
            self.demo.max_delay_ms
        );
    }
}

// ── Agent backend ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent server; `/api/run_sse` is appended.
    pub base_url: String,
    pub app_name: String,
    pub user_id: String,
    pub connect_timeout_secs: u64,
}

impl AgentConfig {
    fn from_env_profiled(p: &str) -> Self {
        let env = ProfiledEnv::new(p);
        Self {
            base_url: env.text("DATACHAT_SERVER_URL", "http://localhost:8000"),
            app_name: env.text("DATACHAT_APP_NAME", "data_agent_chatbot"),
            user_id: env.text("DATACHAT_USER_ID", "local_user"),
            connect_timeout_secs: env.number("DATACHAT_CONNECT_TIMEOUT_SECS", 10),
        }
    }

    pub fn run_sse_url(&self) -> String {
        format!("{}/api/run_sse", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_env_profiled("")
    }
}

// ── Demo mode ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl DemoConfig {
    fn from_env_profiled(p: &str) -> Self {
        let env = ProfiledEnv::new(p);
        let min_delay_ms = env.number("DATACHAT_DEMO_MIN_DELAY_MS", 1000);
        let max_delay_ms = env.number("DATACHAT_DEMO_MAX_DELAY_MS", 3000);
        Self {
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: max_delay_ms.max(min_delay_ms),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::from_env_profiled("")
    }
}
