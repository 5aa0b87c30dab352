use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 300; // hard ceiling, whatever the config says
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 5_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;
pub const DEFAULT_RULES_PATH: &str = "vera_data/vera_firewall.json";
pub const DEFAULT_AUDIT_LOG_PATH: &str = "logs/vera_access.log";

/// Words whose presence marks a message as a possible command request.
pub const DEFAULT_TRIGGERS: &[&str] = &[
    "run command",
    "execute",
    "cmd",
    "command",
    "shell",
    "bash",
    "powershell",
    "terminal",
    "run",
    "exec",
    "system",
    "get output",
    "list",
    "show",
    "check",
    "ping",
    "test",
];

/// Top-level config (vera.toml + VERA_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeraConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub firewall: FirewallConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Bounds applied to every command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wall-clock limit per command. Clamped to [`MAX_TIMEOUT_SECS`].
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Captured output is cut to this many characters.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    /// Child processes allowed to run at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Entries kept in the execution and blocked-attempt histories.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ExecutorConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// JSON rule file (blacklist, dangerous patterns, protected paths).
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
    /// Append-only log of blocked attempts.
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            audit_log_path: default_audit_log_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            triggers: default_triggers(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_max_output_chars() -> usize {
    DEFAULT_MAX_OUTPUT_CHARS
}
fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_rules_path() -> String {
    DEFAULT_RULES_PATH.to_string()
}
fn default_audit_log_path() -> String {
    DEFAULT_AUDIT_LOG_PATH.to_string()
}
pub fn default_triggers() -> Vec<String> {
    DEFAULT_TRIGGERS.iter().map(|t| t.to_string()).collect()
}

impl VeraConfig {
    /// Load config from a TOML file with VERA_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `VERA_EXECUTOR__TIMEOUT_SECS=10`. A missing file is not an error:
    /// every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: VeraConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("VERA_").split("__"))
            .extract()
            .map_err(|e| crate::error::VeraError::Config(e.to_string()))?;

        tracing::debug!(path = %path, "configuration loaded");
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vera/vera.toml", home)
}
