use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub screening: ScreeningConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            admin: AdminConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_admin_listen")]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_admin_listen(),
        }
    }
}

/// Where generation requests are forwarded once they pass admission and screening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

/// Per-client sliding window admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Upper bound on the number of tracked client identities.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Clients idle for `idle_multiplier * window_secs` are swept.
    #[serde(default = "default_idle_multiplier")]
    pub idle_multiplier: u32,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        self.window().saturating_mul(self.idle_multiplier)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            max_clients: default_max_clients(),
            idle_multiplier: default_idle_multiplier(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum prompt length in characters. No limit when unset.
    #[serde(default)]
    pub max_prompt_length: Option<usize>,
    /// Ordered screening rules. The built-in table is used when empty.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_prompt_length: None,
            rules: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub category: RuleCategory,
}

/// The kind of attack a screening pattern is meant to catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    InjectionOverride,
    CommandExecution,
    CodeExecution,
    SqlInjection,
    TemplateInjection,
    MarkupInjection,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::InjectionOverride => "injection-override",
            RuleCategory::CommandExecution => "command-execution",
            RuleCategory::CodeExecution => "code-execution",
            RuleCategory::SqlInjection => "sql-injection",
            RuleCategory::TemplateInjection => "template-injection",
            RuleCategory::MarkupInjection => "markup-injection",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults applied to generation requests that omit the hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}

// Default value helpers
fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_admin_listen() -> String {
    "127.0.0.1:9090".to_string()
}
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_backend_timeout() -> u64 {
    30
}
fn default_max_requests() -> u64 {
    60
}
fn default_window_secs() -> u64 {
    60
}
fn default_max_clients() -> usize {
    100_000
}
fn default_idle_multiplier() -> u32 {
    2
}
fn default_cleanup_interval() -> u64 {
    60
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    150
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen.trim().is_empty() {
            anyhow::bail!("server.listen must not be empty");
        }

        if !(self.backend.url.starts_with("http://") || self.backend.url.starts_with("https://")) {
            anyhow::bail!(
                "backend.url must be an http(s) URL, got '{}'",
                self.backend.url
            );
        }
        if self.backend.timeout_secs == 0 {
            anyhow::bail!("backend.timeout_secs must be positive");
        }

        let rl = &self.rate_limit;
        if rl.max_requests == 0 {
            anyhow::bail!("rate_limit.max_requests must be positive");
        }
        if rl.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be positive");
        }
        if rl.max_clients == 0 {
            anyhow::bail!("rate_limit.max_clients must be positive");
        }
        if rl.idle_multiplier == 0 {
            anyhow::bail!("rate_limit.idle_multiplier must be at least 1");
        }
        if rl.cleanup_interval_secs == 0 {
            anyhow::bail!("rate_limit.cleanup_interval_secs must be positive");
        }

        if self.screening.max_prompt_length == Some(0) {
            anyhow::bail!("screening.max_prompt_length must be positive when set");
        }
        for (i, rule) in self.screening.rules.iter().enumerate() {
            if rule.pattern.trim().is_empty() {
                anyhow::bail!("screening.rules[{}] has an empty pattern", i);
            }
        }

        let gen = &self.generation;
        if !(0.0..=2.0).contains(&gen.default_temperature) {
            anyhow::bail!(
                "generation.default_temperature must be within [0.0, 2.0], got {}",
                gen.default_temperature
            );
        }
        if gen.default_max_tokens == 0 {
            anyhow::bail!("generation.default_max_tokens must be positive");
        }

        Ok(())
    }
}
