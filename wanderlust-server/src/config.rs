use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wanderlust_guard::RateLimitConfig;

/// Overrides `server.port` when set.
pub const PORT_ENV: &str = "WANDERLUST_PORT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub chat: ChatSection,
    pub rate_limit: RateLimitConfig,
    pub data: DataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Key rate limits on the first `X-Forwarded-For` hop instead of the peer
    /// address. Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// OpenAI-compatible endpoint root; `/v1/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token. AI replies
    /// are disabled when it is unset or empty.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// No timeout beyond the HTTP client's defaults when absent.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Questions asked before results are forced.
    pub max_questions: u32,
    /// Most recent messages forwarded to the model.
    pub max_history: usize,
}

/// Optional overrides for the built-in data tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// JSON destination catalog.
    pub catalog: Option<PathBuf>,
    /// TOML content policy.
    pub policy: Option<PathBuf>,
    /// TOML extraction rules.
    pub extraction_rules: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8787,
            trust_forwarded_for: false,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "WANDERLUST_LLM_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            timeout_secs: None,
        }
    }
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            max_questions: 5,
            max_history: 10,
        }
    }
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    fn apply_env(&mut self) {
        let Ok(raw) = std::env::var(PORT_ENV) else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => {
                info!("{PORT_ENV} set, using port {port}");
                self.server.port = port;
            }
            Err(e) => warn!("Invalid {PORT_ENV} value {raw:?}: {e}"),
        }
    }
}

/// Read `path`, or fall back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut cfg = if path.exists() {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        parse_config(&s).with_context(|| format!("parse {}", path.display()))?
    } else {
        info!("{} not found, using default config", path.display());
        Config::default()
    };
    cfg.apply_env();
    Ok(cfg)
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg = parse_config(
            r#"
[llm]
model = "gpt-4.1-mini"

[rate_limit]
max_requests = 3
"#,
        )
        .unwrap();
        assert_eq!(cfg.llm.model, "gpt-4.1-mini");
        assert_eq!(cfg.llm.api_key_env, "WANDERLUST_LLM_API_KEY");
        assert_eq!(cfg.rate_limit.max_requests, 3);
        assert_eq!(cfg.rate_limit.window_secs, 60);
        assert_eq!(cfg.chat.max_questions, 5);
        assert_eq!(cfg.server.port, 8787);
        assert!(!cfg.server.trust_forwarded_for);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&s).unwrap(), cfg);
    }

    #[test]
    fn test_data_paths() {
        let cfg = parse_config(
            r#"
[data]
catalog = "data/destinations.json"
"#,
        )
        .unwrap();
        assert_eq!(cfg.data.catalog, Some(PathBuf::from("data/destinations.json")));
        assert_eq!(cfg.data.policy, None);
    }

    #[test]
    fn test_address() {
        assert_eq!(Config::default().address(), "0.0.0.0:8787");
    }
}
