// src/config/agent.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AGENT_CONFIG_PATH: &str = "config/agent.json";
pub const ENV_AGENT_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_host() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "deepseek-r1:8b".to_string()
}
fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// "ollama" | "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the model server (Ollama) or API (OpenAI-compatible).
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default)]
    pub api_key: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            host: default_host(),
            model: default_model(),
            temperature: default_temperature(),
            api_key: String::new(),
        }
    }
}

impl AgentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AgentConfig = serde_json::from_str(&data)?;
        cfg.normalized()
    }

    /// Defaults overridden by LLM_PROVIDER / LLM_HOST / LLM_MODEL / LLM_TEMPERATURE / OPENAI_API_KEY.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = AgentConfig::default();
        if let Ok(p) = env::var("LLM_PROVIDER") {
            cfg.provider = p;
        }
        if let Ok(h) = env::var("LLM_HOST") {
            cfg.host = h;
        }
        if let Ok(m) = env::var("LLM_MODEL") {
            cfg.model = m;
        }
        if let Some(t) = env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok())
        {
            cfg.temperature = t;
        }
        let wants_openai = cfg.provider.trim().eq_ignore_ascii_case("openai");
        if wants_openai && env::var("OPENAI_API_KEY").is_ok() {
            cfg.api_key = "ENV".to_string();
        }
        cfg.normalized()
    }

    /// File at $AGENT_CONFIG_PATH or config/agent.json if present, else env.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = env::var(ENV_AGENT_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_AGENT_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            Self::load_from_file(&path)
        } else {
            Self::from_env()
        }
    }

    fn normalized(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                // Local and mock agents ignore the key.
                _ => String::new(),
            };
        }

        if !self.temperature.is_finite() {
            self.temperature = default_temperature();
        }
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.host = self.host.trim_end_matches('/').to_string();

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("agent.json");
        fs::write(
            &p,
            r#"{"provider":"Ollama","host":"http://gpu:11434/","model":"llama3","temperature":9.0}"#,
        )
        .unwrap();
        let cfg = AgentConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.provider, "ollama");
        assert_eq!(cfg.host, "http://gpu:11434");
        assert_eq!(cfg.temperature, 2.0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: AgentConfig = serde_json::from_str("{}").unwrap();
        let cfg = cfg.normalized().unwrap();
        assert_eq!(cfg.model, "deepseek-r1:8b");
        assert_eq!(cfg.host, "http://localhost:11434");
    }

    #[serial_test::serial]
    #[test]
    fn openai_key_in_env_does_not_break_default_ollama() {
        env::remove_var("LLM_PROVIDER");
        env::set_var("OPENAI_API_KEY", "sk-test");

        let cfg = AgentConfig::from_env().expect("ollama config loads");
        assert_eq!(cfg.provider, "ollama");
        assert!(cfg.api_key.is_empty());

        env::set_var("LLM_PROVIDER", "OpenAI");
        let cfg = AgentConfig::from_env().expect("openai config loads");
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");

        env::remove_var("LLM_PROVIDER");
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn env_key_marker_is_dropped_for_local_providers() {
        let cfg: AgentConfig =
            serde_json::from_str(r#"{"provider":"mock","api_key":"ENV"}"#).unwrap();
        let cfg = cfg.normalized().expect("mock ignores key");
        assert!(cfg.api_key.is_empty());
    }
}
