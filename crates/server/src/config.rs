use std::env;

use chess_analysis::EngineConfig;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: env::var("BABELFISH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            engine: EngineConfig::from_env(),
        }
    }

    /// Key shown in startup banners: first 12 characters only.
    pub fn masked_key(&self) -> String {
        match &self.api_key {
            Some(key) if key.chars().count() > 12 => {
                let head: String = key.chars().take(12).collect();
                format!("{head}...")
            }
            Some(_) => "***".to_string(),
            None => "(not set)".to_string(),
        }
    }
}
