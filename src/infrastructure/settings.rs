//! Process configuration, read from the environment (and an optional `.env` file).

use anyhow::{Context, anyhow};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama3-8b-8192";

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Accepted for compatibility with existing `.env` files, has no effect.
    pub reload: bool,
    pub data_dir: PathBuf,
    pub inactivity_timeout: Duration,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// `None` puts the assistant in stub mode.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            app_name: "AI Character Backend".to_owned(),
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: "development".to_owned(),
            host: "0.0.0.0".to_owned(),
            port: 8000,
            reload: false,
            data_dir: PathBuf::from("data"),
            inactivity_timeout: Duration::from_secs(1800),
            llm: LlmSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            api_key: None,
            api_url: DEFAULT_LLM_API_URL.to_owned(),
            model: DEFAULT_LLM_MODEL.to_owned(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Settings> {
        dotenvy::dotenv().ok();
        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Settings> {
        let defaults = Settings::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Settings {
            app_name: var("APP_NAME").unwrap_or(defaults.app_name),
            app_version: var("APP_VERSION").unwrap_or(defaults.app_version),
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or(var("PORT"), "PORT", defaults.port)?,
            reload: match var("RELOAD") {
                Some(value) => parse_flag(&value).context("RELOAD")?,
                None => defaults.reload,
            },
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            inactivity_timeout: Duration::from_secs(parse_or(
                var("INACTIVITY_TIMEOUT_SECS"),
                "INACTIVITY_TIMEOUT_SECS",
                defaults.inactivity_timeout.as_secs(),
            )?),
            llm: LlmSettings {
                api_key: var("GROQ_API_KEY"),
                api_url: var("LLM_API_URL").unwrap_or(defaults.llm.api_url),
                model: var("LLM_MODEL").unwrap_or(defaults.llm.model),
                temperature: parse_or(
                    var("LLM_TEMPERATURE"),
                    "LLM_TEMPERATURE",
                    defaults.llm.temperature,
                )?,
                max_tokens: parse_or(
                    var("LLM_MAX_TOKENS"),
                    "LLM_MAX_TOKENS",
                    defaults.llm.max_tokens,
                )?,
                timeout: Duration::from_secs(parse_or(
                    var("LLM_TIMEOUT_SECS"),
                    "LLM_TIMEOUT_SECS",
                    defaults.llm.timeout.as_secs(),
                )?),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn stub_mode(&self) -> bool {
        self.llm.api_key.is_none()
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}: cannot parse `{raw}`: {e}")),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("not a boolean: `{other}`")),
    }
}
