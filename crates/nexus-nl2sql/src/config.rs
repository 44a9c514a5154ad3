//! Process configuration.
//!
//! `Settings` is built once at process start and handed by reference to the
//! pipeline and the sentinel; nothing in the core reads the environment on
//! its own.
//!
//! Precedence (later wins):
//! 1) defaults
//! 2) JSON config file (optional)
//! 3) environment variables
//! 4) explicit overrides by the caller (CLI flags)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const NL2SQL_MODE_ENV: &str = "NL2SQL_MODE";
pub const LLM_PROVIDER_ENV: &str = "LLM_PROVIDER";
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";
pub const LLM_TIMEOUT_SECS_ENV: &str = "LLM_TIMEOUT_SECS";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const GEMINI_BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

const DEFAULT_DATABASE_PATH: &str = "./data/nexus.db";
const DEFAULT_LLM_PROVIDER: &str = "stub";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{env_var} is required for {provider} provider")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },
    #[error("invalid nl2sql mode `{0}` (expected `rules` or `llm`)")]
    InvalidMode(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// How SQL gets generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nl2SqlMode {
    #[default]
    Rules,
    Llm,
}

impl FromStr for Nl2SqlMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "llm" => Ok(Self::Llm),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Nl2SqlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rules => "rules",
            Self::Llm => "llm",
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub nl2sql_mode: Nl2SqlMode,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub ollama_host: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            nl2sql_mode: Nl2SqlMode::Rules,
            llm_provider: DEFAULT_LLM_PROVIDER.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            openai_api_key: None,
            openai_base_url: None,
            gemini_api_key: None,
            gemini_base_url: None,
            anthropic_api_key: None,
            anthropic_base_url: None,
            ollama_host: None,
        }
    }
}

// Keys never show up in logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Settings")
            .field("database_path", &self.database_path)
            .field("nl2sql_mode", &self.nl2sql_mode)
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("ollama_host", &self.ollama_host)
            .finish()
    }
}

impl Settings {
    /// Defaults, then `config_file` (if any), then the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match config_file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source. Blank values are
    /// ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get(DATABASE_PATH_ENV) {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get(NL2SQL_MODE_ENV) {
            self.nl2sql_mode = v.parse()?;
        }
        if let Some(v) = get(LLM_PROVIDER_ENV) {
            self.llm_provider = v;
        }
        if let Some(v) = get(LLM_MODEL_ENV) {
            self.llm_model = v;
        }
        if let Some(v) = get(LLM_TIMEOUT_SECS_ENV) {
            self.llm_timeout_secs = v.parse().map_err(|e| ConfigError::InvalidValue {
                key: LLM_TIMEOUT_SECS_ENV,
                message: format!("{e}"),
            })?;
        }

        let secrets: [(&str, &mut Option<String>); 7] = [
            (OPENAI_API_KEY_ENV, &mut self.openai_api_key),
            (OPENAI_BASE_URL_ENV, &mut self.openai_base_url),
            (GEMINI_API_KEY_ENV, &mut self.gemini_api_key),
            (GEMINI_BASE_URL_ENV, &mut self.gemini_base_url),
            (ANTHROPIC_API_KEY_ENV, &mut self.anthropic_api_key),
            (ANTHROPIC_BASE_URL_ENV, &mut self.anthropic_base_url),
            (OLLAMA_HOST_ENV, &mut self.ollama_host),
        ];
        for (key, slot) in secrets {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        }

        Ok(())
    }

    /// Normalised provider name (`"openai"`, `"gemini"`, ...).
    pub fn provider(&self) -> String {
        self.llm_provider.trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_rules_mode() {
        let s = Settings::default();
        assert_eq!(s.nl2sql_mode, Nl2SqlMode::Rules);
        assert_eq!(s.provider(), "stub");
        assert!(s.openai_api_key.is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut s = Settings::default();
        s.apply_env_from(env(&[
            (NL2SQL_MODE_ENV, "LLM"),
            (LLM_PROVIDER_ENV, " Gemini "),
            (LLM_MODEL_ENV, "gemini-2.0-flash"),
            (GEMINI_API_KEY_ENV, "AIzaTest"),
            (OPENAI_API_KEY_ENV, "   "),
        ]))
        .unwrap();

        assert_eq!(s.nl2sql_mode, Nl2SqlMode::Llm);
        assert_eq!(s.provider(), "gemini");
        assert_eq!(s.llm_model, "gemini-2.0-flash");
        assert_eq!(s.gemini_api_key.as_deref(), Some("AIzaTest"));
        assert!(s.openai_api_key.is_none(), "blank values are ignored");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut s = Settings::default();
        let err = s.apply_env_from(env(&[(NL2SQL_MODE_ENV, "magic")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMode(m) if m == "magic"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut s = Settings::default();
        let err = s.apply_env_from(env(&[(LLM_TIMEOUT_SECS_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == LLM_TIMEOUT_SECS_ENV));
    }

    #[test]
    fn json_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus.json");
        std::fs::write(&path, r#"{ "nl2sql_mode": "llm", "llm_provider": "openai" }"#).unwrap();

        let s = Settings::from_json_file(&path).unwrap();
        assert_eq!(s.nl2sql_mode, Nl2SqlMode::Llm);
        assert_eq!(s.llm_provider, "openai");
        assert_eq!(s.llm_timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
    }

    #[test]
    fn debug_output_redacts_keys() {
        let s = Settings {
            openai_api_key: Some("sk-secret".into()),
            ..Settings::default()
        };
        let text = format!("{s:?}");
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("<set>"));
    }
}
