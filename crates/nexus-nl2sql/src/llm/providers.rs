//! LLM API providers
//!
//! Blocking HTTP adapters for OpenAI, Gemini, Anthropic and a local Ollama
//! server, plus [`MockLlm`] for tests. Every adapter asks for temperature 0.

use parking_lot::Mutex;

use super::{LlmClient, LlmError};
use crate::config::{ConfigError, Settings};

#[cfg(any(
    feature = "openai",
    feature = "gemini",
    feature = "anthropic",
    feature = "ollama"
))]
pub use http::*;

// ============================================================================
// Construction
// ============================================================================

/// Build the client selected by `settings.llm_provider`.
///
/// `Ok(None)` means "no client": `stub`, `none`, an empty name, or a provider
/// this build does not know. A known provider without its credential is an
/// error.
pub fn client_from_settings(settings: &Settings) -> Result<Option<Box<dyn LlmClient>>, ConfigError> {
    let provider = settings.provider();
    let client: Box<dyn LlmClient> = match provider.as_str() {
        "" | "stub" | "none" => return Ok(None),
        #[cfg(feature = "openai")]
        "openai" => Box::new(OpenAiClient::from_settings(settings)?),
        #[cfg(feature = "gemini")]
        "gemini" => Box::new(GeminiClient::from_settings(settings)?),
        #[cfg(feature = "anthropic")]
        "anthropic" => Box::new(AnthropicClient::from_settings(settings)?),
        #[cfg(feature = "ollama")]
        "ollama" => Box::new(OllamaClient::from_settings(settings)?),
        other => {
            tracing::warn!(provider = other, "unrecognised LLM provider; no client");
            return Ok(None);
        }
    };
    tracing::debug!(provider = client.name(), model = %settings.llm_model, "LLM client ready");
    Ok(Some(client))
}

// ============================================================================
// HTTP adapters
// ============================================================================

#[cfg(any(
    feature = "openai",
    feature = "gemini",
    feature = "anthropic",
    feature = "ollama"
))]
mod http {
    use std::time::Duration;

    use reqwest::blocking::{Client, RequestBuilder};
    use serde_json::{json, Value};

    use super::super::{LlmClient, LlmError};
    use crate::config::{ConfigError, Settings};

    const OPENAI_BASE_URL: &str = "https://api.openai.com";
    const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
    const ANTHROPIC_VERSION: &str = "2023-06-01";
    const ANTHROPIC_MAX_TOKENS: u32 = 1024;
    const OLLAMA_HOST: &str = "http://127.0.0.1:11434";

    fn http_client(settings: &Settings) -> Result<Client, ConfigError> {
        Client::builder()
            .timeout(Duration::from_secs(settings.llm_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    fn require(
        key: &Option<String>,
        provider: &'static str,
        env_var: &'static str,
    ) -> Result<String, ConfigError> {
        key.clone()
            .ok_or(ConfigError::MissingCredential { provider, env_var })
    }

    fn base_url(configured: &Option<String>, default: &str) -> String {
        configured
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    fn send(request: RequestBuilder) -> Result<Value, LlmError> {
        let response = request.send().map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn text_at(data: &Value, pointer: &str) -> Result<String, LlmError> {
        data.pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse(format!("missing {pointer}")))
    }

    // ------------------------------------------------------------------------

    pub struct OpenAiClient {
        client: Client,
        api_key: String,
        model: String,
        base_url: String,
    }

    impl OpenAiClient {
        pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
            Ok(Self {
                client: http_client(settings)?,
                api_key: require(&settings.openai_api_key, "openai", "OPENAI_API_KEY")?,
                model: settings.llm_model.clone(),
                base_url: base_url(&settings.openai_base_url, OPENAI_BASE_URL),
            })
        }
    }

    impl LlmClient for OpenAiClient {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let url = format!("{}/v1/chat/completions", self.base_url);
            let body = json!({
                "model": self.model,
                "temperature": 0,
                "messages": [{ "role": "user", "content": prompt }],
            });
            let data = send(self.client.post(&url).bearer_auth(&self.api_key).json(&body))?;
            text_at(&data, "/choices/0/message/content")
        }

        fn name(&self) -> &str {
            "openai"
        }
    }

    // ------------------------------------------------------------------------

    pub struct GeminiClient {
        client: Client,
        api_key: String,
        model: String,
        base_url: String,
    }

    impl GeminiClient {
        pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
            Ok(Self {
                client: http_client(settings)?,
                api_key: require(&settings.gemini_api_key, "gemini", "GEMINI_API_KEY")?,
                model: settings.llm_model.clone(),
                base_url: base_url(&settings.gemini_base_url, GEMINI_BASE_URL),
            })
        }
    }

    impl LlmClient for GeminiClient {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            );
            let body = json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "generationConfig": { "temperature": 0 },
            });
            let data = send(
                self.client
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body),
            )?;
            text_at(&data, "/candidates/0/content/parts/0/text")
        }

        fn name(&self) -> &str {
            "gemini"
        }
    }

    // ------------------------------------------------------------------------

    pub struct AnthropicClient {
        client: Client,
        api_key: String,
        model: String,
        base_url: String,
    }

    impl AnthropicClient {
        pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
            Ok(Self {
                client: http_client(settings)?,
                api_key: require(&settings.anthropic_api_key, "anthropic", "ANTHROPIC_API_KEY")?,
                model: settings.llm_model.clone(),
                base_url: base_url(&settings.anthropic_base_url, ANTHROPIC_BASE_URL),
            })
        }
    }

    impl LlmClient for AnthropicClient {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let url = format!("{}/v1/messages", self.base_url);
            let body = json!({
                "model": self.model,
                "max_tokens": ANTHROPIC_MAX_TOKENS,
                "temperature": 0,
                "messages": [{ "role": "user", "content": prompt }],
            });
            let data = send(
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body),
            )?;
            text_at(&data, "/content/0/text")
        }

        fn name(&self) -> &str {
            "anthropic"
        }
    }

    // ------------------------------------------------------------------------

    pub struct OllamaClient {
        client: Client,
        model: String,
        host: String,
    }

    impl OllamaClient {
        pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
            Ok(Self {
                client: http_client(settings)?,
                model: settings.llm_model.clone(),
                host: base_url(&settings.ollama_host, OLLAMA_HOST),
            })
        }
    }

    impl LlmClient for OllamaClient {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let url = format!("{}/api/chat", self.host);
            let body = json!({
                "model": self.model,
                "stream": false,
                "options": { "temperature": 0 },
                "messages": [{ "role": "user", "content": prompt }],
            });
            let data = send(self.client.post(&url).json(&body))?;
            text_at(&data, "/message/content")
        }

        fn name(&self) -> &str {
            "ollama"
        }
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Canned-reply client. Records every prompt it is given.
pub struct MockLlm {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with a network error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl LlmClient for MockLlm {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        self.reply.clone().map_err(LlmError::Network)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
