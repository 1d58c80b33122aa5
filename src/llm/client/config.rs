//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_SEGMENTATION_PROMPT;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI Responses API (default)
    #[default]
    OpenAI,
    /// OpenAI-compatible chat completions (Groq, Together.ai, etc.)
    Chat,
    /// Ollama API (local)
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "responses" => Some(Self::OpenAI),
            "chat" | "groq" | "together" => Some(Self::Chat),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Chat => "chat",
            Self::Ollama => "ollama",
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI | Self::Chat => "https://api.openai.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Whether requests carry a bearer token.
    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

/// Configuration for LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (openai, chat, or ollama)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint; the provider's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API key; never written back to config files
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model to use for segmentation
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature; the service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens in response; the service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Request timeout in seconds; no timeout when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Custom instruction prompt replacing the default segmentation prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides.
    pub fn base_default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: None,
            api_key: None,
            model: default_model(),
            temperature: None,
            max_output_tokens: None,
            timeout_secs: None,
            instructions: None,
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_PROVIDER`: "openai" (default), "chat"/"groq"/"together", or "ollama"
    /// - `LLM_ENDPOINT`: API endpoint
    /// - `LLM_API_KEY`: API key, wins over provider-specific keys
    /// - `OPENAI_API_KEY` / `GROQ_API_KEY`: provider-specific keys
    /// - `LLM_MODEL`: Model name
    /// - `LLM_TIMEOUT_SECS`: Request timeout
    /// - `LLM_INSTRUCTIONS`: Custom instruction prompt
    ///
    /// `LLM_PROVIDER=groq` also points the endpoint at Groq unless
    /// `LLM_ENDPOINT` is set.
    pub fn with_env_overrides(mut self) -> Self {
        let explicit_provider = std::env::var("LLM_PROVIDER").ok();
        if let Some(provider) = explicit_provider.as_deref().and_then(LlmProvider::from_str) {
            self.provider = provider;
        }

        if let Ok(endpoint) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = Some(endpoint);
        } else if explicit_provider
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("groq"))
        {
            self.endpoint = Some("https://api.groq.com/openai".to_string());
        } else if explicit_provider
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("together"))
        {
            self.endpoint = Some("https://api.together.xyz".to_string());
        }

        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.api_key = Some(key);
        } else {
            let var = match explicit_provider.as_deref().map(str::to_lowercase).as_deref() {
                Some("groq") => "GROQ_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            if let Ok(key) = std::env::var(var) {
                self.api_key = Some(key);
            }
        }

        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = Some(n);
            }
        }
        if let Ok(val) = std::env::var("LLM_INSTRUCTIONS") {
            self.instructions = Some(val);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Endpoint without a trailing slash.
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
            .trim_end_matches('/')
    }

    /// Get the instruction prompt, using custom or default.
    pub fn get_instructions(&self) -> &str {
        self.instructions
            .as_deref()
            .unwrap_or(DEFAULT_SEGMENTATION_PROMPT)
    }

    /// Hint shown when the client cannot authenticate.
    pub fn availability_hint(&self) -> String {
        if self.provider.needs_api_key() && self.api_key.is_none() {
            "No API key configured. Set OPENAI_API_KEY or LLM_API_KEY.".to_string()
        } else {
            format!(
                "{} at {} (model: {})",
                self.provider.as_str(),
                self.effective_endpoint(),
                self.model
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_default() {
        let config = LlmConfig::base_default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.effective_endpoint(), "https://api.openai.com");
        assert!(config.timeout_secs.is_none());
        assert!(config.get_instructions().contains("falling_action"));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(LlmProvider::from_str("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("groq"), Some(LlmProvider::Chat));
        assert_eq!(LlmProvider::from_str("ollama"), Some(LlmProvider::Ollama));
        assert_eq!(LlmProvider::from_str("bard"), None);
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = LlmConfig::base_default().with_endpoint("http://localhost:8080/");
        assert_eq!(config.effective_endpoint(), "http://localhost:8080");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = LlmConfig::base_default();
        config.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LlmConfig =
            toml::from_str("provider = \"ollama\"\nmodel = \"llama3\"").unwrap();
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.effective_endpoint(), "http://localhost:11434");
        assert_eq!(config.model, "llama3");
    }

    #[test]
    fn test_custom_instructions() {
        let mut config = LlmConfig::base_default();
        config.instructions = Some("Summarize.".to_string());
        assert_eq!(config.get_instructions(), "Summarize.");
    }
}
