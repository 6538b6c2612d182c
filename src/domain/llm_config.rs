use serde::{Deserialize, Serialize};

/// Upper bound for a single generation-service round trip.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum LLMProvider {
    Groq,
    OpenAI,
    OpenRouter,
    Local,
    Google,
}

impl LLMProvider {
    /// Endpoint used when the configuration leaves `base_url` blank.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::Groq => "https://api.groq.com/openai/v1",
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Local => "http://localhost:1234/v1",
            LLMProvider::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    /// Blank means the provider's own endpoint.
    #[serde(default)]
    pub base_url: String,
    pub model: String,
    /// Secret reference (`env:NAME`, `keychain:NAME`, `plain:VALUE`) until resolved at startup.
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LLMConfig {
    pub fn resolved_base_url(&self) -> &str {
        let configured = self.base_url.trim();
        if configured.is_empty() {
            self.provider.default_base_url()
        } else {
            configured
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Groq,
            base_url: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            max_tokens: Some(1024),
            temperature: Some(0.0),
        }
    }
}
