//! Speech provider implementations

mod elevenlabs;
pub mod mock;
mod openai;

pub use elevenlabs::ElevenLabsProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;

use std::fmt;
use std::str::FromStr;

use crate::config::ProviderConfig;
use crate::error::{Result, TtsError};
use crate::provider::TtsProvider;

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    ElevenLabs,
}

impl FromStr for ProviderKind {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" | "open_ai" => Ok(Self::OpenAi),
            "elevenlabs" | "eleven-labs" | "eleven_labs" | "11labs" => Ok(Self::ElevenLabs),
            _ => Err(TtsError::ConfigError(format!("Unknown provider: {}", s))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl ProviderKind {
    /// Key used for this provider in the config file
    pub fn key(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
        }
    }

    /// Get the environment variable name for this provider's voice
    pub fn voice_env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_VOICE",
            Self::ElevenLabs => "ELEVENLABS_VOICE_ID",
        }
    }

    /// Per-request character limit enforced by the provider
    pub fn max_chars(&self) -> usize {
        match self {
            Self::OpenAi => openai::MAX_CHARS,
            Self::ElevenLabs => elevenlabs::MAX_CHARS,
        }
    }
}

/// Create a provider instance from its kind and optional config
pub fn get_provider(
    kind: ProviderKind,
    provider_config: Option<&ProviderConfig>,
) -> Result<Box<dyn TtsProvider>> {
    let api_key = get_api_key(provider_config, kind)?;
    let base_url = provider_config.and_then(|c| c.base_url.clone());

    match kind {
        ProviderKind::OpenAi => {
            let voice = setting(provider_config.and_then(|c| c.voice.clone()), kind.voice_env_var())
                .unwrap_or_else(|| openai::DEFAULT_VOICE.to_string());
            let model = setting(provider_config.and_then(|c| c.model.clone()), "OPENAI_TTS_MODEL")
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            let provider = OpenAiProvider::new(&model, &voice, api_key)?;
            Ok(Box::new(match base_url {
                Some(url) => provider.with_base_url(&url),
                None => provider,
            }))
        }
        ProviderKind::ElevenLabs => {
            let voice = setting(provider_config.and_then(|c| c.voice.clone()), kind.voice_env_var())
                .ok_or_else(|| TtsError::MissingVoice {
                    provider: "ElevenLabs".to_string(),
                    env_var: kind.voice_env_var().to_string(),
                })?;
            let model = provider_config
                .and_then(|c| c.model.clone())
                .unwrap_or_else(|| elevenlabs::DEFAULT_MODEL.to_string());
            let provider = ElevenLabsProvider::new(&model, &voice, api_key)?;
            Ok(Box::new(match base_url {
                Some(url) => provider.with_base_url(&url),
                None => provider,
            }))
        }
    }
}

/// Get API key from config or environment variable
fn get_api_key(config: Option<&ProviderConfig>, kind: ProviderKind) -> Result<String> {
    // Check config first
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    // Fall back to environment variable
    std::env::var(kind.env_var()).map_err(|_| TtsError::MissingApiKey {
        provider: kind.to_string(),
        env_var: kind.env_var().to_string(),
    })
}

/// Map a non-success HTTP status to the matching error
pub(crate) fn api_failure(status: u16, message: String, retry_after: Option<u64>) -> TtsError {
    if status == 429 {
        return TtsError::RateLimited { retry_after };
    }

    TtsError::ApiError {
        message,
        status_code: Some(status),
    }
}

/// Seconds from a `Retry-After` header, when it carries a plain number
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Config value first, then a non-empty environment variable
fn setting(configured: Option<String>, env_var: &str) -> Option<String> {
    configured.or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
}
