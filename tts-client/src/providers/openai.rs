//! OpenAI speech provider
//!
//! Direct HTTP implementation of the `/audio/speech` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::api_failure;
use crate::error::{Result, TtsError};
use crate::provider::{AudioFormat, TtsAudio, TtsProvider, TtsRequest};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub(super) const DEFAULT_MODEL: &str = "tts-1";
pub(super) const DEFAULT_VOICE: &str = "nova";
pub(super) const MAX_CHARS: usize = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Provider for the OpenAI text-to-speech API
pub struct OpenAiProvider {
    model: String,
    voice: String,
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(model: &str, voice: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TtsError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: model.to_string(),
            voice: voice.to_string(),
            base_url: OPENAI_API_URL.to_string(),
            api_key,
            client,
        })
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl TtsProvider for OpenAiProvider {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsAudio> {
        let body = SpeechRequest {
            model: &self.model,
            input: &request.text,
            voice: &self.voice,
        };

        let url = format!("{}/audio/speech", self.base_url);
        log::debug!(
            "OpenAI speech request: {} chars, model {}, voice {}",
            request.text.chars().count(),
            self.model,
            self.voice
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::ApiError {
                message: format!("Request failed: {}", e),
                status_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };
            return Err(api_failure(status.as_u16(), message, retry_after));
        }

        let bytes = response.bytes().await.map_err(|e| TtsError::ApiError {
            message: format!("Failed to read audio body: {}", e),
            status_code: None,
        })?;

        Ok(TtsAudio {
            bytes: bytes.to_vec(),
            format: AudioFormat::Mp3,
        })
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn max_chars(&self) -> usize {
        MAX_CHARS
    }
}
