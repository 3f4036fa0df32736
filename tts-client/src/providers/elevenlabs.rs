//! ElevenLabs speech provider

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::api_failure;
use crate::error::{Result, TtsError};
use crate::provider::{AudioFormat, TtsAudio, TtsProvider, TtsRequest};

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";
pub(super) const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
pub(super) const MAX_CHARS: usize = 5000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Provider for the ElevenLabs text-to-speech API
pub struct ElevenLabsProvider {
    model: String,
    voice_id: String,
    base_url: String,
    api_key: String,
    client: Client,
}

impl ElevenLabsProvider {
    /// Create a new ElevenLabs provider for one voice
    pub fn new(model: &str, voice_id: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TtsError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: model.to_string(),
            voice_id: voice_id.to_string(),
            base_url: ELEVENLABS_API_URL.to_string(),
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
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsAudio> {
        let body = SpeechRequest {
            text: &request.text,
            model_id: &self.model,
            voice_settings: VoiceSettings::default(),
        };

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
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
            let message = response.text().await.unwrap_or_default();
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
        "ElevenLabs"
    }

    fn max_chars(&self) -> usize {
        MAX_CHARS
    }
}
