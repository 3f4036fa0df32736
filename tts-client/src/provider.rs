use async_trait::async_trait;

use crate::error::Result;

/// Request to send to a speech provider
#[derive(Debug, Clone)]
pub struct TtsRequest {
    pub text: String,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Container format of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }
}

/// Synthesized audio returned by a provider
#[derive(Debug, Clone)]
pub struct TtsAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// Trait for speech providers
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize one request into encoded audio
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsAudio>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Largest input, in characters, the provider accepts per request
    fn max_chars(&self) -> usize;

    /// Format of the audio this provider returns
    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    /// Extension for files holding this provider's audio
    fn file_extension(&self) -> &'static str {
        self.format().extension()
    }
}
