//! Text-to-speech client library for the md-audio workspace
//!
//! Provides a unified interface over the speech providers used to narrate
//! markdown documents:
//! - OpenAI (`/audio/speech`)
//! - ElevenLabs (`/text-to-speech/{voice}`)
//! - Mock (tests)

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{Config, ProviderConfig};
pub use error::{Result, TtsError};
pub use provider::{AudioFormat, TtsAudio, TtsProvider, TtsRequest};
pub use providers::{MockProvider, ProviderKind, get_provider};
