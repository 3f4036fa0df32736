//! md-audio configuration: provider choice, pacing and output encoding.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
const DEFAULT_BITRATE: &str = "64k";
const DEFAULT_SILENCE_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudiobookConfig {
    /// Speech provider (openai, elevenlabs)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Character budget per synthesis call. None means the provider's limit.
    #[serde(default)]
    pub max_chars: Option<usize>,

    /// Pause between synthesis calls, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// AAC bitrate for M4B output
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Silence inserted between merged files, in milliseconds
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u64,

    /// Keep per-chunk and per-section audio after assembly
    #[serde(default)]
    pub keep_intermediates: bool,

    /// Default cover image for M4B output
    #[serde(default)]
    pub cover: Option<PathBuf>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_request_delay_ms() -> u64 {
    DEFAULT_REQUEST_DELAY_MS
}

fn default_bitrate() -> String {
    DEFAULT_BITRATE.to_string()
}

fn default_silence_ms() -> u64 {
    DEFAULT_SILENCE_MS
}

impl Default for AudiobookConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_chars: None,
            request_delay_ms: default_request_delay_ms(),
            bitrate: default_bitrate(),
            silence_ms: default_silence_ms(),
            keep_intermediates: false,
            cover: None,
        }
    }
}

impl AudiobookConfig {
    /// Get the config file path: ~/.config/cli-programs/md-audio.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("md-audio.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: AudiobookConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Pause applied between successful synthesis calls
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
