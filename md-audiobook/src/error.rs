//! Error taxonomy for the narration pipeline.

use std::path::PathBuf;
use thiserror::Error;
use tts_client::TtsError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid settings or missing credentials; raised before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A chunk could not be synthesized; the enclosing section is abandoned.
    #[error("Synthesis failed for chunk {chunk} of \"{section}\": {source}")]
    Synthesis {
        section: String,
        chunk: usize,
        #[source]
        source: TtsError,
    },

    /// Duration probe failed; callers degrade this to a warning.
    #[error("Could not probe duration of {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// Concatenation or encoding failed for the current book.
    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Wrap a provider construction failure (missing key, voice, bad config).
    pub fn provider_setup(err: TtsError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
