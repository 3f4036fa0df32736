//! Mock speech provider for testing
//!
//! Returns canned audio bytes and can be told to fail on a chosen call, so
//! callers can exercise their section-abort paths without a network.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, TtsError};
use crate::provider::{AudioFormat, TtsAudio, TtsProvider, TtsRequest};

/// A mock provider that records requests and fails on demand
pub struct MockProvider {
    /// 1-based call numbers that fail
    fail_on: Vec<usize>,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure
    fail_with: Option<TtsError>,
    /// Texts received, in call order
    requests: Mutex<Vec<String>>,
    /// Audio returned on success
    audio: Vec<u8>,
    /// Per-request character limit reported to callers
    max_chars: usize,
}

impl MockProvider {
    /// Create a provider that always succeeds with the given bytes
    pub fn always_succeeds(audio: &[u8]) -> Self {
        Self {
            fail_on: Vec::new(),
            call_count: AtomicUsize::new(0),
            fail_with: None,
            requests: Mutex::new(Vec::new()),
            audio: audio.to_vec(),
            max_chars: 4096,
        }
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: TtsError) -> Self {
        Self {
            fail_on: Vec::new(),
            fail_with: Some(error),
            ..Self::always_succeeds(&[])
        }
    }

    /// Create a provider whose `call`-th request (1-based) fails
    pub fn fails_on_call(call: usize, error: TtsError, audio: &[u8]) -> Self {
        Self {
            fail_on: vec![call],
            fail_with: Some(error),
            ..Self::always_succeeds(audio)
        }
    }

    /// Override the reported character limit
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn should_fail(&self, call_num: usize) -> bool {
        match &self.fail_with {
            None => false,
            Some(_) if self.fail_on.is_empty() => true,
            Some(_) => self.fail_on.contains(&call_num),
        }
    }
}

#[async_trait]
impl TtsProvider for MockProvider {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsAudio> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.text.clone());
        }

        if self.should_fail(call_num) {
            if let Some(err) = self.fail_with.as_ref() {
                return Err(clone_error(err));
            }
        }

        Ok(TtsAudio {
            bytes: self.audio.clone(),
            format: AudioFormat::Mp3,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}

/// Clone a TtsError (needed because TtsError doesn't implement Clone)
fn clone_error(err: &TtsError) -> TtsError {
    match err {
        TtsError::MissingApiKey { provider, env_var } => TtsError::MissingApiKey {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        TtsError::MissingVoice { provider, env_var } => TtsError::MissingVoice {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        TtsError::RateLimited { retry_after } => TtsError::RateLimited {
            retry_after: *retry_after,
        },
        TtsError::ApiError {
            message,
            status_code,
        } => TtsError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        TtsError::ConfigError(s) => TtsError::ConfigError(s.clone()),
        // IO and TOML errors can't be cloned; a generic stand-in is enough here
        TtsError::Io(_) => TtsError::ConfigError("IO error (mock)".to_string()),
        TtsError::TomlParse(_) => TtsError::ConfigError("TOML parse error (mock)".to_string()),
        TtsError::TomlSerialize(_) => {
            TtsError::ConfigError("TOML serialize error (mock)".to_string())
        }
    }
}
