//! Chunk-by-chunk speech synthesis for one section.
//!
//! Calls are strictly sequential: each request is awaited before the next is
//! issued, with a fixed pause between successful calls.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tts_client::{TtsProvider, TtsRequest};

use crate::audio::{AudioSegment, AudioToolkit, probe_or_zero};
use crate::error::{PipelineError, Result};
use crate::text::Chunk;

/// Chunk audio written for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionAudio {
    /// One content segment per chunk, in chunk order
    pub segments: Vec<AudioSegment>,
    /// Chunks whose duration could not be probed
    pub warnings: Vec<String>,
}

impl SectionAudio {
    /// Sum of the probed chunk durations.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .fold(0.0, |total, s| total + s.duration_seconds)
    }

    pub fn files(&self) -> Vec<&Path> {
        self.segments.iter().map(|s| s.source.as_path()).collect()
    }
}

/// Drives a provider over the chunks of a section and records the results.
pub struct SynthesisDriver<'a> {
    provider: &'a dyn TtsProvider,
    toolkit: &'a dyn AudioToolkit,
    work_dir: PathBuf,
    request_delay: Duration,
}

impl<'a> SynthesisDriver<'a> {
    pub fn new(
        provider: &'a dyn TtsProvider,
        toolkit: &'a dyn AudioToolkit,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            toolkit,
            work_dir: work_dir.into(),
            request_delay: Duration::ZERO,
        }
    }

    /// Pause between successful calls.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Where the audio for chunk `index` of `stem` is written.
    pub fn chunk_path(&self, stem: &str, index: usize) -> PathBuf {
        self.work_dir.join(format!(
            "{}_chunk_{}.{}",
            stem,
            index,
            self.provider.file_extension()
        ))
    }

    /// Synthesize every chunk of a section, in order.
    ///
    /// Each chunk's audio is written next to the others in the working
    /// directory and probed for its duration; a failed probe counts as zero
    /// and is returned as a warning. The first provider failure aborts the
    /// section; files written before it are left on disk. `on_chunk` receives
    /// the section title, the finished chunk's index and the chunk count.
    pub async fn synthesize_section<F>(
        &self,
        stem: &str,
        section: &str,
        chunks: &[Chunk],
        mut on_chunk: F,
    ) -> Result<SectionAudio>
    where
        F: FnMut(&str, usize, usize),
    {
        fs::create_dir_all(&self.work_dir)?;

        let mut segments = Vec::with_capacity(chunks.len());
        let mut warnings = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            log::debug!(
                "[{}] chunk {}/{} ({} chars) via {}",
                section,
                index + 1,
                chunks.len(),
                chunk.char_len(),
                self.provider.name()
            );

            let audio = self
                .provider
                .synthesize(&TtsRequest::new(chunk.text.as_str()))
                .await
                .map_err(|source| PipelineError::Synthesis {
                    section: section.to_string(),
                    chunk: index,
                    source,
                })?;

            let path = self.chunk_path(stem, index);
            fs::write(&path, &audio.bytes)?;
            log::debug!(
                "Audio saved: {} ({:.1} KB)",
                path.display(),
                audio.bytes.len() as f64 / 1024.0
            );

            let duration = probe_or_zero(&path, self.toolkit, &mut warnings);
            segments.push(AudioSegment::content(path, duration, index));
            on_chunk(section, index, chunks.len());

            if index + 1 < chunks.len() && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        Ok(SectionAudio { segments, warnings })
    }
}

/// Remove chunk files, logging instead of failing on leftovers.
pub fn remove_chunk_files(segments: &[AudioSegment]) {
    for segment in segments {
        remove_quietly(&segment.source);
    }
}

pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not remove {}: {}", path.display(), e);
    }
}
