//! Markdown documents to section audio, and section audio to a chaptered book.
//!
//! Each document gets its own directory under the working directory, named
//! after its position in the book and its name. Sections are synthesized one
//! after another into `NN_<slug>.<ext>` files; a section whose file already
//! exists is skipped, so an interrupted run can be resumed by running it again.

mod compress;
mod merge;

pub use compress::compress_folder;
pub use merge::{
    delete_inputs, encode_files, expand_audio_inputs, merge_audio, sorted_audio_inputs,
};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tts_client::TtsProvider;

use crate::audio::{
    AssemblyPlan, AudioSegment, AudioToolkit, BookMetadata, EncodeOptions, assemble, merge_plans,
    probe_or_zero, title_from_filename,
};
use crate::config::AudiobookConfig;
use crate::error::{PipelineError, Result};
use crate::synthesis::{SynthesisDriver, remove_chunk_files, remove_quietly};
use crate::text::sections::{PREAMBLE_TITLE, section_stem, slugify};
use crate::text::{clean_for_speech, segment, split_by_headings, unique_titles};

/// A named markdown text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Read a document, naming it after the file stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(name, text))
    }

    /// Human-readable title derived from the name: "03_field-notes" -> "Field Notes".
    pub fn title(&self) -> String {
        title_from_filename(&PathBuf::from(format!("{}.md", self.name)))
    }
}

/// Outcome for one section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionStatus {
    /// Synthesized in this run
    Completed(PathBuf),
    /// Audio from an earlier run was found and reused
    AlreadyDone(PathBuf),
    /// Nothing left to narrate after cleaning
    Empty,
    /// Synthesis failed; chunk files written so far are kept
    Failed(String),
}

impl SectionStatus {
    /// The section's audio file, when there is one.
    pub fn audio(&self) -> Option<&Path> {
        match self {
            Self::Completed(path) | Self::AlreadyDone(path) => Some(path),
            Self::Empty | Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionReport {
    /// Unique section title
    pub title: String,
    /// File stem of the section audio
    pub stem: String,
    pub chunks: usize,
    pub oversized_chunks: usize,
    /// Narrated length from the chunk probes; 0 when nothing was synthesized
    pub duration_seconds: f64,
    /// Chunks whose duration could not be probed
    pub warnings: Vec<String>,
    pub status: SectionStatus,
}

/// What happened to every section of a document, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub name: String,
    pub title: String,
    pub sections: Vec<SectionReport>,
}

impl DocumentReport {
    pub fn failed(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s.status, SectionStatus::Failed(_)))
            .count()
    }

    /// Chapter title for a section; the preamble is named after the document.
    fn chapter_title(&self, section: &SectionReport) -> String {
        if section.title == PREAMBLE_TITLE {
            self.title.clone()
        } else {
            section.title.clone()
        }
    }

    /// Build the chapter plan for this document's section files.
    ///
    /// Every file is probed; a failed probe counts as zero seconds and is
    /// recorded in the plan's warnings, after any chunk probe warnings.
    pub fn plan(&self, metadata: BookMetadata, toolkit: &dyn AudioToolkit) -> AssemblyPlan {
        let mut warnings = Vec::new();
        let mut titles = Vec::new();
        let mut segments = Vec::new();

        for section in &self.sections {
            warnings.extend(section.warnings.iter().cloned());
            if let Some(path) = section.status.audio() {
                let duration = probe_or_zero(path, toolkit, &mut warnings);
                segments.push(AudioSegment::content(path, duration, segments.len()));
                titles.push(self.chapter_title(section));
            }
        }

        let mut plan = assemble(
            &segments,
            |segment| {
                titles
                    .get(segment.order)
                    .cloned()
                    .unwrap_or_else(|| title_from_filename(&segment.source))
            },
            metadata,
        );
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;
        plan
    }
}

/// Result of a whole book run.
#[derive(Debug, Clone)]
pub struct BookReport {
    pub documents: Vec<DocumentReport>,
    /// The encoded plan; `None` when failed sections prevented encoding
    pub plan: Option<AssemblyPlan>,
}

impl BookReport {
    pub fn failed(&self) -> usize {
        self.documents.iter().map(DocumentReport::failed).sum()
    }
}

/// Run-time knobs for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Character budget per call; `None` uses the provider's limit
    pub max_chars: Option<usize>,
    pub request_delay: Duration,
    pub keep_intermediates: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_chars: None,
            request_delay: Duration::ZERO,
            keep_intermediates: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AudiobookConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            request_delay: config.request_delay(),
            keep_intermediates: config.keep_intermediates,
        }
    }
}

pub struct Pipeline<'a> {
    provider: &'a dyn TtsProvider,
    toolkit: &'a dyn AudioToolkit,
    work_dir: PathBuf,
    max_chars: usize,
    request_delay: Duration,
    keep_intermediates: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline, resolving the character budget against the provider.
    ///
    /// A zero budget is rejected; a budget above the provider's limit is
    /// lowered to that limit.
    pub fn new(
        provider: &'a dyn TtsProvider,
        toolkit: &'a dyn AudioToolkit,
        work_dir: impl Into<PathBuf>,
        options: &PipelineOptions,
    ) -> Result<Self> {
        let limit = provider.max_chars();
        let max_chars = match options.max_chars {
            Some(0) => {
                return Err(PipelineError::Configuration(
                    "max_chars must be greater than zero".to_string(),
                ));
            }
            Some(n) if n > limit => {
                log::warn!(
                    "max_chars {} exceeds the {} limit of {}, using {}",
                    n,
                    provider.name(),
                    limit,
                    limit
                );
                limit
            }
            Some(n) => n,
            None => limit,
        };

        Ok(Self {
            provider,
            toolkit,
            work_dir: work_dir.into(),
            max_chars,
            request_delay: options.request_delay,
            keep_intermediates: options.keep_intermediates,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Directory holding the chunk and section audio of the document at
    /// `index` (0-based) in the book.
    ///
    /// The ordinal keeps documents that share a name apart, e.g. two
    /// `notes.md` files from different folders.
    pub fn document_dir(&self, index: usize, document: &Document) -> PathBuf {
        self.work_dir
            .join(format!("{:02}_{}", index + 1, slugify(&document.name)))
    }

    /// Narrate every section of a document into its own audio file.
    ///
    /// A section whose synthesis fails is reported as failed and the next
    /// section is attempted. Errors that are not tied to one section, such
    /// as a failed concatenation or filesystem errors, abort the document.
    pub async fn run_document<F>(
        &self,
        index: usize,
        document: &Document,
        mut on_chunk: F,
    ) -> Result<DocumentReport>
    where
        F: FnMut(&str, usize, usize),
    {
        let dir = self.document_dir(index, document);
        fs::create_dir_all(&dir)?;

        let driver = SynthesisDriver::new(self.provider, self.toolkit, &dir)
            .with_request_delay(self.request_delay);
        let extension = self.provider.file_extension();

        let sections: Vec<_> = split_by_headings(&document.text)
            .into_iter()
            .filter(|s| !s.is_blank())
            .collect();
        let titles = unique_titles(&sections);
        log::info!("{}: {} section(s)", document.name, sections.len());

        let mut reports = Vec::with_capacity(sections.len());

        for (index, (section, title)) in sections.iter().zip(titles).enumerate() {
            let stem = section_stem(index, &title);
            let output = dir.join(format!("{}.{}", stem, extension));

            let mut report = SectionReport {
                title,
                stem,
                chunks: 0,
                oversized_chunks: 0,
                duration_seconds: 0.0,
                warnings: Vec::new(),
                status: SectionStatus::Empty,
            };

            if output.exists() {
                log::info!("[{}] already done: {}", report.title, output.display());
                report.status = SectionStatus::AlreadyDone(output);
                reports.push(report);
                continue;
            }

            let chunks = segment(&clean_for_speech(&section.content), self.max_chars)?;
            report.chunks = chunks.len();
            report.oversized_chunks = chunks.iter().filter(|c| c.oversized).count();

            if chunks.is_empty() {
                log::info!("[{}] nothing to narrate", report.title);
                reports.push(report);
                continue;
            }

            log::info!("[{}] {} chunk(s)", report.title, chunks.len());

            let synthesized = driver
                .synthesize_section(&report.stem, &report.title, &chunks, &mut on_chunk)
                .await;
            match synthesized {
                Ok(audio) => {
                    self.join_section(&audio.files(), &output, extension)?;
                    if !self.keep_intermediates {
                        remove_chunk_files(&audio.segments);
                    }
                    report.duration_seconds = audio.duration_seconds();
                    report.warnings = audio.warnings;
                    report.status = SectionStatus::Completed(output);
                }
                Err(e @ PipelineError::Synthesis { .. }) => {
                    log::error!("{}", e);
                    report.status = SectionStatus::Failed(e.to_string());
                }
                Err(e) => return Err(e),
            }

            reports.push(report);
        }

        Ok(DocumentReport {
            name: document.name.clone(),
            title: document.title(),
            sections: reports,
        })
    }

    /// Concatenate chunk audio into the section file.
    ///
    /// Output goes to a `.part` file first so that an interrupted join is
    /// never mistaken for finished work.
    fn join_section(&self, files: &[&Path], output: &Path, extension: &str) -> Result<()> {
        let partial = output.with_extension(format!("part.{}", extension));
        self.toolkit.concat(files, &partial)?;
        fs::rename(&partial, output)?;
        Ok(())
    }

    /// Narrate documents in order and encode them into one chaptered M4B.
    ///
    /// Every section becomes a chapter. When any section failed, encoding is
    /// skipped and the finished section files are left in place for a rerun.
    pub async fn run_book<F>(
        &self,
        documents: &[Document],
        metadata: BookMetadata,
        output: &Path,
        options: &EncodeOptions,
        mut on_chunk: F,
    ) -> Result<BookReport>
    where
        F: FnMut(&str, usize, usize),
    {
        let mut reports = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            reports.push(self.run_document(index, document, &mut on_chunk).await?);
        }

        let failed: usize = reports.iter().map(DocumentReport::failed).sum();
        if failed > 0 {
            log::error!("{} section(s) failed; skipping M4B encoding", failed);
            return Ok(BookReport {
                documents: reports,
                plan: None,
            });
        }

        let plans = reports
            .iter()
            .map(|r| r.plan(metadata.clone(), self.toolkit))
            .collect();
        let plan = merge_plans(plans, metadata);

        if plan.segments.is_empty() {
            return Err(PipelineError::Assembly(
                "No audio files generated".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(repeated) = plan.sources().into_iter().find(|s| !seen.insert(*s)) {
            return Err(PipelineError::Assembly(format!(
                "{} would be used for more than one chapter",
                repeated.display()
            )));
        }

        log::info!(
            "Encoding {} chapter(s), {:.1}s total",
            plan.chapters.len(),
            plan.total_duration()
        );
        self.toolkit.encode_m4b(&plan, output, options)?;

        if !self.keep_intermediates {
            for source in plan.sources() {
                remove_quietly(source);
            }
            for (index, document) in documents.iter().enumerate() {
                // Only succeeds once the directory is empty
                let _ = fs::remove_dir(self.document_dir(index, document));
            }
        }

        Ok(BookReport {
            documents: reports,
            plan: Some(plan),
        })
    }
}
