//! Chapter timing for concatenated audio.
//!
//! Chapters are laid end to end: each segment starts where the previous one
//! ended, so the chapter list has no gaps or overlaps and its last end equals
//! the total duration.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::toolkit::AudioToolkit;

/// Leading ordinal such as "01_", "2-" or "003 ".
static ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[\s_-]+").expect("ordinal prefix pattern is valid"));

/// What a segment contributes to the chapter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Narrated audio; starts a chapter
    Content,
    /// Inserted pause; extends the neighbouring chapter
    Silence,
}

/// One audio file in playback order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSegment {
    pub source: PathBuf,
    pub duration_seconds: f64,
    pub order: usize,
    pub kind: SegmentKind,
}

impl AudioSegment {
    /// Create a narrated segment.
    pub fn content(source: impl Into<PathBuf>, duration_seconds: f64, order: usize) -> Self {
        Self {
            source: source.into(),
            duration_seconds,
            order,
            kind: SegmentKind::Content,
        }
    }

    /// Create a silence segment.
    pub fn silence(source: impl Into<PathBuf>, duration_seconds: f64, order: usize) -> Self {
        Self {
            kind: SegmentKind::Silence,
            ..Self::content(source, duration_seconds, order)
        }
    }
}

/// A named interval of the final audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            title: title.into(),
            start_seconds,
            end_seconds,
        }
    }

    /// Start in whole milliseconds (truncated).
    pub fn start_ms(&self) -> u64 {
        seconds_to_ms(self.start_seconds)
    }

    /// End in whole milliseconds (truncated).
    pub fn end_ms(&self) -> u64 {
        seconds_to_ms(self.end_seconds)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0) as u64
}

/// Book-level tags written into the container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: i32,
}

impl BookMetadata {
    /// Metadata dated with the current year.
    pub fn new(title: Option<String>, author: Option<String>) -> Self {
        Self {
            title,
            author,
            year: chrono::Local::now().year(),
        }
    }
}

/// Everything the encoder needs: ordered sources, chapter timing and tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyPlan {
    pub segments: Vec<AudioSegment>,
    pub chapters: Vec<Chapter>,
    pub metadata: BookMetadata,
    /// Degraded inputs, e.g. segments whose duration could not be probed
    pub warnings: Vec<String>,
}

impl AssemblyPlan {
    /// Sum of all segment durations in playback order, silence included.
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .fold(0.0, |total, s| total + s.duration_seconds)
    }

    /// Segment sources in playback order.
    pub fn sources(&self) -> Vec<&Path> {
        self.segments.iter().map(|s| s.source.as_path()).collect()
    }
}

/// Lay segments end to end and name a chapter for every content segment.
///
/// Segments are taken in `order`. Silence never starts a chapter: it extends
/// the preceding chapter, or when it leads, is folded into the next one.
/// Negative or non-finite durations are treated as zero.
pub fn assemble<F>(segments: &[AudioSegment], title_fn: F, metadata: BookMetadata) -> AssemblyPlan
where
    F: Fn(&AudioSegment) -> String,
{
    let mut ordered = segments.to_vec();
    ordered.sort_by_key(|s| s.order);

    let mut warnings = Vec::new();
    let mut chapters: Vec<Chapter> = Vec::with_capacity(ordered.len());
    let mut cursor = 0.0_f64;
    let mut leading_start: Option<f64> = None;

    for segment in &mut ordered {
        if !segment.duration_seconds.is_finite() || segment.duration_seconds < 0.0 {
            let message = format!(
                "{}: invalid duration {}, using 0",
                segment.source.display(),
                segment.duration_seconds
            );
            log::warn!("{}", message);
            warnings.push(message);
            segment.duration_seconds = 0.0;
        }

        let end = cursor + segment.duration_seconds;
        match segment.kind {
            SegmentKind::Content => {
                let start = leading_start.take().unwrap_or(cursor);
                chapters.push(Chapter::new(title_fn(segment), start, end));
            }
            SegmentKind::Silence => match chapters.last_mut() {
                Some(last) => last.end_seconds = end,
                None => {
                    leading_start.get_or_insert(cursor);
                }
            },
        }
        cursor = end;
    }

    AssemblyPlan {
        segments: ordered,
        chapters,
        metadata,
        warnings,
    }
}

/// Concatenate plans in order and re-time every chapter with one cursor.
///
/// Chapter titles are kept; their boundaries are recomputed over the joined
/// segment list so the last chapter ends exactly at the book's total duration.
/// Silence that leads a later plan extends the chapter before it.
pub fn merge_plans(plans: Vec<AssemblyPlan>, metadata: BookMetadata) -> AssemblyPlan {
    let mut segments = Vec::new();
    let mut titles: Vec<Option<String>> = Vec::new();
    let mut warnings = Vec::new();

    for plan in plans {
        let content = plan
            .segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Content)
            .count();
        let mut plan_titles = if plan.chapters.len() == content {
            plan.chapters.into_iter().map(|c| c.title).collect()
        } else {
            Vec::new()
        }
        .into_iter();

        for segment in plan.segments {
            let title = match segment.kind {
                SegmentKind::Content => plan_titles.next(),
                SegmentKind::Silence => None,
            };
            titles.push(title);
            let order = segments.len();
            segments.push(AudioSegment { order, ..segment });
        }

        warnings.extend(plan.warnings);
    }

    let mut merged = assemble(
        &segments,
        |segment| {
            titles
                .get(segment.order)
                .cloned()
                .flatten()
                .unwrap_or_else(|| title_from_filename(&segment.source))
        },
        metadata,
    );
    warnings.append(&mut merged.warnings);
    merged.warnings = warnings;
    merged
}

/// Chapter title from a file name: "02_The_Journey.mp3" -> "The Journey".
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = ORDINAL_PREFIX.replace(&stem, "");
    let spaced = name.replace(['_', '-'], " ");
    let title = title_case(&spaced);

    if title.trim().is_empty() { stem } else { title }
}

/// Capitalize the first letter of each space-separated word, lowercase the rest.
fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Probe a file's duration, degrading a failure to 0.0 and a warning.
pub fn probe_or_zero(
    path: &Path,
    toolkit: &dyn AudioToolkit,
    warnings: &mut Vec<String>,
) -> f64 {
    match toolkit.probe_duration(path) {
        Ok(duration) => duration,
        Err(e) => {
            log::warn!("{}; chapter timing after it will shift", e);
            warnings.push(e.to_string());
            0.0
        }
    }
}

/// Build content segments for existing files, probing each duration.
///
/// A failed probe counts as zero seconds and is returned as a warning; later
/// chapters shift accordingly.
pub fn probe_segments(
    files: &[PathBuf],
    toolkit: &dyn AudioToolkit,
) -> (Vec<AudioSegment>, Vec<String>) {
    let mut warnings = Vec::new();

    let segments = files
        .iter()
        .enumerate()
        .map(|(order, file)| {
            let duration = probe_or_zero(file, toolkit, &mut warnings);
            AudioSegment::content(file.clone(), duration, order)
        })
        .collect();

    (segments, warnings)
}
