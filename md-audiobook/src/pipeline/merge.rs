//! Working with audio files that already exist: merging and M4B packaging.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::audio::{
    AssemblyPlan, AudioSegment, AudioToolkit, BookMetadata, EncodeOptions, assemble,
    probe_segments, title_from_filename,
};
use crate::error::{PipelineError, Result};
use crate::synthesis::remove_quietly;

/// Extensions picked up when a directory is given as input.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "aac"];

static WILDCARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*?]").expect("wildcard pattern is valid"));

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Translate a file-name wildcard (`*`, `?`) into an anchored regex.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).ok()
}

/// Files in `dir` accepted by `keep`, sorted by name.
pub(crate) fn list_dir(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && keep(p))
                .collect();
            files.sort();
            files
        }
        Err(e) => {
            log::warn!("Could not read {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

/// Expand inputs into audio files, keeping the order they were given in.
///
/// Directories contribute their audio files and a wildcard in the file name
/// matches within its directory; each expansion is sorted by name. Explicit
/// files stay where they were listed and missing files are skipped with a
/// warning.
pub fn expand_audio_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if WILDCARD.is_match(&name) {
            let dir = match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if let Some(pattern) = wildcard_regex(&name) {
                files.extend(list_dir(dir, |p| {
                    p.file_name()
                        .map(|n| pattern.is_match(&n.to_string_lossy()))
                        .unwrap_or(false)
                }));
            }
        } else if input.is_dir() {
            files.extend(list_dir(input, is_audio));
        } else if input.exists() {
            files.push(input.clone());
        } else {
            log::warn!("File not found: {}", input.display());
        }
    }

    files
}

/// Expand inputs into a sorted, duplicate-free list of audio files.
pub fn sorted_audio_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    expand_audio_inputs(inputs)
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Join `inputs` into `output` with `silence_ms` of silence between files.
///
/// Returns the plan that was concatenated; its chapters describe where each
/// input landed.
pub fn merge_audio(
    toolkit: &dyn AudioToolkit,
    inputs: &[PathBuf],
    output: &Path,
    silence_ms: u64,
) -> Result<AssemblyPlan> {
    let Some(first) = inputs.first() else {
        return Err(PipelineError::Assembly("No audio files provided".to_string()));
    };
    if let Some(missing) = inputs.iter().find(|p| !p.exists()) {
        return Err(PipelineError::Assembly(format!(
            "File not found: {}",
            missing.display()
        )));
    }

    let (content, warnings) = probe_segments(inputs, toolkit);

    let temp_dir = TempDir::new()?;
    let mut segments = Vec::with_capacity(content.len() * 2);
    if silence_ms > 0 && content.len() > 1 {
        let extension = first
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp3".to_string());
        let silence = temp_dir.path().join(format!("silence.{}", extension));
        toolkit.render_silence(silence_ms, first, &silence)?;
        let seconds = silence_ms as f64 / 1000.0;

        let count = content.len();
        for (i, segment) in content.into_iter().enumerate() {
            segments.push(AudioSegment {
                order: segments.len(),
                ..segment
            });
            if i + 1 < count {
                segments.push(AudioSegment::silence(&silence, seconds, segments.len()));
            }
        }
    } else {
        segments = content;
    }

    let mut plan = assemble(
        &segments,
        |s| title_from_filename(&s.source),
        BookMetadata::new(None, None),
    );
    plan.warnings.extend(warnings);

    toolkit.concat(&plan.sources(), output)?;
    Ok(plan)
}

/// Package existing audio files into an M4B, one chapter per file.
pub fn encode_files(
    toolkit: &dyn AudioToolkit,
    files: &[PathBuf],
    metadata: BookMetadata,
    output: &Path,
    options: &EncodeOptions,
) -> Result<AssemblyPlan> {
    if files.is_empty() {
        return Err(PipelineError::Assembly("No input files found".to_string()));
    }

    let (segments, warnings) = probe_segments(files, toolkit);
    let mut plan = assemble(&segments, |s| title_from_filename(&s.source), metadata);
    plan.warnings.extend(warnings);

    toolkit.encode_m4b(&plan, output, options)?;
    Ok(plan)
}

/// Delete merged inputs, never touching the output itself.
pub fn delete_inputs(inputs: &[PathBuf], output: &Path) -> usize {
    let mut deleted = 0;
    for input in inputs.iter().filter(|p| p.as_path() != output) {
        remove_quietly(input);
        if !input.exists() {
            deleted += 1;
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::toolkit::FakeToolkit;
    use crate::audio::{Chapter, SegmentKind};
    use std::fs;

    fn write_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("ch*.mp3").unwrap();
        assert!(re.is_match("ch01.mp3"));
        assert!(!re.is_match("ch01.mp3.bak"));
        assert!(!re.is_match("xch01.mp3"));
        assert!(wildcard_regex("?.wav").unwrap().is_match("a.wav"));
    }

    #[test]
    fn test_expand_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let book = root.join("book");
        fs::create_dir_all(&book).unwrap();
        write_files(&book, &["02.mp3", "01.M4A", "cover.jpg"]);
        write_files(root, &["ch2.mp3", "ch1.mp3", "other.mp3"]);

        let files = expand_audio_inputs(&[
            root.join("other.mp3"),
            book.clone(),
            root.join("ch*.mp3"),
            root.join("missing.mp3"),
        ]);

        assert_eq!(
            files,
            vec![
                root.join("other.mp3"),
                book.join("01.M4A"),
                book.join("02.mp3"),
                root.join("ch1.mp3"),
                root.join("ch2.mp3"),
            ]
        );
    }

    #[test]
    fn test_expand_inputs_keeps_listed_order() {
        let temp_dir = TempDir::new().unwrap();
        let files = write_files(temp_dir.path(), &["c.mp3", "a.mp3"]);

        assert_eq!(expand_audio_inputs(&files), files);
    }

    #[test]
    fn test_sorted_inputs_drop_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_files(root, &["c.mp3", "a.mp3", "b.wav"]);

        let files = sorted_audio_inputs(&[
            root.join("c.mp3"),
            root.join("*.mp3"),
            root.to_path_buf(),
        ]);

        assert_eq!(
            files,
            vec![root.join("a.mp3"), root.join("b.wav"), root.join("c.mp3")]
        );
    }

    #[test]
    fn test_merge_inserts_silence_between_files() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_files(temp_dir.path(), &["01_a.mp3", "02_b.mp3", "03_c.mp3"]);
        let output = temp_dir.path().join("merged.mp3");
        let toolkit = FakeToolkit::new(10.0);

        let plan = merge_audio(&toolkit, &inputs, &output, 500).unwrap();

        let kinds: Vec<SegmentKind> = plan.segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Content,
                SegmentKind::Silence,
                SegmentKind::Content,
                SegmentKind::Silence,
                SegmentKind::Content,
            ]
        );
        assert_eq!(plan.total_duration(), 31.0);
        assert_eq!(plan.chapters[0], Chapter::new("A", 0.0, 10.5));
        assert_eq!(plan.chapters[2], Chapter::new("C", 21.0, 31.0));
        assert_eq!(fs::read(&output).unwrap(), b"01_a.mp302_b.mp303_c.mp3");
    }

    #[test]
    fn test_merge_without_silence() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_files(temp_dir.path(), &["a.mp3", "b.mp3"]);
        let output = temp_dir.path().join("merged.mp3");
        let toolkit = FakeToolkit::new(2.0);

        let plan = merge_audio(&toolkit, &inputs, &output, 0).unwrap();
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.total_duration(), 4.0);
    }

    #[test]
    fn test_merge_rejects_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let toolkit = FakeToolkit::new(2.0);
        let result = merge_audio(
            &toolkit,
            &[temp_dir.path().join("gone.mp3")],
            &temp_dir.path().join("out.mp3"),
            500,
        );
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
        assert!(matches!(
            merge_audio(&toolkit, &[], &temp_dir.path().join("out.mp3"), 500),
            Err(PipelineError::Assembly(_))
        ));
    }

    #[test]
    fn test_encode_files_names_chapters_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_files(temp_dir.path(), &["01_Intro.mp3", "02_The_Journey.mp3"]);
        let output = temp_dir.path().join("book.m4b");
        let toolkit = FakeToolkit::new(60.0).failing_probe("02_The_Journey.mp3");
        let metadata = BookMetadata::new(Some("Book".to_string()), None);

        let plan =
            encode_files(&toolkit, &inputs, metadata, &output, &EncodeOptions::default()).unwrap();

        assert_eq!(plan.chapters[1], Chapter::new("The Journey", 60.0, 60.0));
        assert_eq!(plan.warnings.len(), 1);
        let encoded = fs::read_to_string(&output).unwrap();
        assert!(encoded.contains("title=Intro"));
        assert!(encoded.contains("title=The Journey"));
    }

    #[test]
    fn test_encode_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_files(temp_dir.path(), &["a.mp3"]);
        let toolkit = FakeToolkit::new(1.0).failing_encode();

        let result = encode_files(
            &toolkit,
            &inputs,
            BookMetadata::new(None, None),
            &temp_dir.path().join("book.m4b"),
            &EncodeOptions::default(),
        );
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }

    #[test]
    fn test_delete_inputs_spares_output() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = write_files(temp_dir.path(), &["a.mp3", "b.mp3"]);

        let deleted = delete_inputs(&inputs, &inputs[1]);
        assert_eq!(deleted, 1);
        assert!(!inputs[0].exists());
        assert!(inputs[1].exists());
    }
}
