//! Batch re-encoding of a folder of audio files.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::merge::list_dir;
use crate::audio::{AudioToolkit, CompressFormat};
use crate::error::{PipelineError, Result};

/// Extensions picked up from the input folder.
pub const COMPRESSIBLE_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg", "aac"];

/// A bare number is taken as kilobits: "192" -> "192k".
pub fn normalize_bitrate(bitrate: &str) -> String {
    let bitrate = bitrate.trim();
    if !bitrate.is_empty() && bitrate.chars().all(|c| c.is_ascii_digit()) {
        format!("{}k", bitrate)
    } else {
        bitrate.to_string()
    }
}

fn is_compressible(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            COMPRESSIBLE_EXTENSIONS
                .iter()
                .any(|a| ext.eq_ignore_ascii_case(a))
        })
        .unwrap_or(false)
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// One re-encoded file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl CompressedFile {
    /// Size saved relative to the input, in percent; 0 for an empty input.
    pub fn reduction_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0
    }
}

#[derive(Debug, Default)]
pub struct CompressReport {
    pub compressed: Vec<CompressedFile>,
    /// Inputs that could not be re-encoded, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Re-encode every audio file directly inside `input_dir` into `output_dir`.
///
/// Outputs keep the input's stem with the format's extension. A file that
/// fails to encode is recorded and the rest are still processed. `on_file`
/// is called before each file is started.
pub fn compress_folder<F>(
    toolkit: &dyn AudioToolkit,
    input_dir: &Path,
    output_dir: &Path,
    format: CompressFormat,
    bitrate: Option<&str>,
    mut on_file: F,
) -> Result<CompressReport>
where
    F: FnMut(&Path),
{
    if !input_dir.is_dir() {
        return Err(PipelineError::Configuration(format!(
            "Input folder not found: {}",
            input_dir.display()
        )));
    }

    let bitrate = bitrate
        .map(normalize_bitrate)
        .unwrap_or_else(|| format.default_bitrate().to_string());
    let inputs = list_dir(input_dir, is_compressible);
    fs::create_dir_all(output_dir)?;

    log::info!(
        "Compressing {} file(s) to {} at {}",
        inputs.len(),
        format.extension(),
        bitrate
    );

    let mut report = CompressReport::default();
    for input in inputs {
        on_file(&input);

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = output_dir.join(format!("{}.{}", stem, format.extension()));

        if output == input {
            let message = "output would overwrite the input".to_string();
            log::warn!("{}: {}", input.display(), message);
            report.failed.push((input, message));
            continue;
        }

        match toolkit.transcode(&input, &output, format, &bitrate) {
            Ok(()) => {
                let file = CompressedFile {
                    input_bytes: file_size(&input),
                    output_bytes: file_size(&output),
                    input,
                    output,
                };
                log::debug!(
                    "{} -> {} ({:.1}% smaller)",
                    file.input.display(),
                    file.output.display(),
                    file.reduction_percent()
                );
                report.compressed.push(file);
            }
            Err(e) => {
                log::error!("Error compressing {}: {}", input.display(), e);
                report.failed.push((input, e.to_string()));
            }
        }
    }

    Ok(report)
}
