//! Audio probing, concatenation and encoding through ffmpeg/ffprobe.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use super::assembler::AssemblyPlan;
use super::metadata::write_ffmetadata;
use crate::error::{PipelineError, Result};

/// Sample rate used for silence when the reference file cannot be probed.
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Settings for the final M4B encode.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// AAC bitrate, e.g. "64k"
    pub bitrate: String,
    /// Optional cover image attached as the video stream
    pub cover: Option<PathBuf>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            bitrate: "64k".to_string(),
            cover: None,
        }
    }
}

/// Target of a batch re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompressFormat {
    Mp3,
    /// AAC audio in an M4A container
    Aac,
    M4a,
}

impl CompressFormat {
    /// Extension of the written files; AAC is always wrapped in M4A.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac | Self::M4a => "m4a",
        }
    }

    pub fn default_bitrate(self) -> &'static str {
        match self {
            Self::Mp3 => "320k",
            Self::Aac | Self::M4a => "256k",
        }
    }

    fn ffmpeg_codec(self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Aac | Self::M4a => "aac",
        }
    }

    fn ffmpeg_muxer(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac | Self::M4a => "ipod",
        }
    }
}

/// The audio operations the pipeline depends on.
pub trait AudioToolkit: Send + Sync {
    /// Duration of an audio file in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Join files in order without gaps into `output`.
    fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()>;

    /// Concatenate the plan's segments and encode an M4B with chapter markers.
    fn encode_m4b(&self, plan: &AssemblyPlan, output: &Path, options: &EncodeOptions)
    -> Result<()>;

    /// Re-encode one file into `format` at `bitrate`.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: CompressFormat,
        bitrate: &str,
    ) -> Result<()>;

    /// Write `duration_ms` of silence matching the format of `reference`.
    fn render_silence(&self, duration_ms: u64, reference: &Path, output: &Path) -> Result<()>;

    /// Whether the underlying tools can be executed.
    fn is_available(&self) -> bool;
}

/// Toolkit backed by the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegToolkit {
    fn ffmpeg_command(&self) -> Command {
        Command::new(&self.ffmpeg)
    }

    fn ffprobe_command(&self) -> Command {
        Command::new(&self.ffprobe)
    }

    /// Sample rate and channel count of the first audio stream.
    fn stream_format(&self, path: &Path) -> Option<(u32, u32)> {
        let output = self
            .ffprobe_command()
            .args([
                "-v",
                "error",
                "-select_streams",
                "a:0",
                "-show_entries",
                "stream=sample_rate,channels",
                "-of",
                "default=noprint_wrappers=1",
            ])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        parse_stream_format(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `sample_rate=…` / `channels=…` lines printed by ffprobe.
fn parse_stream_format(text: &str) -> Option<(u32, u32)> {
    let mut sample_rate = None;
    let mut channels = None;

    for line in text.lines() {
        match line.trim().split_once('=') {
            Some(("sample_rate", value)) => sample_rate = value.parse().ok(),
            Some(("channels", value)) => channels = value.parse().ok(),
            _ => {}
        }
    }

    Some((sample_rate?, channels?))
}

/// Write a concat-demuxer list file for `inputs`.
///
/// ffmpeg resolves relative entries against the list file's directory, so
/// every entry is made absolute against the current directory first.
fn write_concat_list(inputs: &[&Path], list_file: &Path) -> Result<()> {
    let mut list_content = String::new();
    for path in inputs {
        let absolute = std::path::absolute(path)?;
        // Escape single quotes in path
        let path_str = absolute.to_string_lossy().replace('\'', "'\\''");
        list_content.push_str(&format!("file '{}'\n", path_str));
    }
    std::fs::write(list_file, list_content)?;
    Ok(())
}

/// Run a command, turning spawn failures and non-zero exits into assembly errors.
fn run(cmd: &mut Command, what: &str) -> Result<Output> {
    log::debug!("Running {:?}", cmd);
    let output = cmd
        .output()
        .map_err(|e| PipelineError::Assembly(format!("Failed to run {}: {}", what, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Assembly(format!(
            "{} failed: {}",
            what,
            stderr.trim()
        )));
    }

    Ok(output)
}

impl AudioToolkit for FfmpegToolkit {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let probe_error = |message: String| PipelineError::Probe {
            path: path.to_path_buf(),
            message,
        };

        let output = self
            .ffprobe_command()
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| probe_error(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_error(stderr.trim().to_string()));
        }

        let duration_str = String::from_utf8_lossy(&output.stdout);
        duration_str
            .trim()
            .parse::<f64>()
            .map_err(|e| probe_error(format!("unparseable duration {:?}: {}", duration_str.trim(), e)))
    }

    fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(PipelineError::Assembly("No audio files provided".to_string()));
        }

        if inputs.len() == 1 {
            std::fs::copy(inputs[0], output)?;
            return Ok(());
        }

        let temp_dir = TempDir::new()?;
        let list_file = temp_dir.path().join("concat_list.txt");
        write_concat_list(inputs, &list_file)?;

        run(
            self.ffmpeg_command()
                .args(["-y", "-f", "concat", "-safe", "0", "-i"])
                .arg(&list_file)
                .args(["-c", "copy"])
                .arg(output),
            "ffmpeg concat",
        )?;

        Ok(())
    }

    fn encode_m4b(
        &self,
        plan: &AssemblyPlan,
        output: &Path,
        options: &EncodeOptions,
    ) -> Result<()> {
        if plan.segments.is_empty() {
            return Err(PipelineError::Assembly("No audio files provided".to_string()));
        }

        // Both helper files live in the temp dir and vanish on every exit path
        let temp_dir = TempDir::new()?;
        let list_file = temp_dir.path().join("concat_list.txt");
        write_concat_list(&plan.sources(), &list_file)?;

        let metadata_file = temp_dir.path().join("metadata.txt");
        write_ffmetadata(plan, &metadata_file)?;

        let mut cmd = self.ffmpeg_command();
        cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_file)
            .arg("-i")
            .arg(&metadata_file);

        match options.cover.as_deref().filter(|c| c.exists()) {
            Some(cover) => {
                log::info!("Adding cover image: {}", cover.display());
                cmd.arg("-i").arg(cover);
                cmd.args([
                    "-map",
                    "0:a",
                    "-map",
                    "2:v",
                    "-c:v",
                    "copy",
                    "-disposition:v:0",
                    "attached_pic",
                ]);
            }
            None => {
                if let Some(cover) = &options.cover {
                    log::warn!("Cover image not found: {}", cover.display());
                }
                cmd.args(["-map", "0:a"]);
            }
        }

        cmd.args(["-map_metadata", "1", "-c:a", "aac", "-b:a"])
            .arg(&options.bitrate)
            .args(["-f", "mp4"])
            .arg(output);

        run(&mut cmd, "ffmpeg M4B creation")?;
        Ok(())
    }

    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: CompressFormat,
        bitrate: &str,
    ) -> Result<()> {
        run(
            self.ffmpeg_command()
                .arg("-y")
                .arg("-i")
                .arg(input)
                .args(["-vn", "-c:a", format.ffmpeg_codec(), "-b:a", bitrate])
                .args(["-f", format.ffmpeg_muxer()])
                .arg(output),
            "ffmpeg transcode",
        )?;
        Ok(())
    }

    fn render_silence(&self, duration_ms: u64, reference: &Path, output: &Path) -> Result<()> {
        let (sample_rate, channels) = self
            .stream_format(reference)
            .unwrap_or((FALLBACK_SAMPLE_RATE, 1));
        let layout = if channels >= 2 { "stereo" } else { "mono" };

        run(
            self.ffmpeg_command()
                .args(["-y", "-f", "lavfi", "-i"])
                .arg(format!("anullsrc=r={}:cl={}", sample_rate, layout))
                .arg("-t")
                .arg(format!("{:.3}", duration_ms as f64 / 1000.0))
                .arg(output),
            "ffmpeg silence",
        )?;

        Ok(())
    }

    fn is_available(&self) -> bool {
        let works = |mut cmd: Command| {
            cmd.arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        works(self.ffmpeg_command()) && works(self.ffprobe_command())
    }
}

#[cfg(test)]
pub(crate) use fake::FakeToolkit;

#[cfg(test)]
mod fake {
    use super::*;
    use crate::audio::metadata::render_ffmetadata;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for ffmpeg used by tests.
    ///
    /// Durations are looked up by file name; concatenation joins the input
    /// bytes; encoding writes the rendered metadata to the output file.
    pub(crate) struct FakeToolkit {
        default_duration: f64,
        durations: HashMap<String, f64>,
        failing_probes: Vec<String>,
        failing_transcodes: Vec<String>,
        fail_encode: bool,
        pub(crate) concat_calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
        pub(crate) encoded: Mutex<Vec<PathBuf>>,
        pub(crate) transcoded: Mutex<Vec<(PathBuf, CompressFormat, String)>>,
    }

    impl FakeToolkit {
        pub(crate) fn new(default_duration: f64) -> Self {
            Self {
                default_duration,
                durations: HashMap::new(),
                failing_probes: Vec::new(),
                failing_transcodes: Vec::new(),
                fail_encode: false,
                concat_calls: Mutex::new(Vec::new()),
                encoded: Mutex::new(Vec::new()),
                transcoded: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_duration(mut self, file_name: &str, seconds: f64) -> Self {
            self.durations.insert(file_name.to_string(), seconds);
            self
        }

        pub(crate) fn failing_probe(mut self, file_name: &str) -> Self {
            self.failing_probes.push(file_name.to_string());
            self
        }

        pub(crate) fn failing_transcode(mut self, file_name: &str) -> Self {
            self.failing_transcodes.push(file_name.to_string());
            self
        }

        pub(crate) fn failing_encode(mut self) -> Self {
            self.fail_encode = true;
            self
        }

        fn file_name(path: &Path) -> String {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        }
    }

    impl AudioToolkit for FakeToolkit {
        fn probe_duration(&self, path: &Path) -> Result<f64> {
            let name = Self::file_name(path);
            if self.failing_probes.contains(&name) {
                return Err(PipelineError::Probe {
                    path: path.to_path_buf(),
                    message: "invalid data".to_string(),
                });
            }
            Ok(self
                .durations
                .get(&name)
                .copied()
                .unwrap_or(self.default_duration))
        }

        fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()> {
            let mut joined = Vec::new();
            for input in inputs {
                joined.extend(std::fs::read(input)?);
            }
            std::fs::write(output, joined)?;
            self.concat_calls.lock().unwrap().push((
                inputs.iter().map(|p| p.to_path_buf()).collect(),
                output.to_path_buf(),
            ));
            Ok(())
        }

        fn encode_m4b(
            &self,
            plan: &AssemblyPlan,
            output: &Path,
            _options: &EncodeOptions,
        ) -> Result<()> {
            if self.fail_encode {
                return Err(PipelineError::Assembly("encoder exploded".to_string()));
            }
            std::fs::write(output, render_ffmetadata(plan))?;
            self.encoded.lock().unwrap().push(output.to_path_buf());
            Ok(())
        }

        /// Writes the input bytes prefixed with the bitrate.
        fn transcode(
            &self,
            input: &Path,
            output: &Path,
            format: CompressFormat,
            bitrate: &str,
        ) -> Result<()> {
            if self.failing_transcodes.contains(&Self::file_name(input)) {
                return Err(PipelineError::Assembly(format!(
                    "ffmpeg transcode failed: {}: Invalid data found",
                    input.display()
                )));
            }
            let mut bytes = format!("{}|", bitrate).into_bytes();
            bytes.extend(std::fs::read(input)?);
            std::fs::write(output, bytes)?;
            self.transcoded.lock().unwrap().push((
                input.to_path_buf(),
                format,
                bitrate.to_string(),
            ));
            Ok(())
        }

        fn render_silence(&self, _duration_ms: u64, _reference: &Path, output: &Path) -> Result<()> {
            std::fs::write(output, b"")?;
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_format() {
        assert_eq!(
            parse_stream_format("sample_rate=24000\nchannels=1\n"),
            Some((24000, 1))
        );
        assert_eq!(
            parse_stream_format("channels=2\nsample_rate=44100"),
            Some((44100, 2))
        );
        assert_eq!(parse_stream_format("sample_rate=24000\n"), None);
    }

    #[test]
    fn test_write_concat_list_escapes_quotes() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("list.txt");
        write_concat_list(
            &[Path::new("/tmp/a.mp3"), Path::new("/tmp/it's.mp3")],
            &list,
        )
        .unwrap();
        let content = std::fs::read_to_string(&list).unwrap();
        assert_eq!(content, "file '/tmp/a.mp3'\nfile '/tmp/it'\\''s.mp3'\n");
    }

    #[test]
    fn test_write_concat_list_makes_relative_paths_absolute() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("list.txt");
        write_concat_list(&[Path::new("book_work/01_book/01_Intro.mp3")], &list).unwrap();

        let content = std::fs::read_to_string(&list).unwrap();
        let expected = std::env::current_dir()
            .unwrap()
            .join("book_work/01_book/01_Intro.mp3");
        assert_eq!(content, format!("file '{}'\n", expected.display()));
        assert!(!content.contains(&temp_dir.path().display().to_string()));
    }

    #[test]
    fn test_compress_format_targets() {
        assert_eq!(CompressFormat::Mp3.extension(), "mp3");
        assert_eq!(CompressFormat::Aac.extension(), "m4a");
        assert_eq!(CompressFormat::M4a.extension(), "m4a");
        assert_eq!(CompressFormat::Mp3.default_bitrate(), "320k");
        assert_eq!(CompressFormat::Aac.default_bitrate(), "256k");
        assert_eq!(CompressFormat::Aac.ffmpeg_codec(), "aac");
        assert_eq!(CompressFormat::M4a.ffmpeg_muxer(), "ipod");
    }

    #[test]
    fn test_missing_binary_is_assembly_error() {
        let toolkit = FfmpegToolkit {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe-binary"),
        };
        assert!(!toolkit.is_available());

        let probe = toolkit.probe_duration(Path::new("a.mp3"));
        assert!(matches!(probe, Err(PipelineError::Probe { .. })));

        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.mp3");
        let b = temp_dir.path().join("b.mp3");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        let result = toolkit.concat(&[&a, &b], &temp_dir.path().join("out.mp3"));
        assert!(matches!(result, Err(PipelineError::Assembly(_))));

        let result = toolkit.transcode(
            &a,
            &temp_dir.path().join("a.m4a"),
            CompressFormat::Aac,
            "256k",
        );
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }

    #[test]
    fn test_concat_single_file_copies() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("only.mp3");
        let output = temp_dir.path().join("out.mp3");
        std::fs::write(&input, b"ID3data").unwrap();

        FfmpegToolkit::default().concat(&[&input], &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"ID3data");
    }

    #[test]
    fn test_concat_rejects_empty_input() {
        let temp_dir = TempDir::new().unwrap();
        let result = FfmpegToolkit::default().concat(&[], &temp_dir.path().join("out.mp3"));
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }
}
