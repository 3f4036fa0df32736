//! md-audio - Convert markdown documents to chaptered audiobooks using text-to-speech

mod audio;
mod config;
mod error;
mod inventory;
mod pipeline;
mod synthesis;
mod text;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AudiobookConfig;
use env_logger::Env;
use error::PipelineError;
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{Document, Pipeline, PipelineOptions, SectionStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tts_client::{ProviderKind, get_provider};

use audio::{
    AudioToolkit, BookMetadata, CompressFormat, EncodeOptions, FfmpegToolkit, title_from_filename,
};

#[derive(Parser, Debug)]
#[command(name = "md-audio")]
#[command(about = "Convert markdown documents to chaptered audiobooks using text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// Markdown file, or folder of markdown files narrated in name order
    input: Option<PathBuf>,

    /// Output file path (default: <input-name>.m4b)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Speech provider (openai, elevenlabs)
    #[arg(short, long)]
    provider: Option<String>,

    /// Voice name (OpenAI) or voice ID (ElevenLabs) for the selected provider
    #[arg(long)]
    voice: Option<String>,

    /// Model for the selected provider
    #[arg(long)]
    model: Option<String>,

    /// Characters per synthesis request (default: provider limit)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Audiobook title (default: derived from the input name)
    #[arg(long)]
    title: Option<String>,

    /// Audiobook author
    #[arg(long)]
    author: Option<String>,

    /// Cover image (jpg/png)
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Directory for chunk and section audio (default: <output-name>_work)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep chunk and section audio after the audiobook is written
    #[arg(long)]
    keep: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List markdown files in a folder with their character counts as CSV
    Scan {
        /// Folder to scan recursively
        folder: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "markdown_files.csv")]
        output: PathBuf,
    },
    /// Show how a markdown file would be split, without synthesizing
    Split {
        /// Markdown file
        file: PathBuf,

        /// Characters per synthesis request (default: provider limit)
        #[arg(long)]
        max_chars: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Join audio files with silence between them
    Merge {
        /// Input files, directories or wildcard patterns
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,

        /// Silence between files in milliseconds (0 for none)
        #[arg(short, long)]
        silence: Option<u64>,

        /// Delete the input files after a successful merge
        #[arg(long)]
        delete_input: bool,
    },
    /// Package existing audio files into an M4B with one chapter per file
    M4b {
        /// Input files, directories or wildcard patterns
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output M4B file
        #[arg(short, long)]
        output: PathBuf,

        /// Audiobook title
        #[arg(long)]
        title: Option<String>,

        /// Audiobook author
        #[arg(long)]
        author: Option<String>,

        /// Cover image (jpg/png)
        #[arg(long)]
        cover: Option<PathBuf>,

        /// AAC bitrate (default: from config, 64k)
        #[arg(long)]
        bitrate: Option<String>,
    },
    /// Re-encode every audio file in a folder to mp3 or AAC
    Compress {
        /// Folder with audio files (not searched recursively)
        input_folder: PathBuf,

        /// Folder for the re-encoded files
        output_folder: PathBuf,

        /// Output format; aac is written in an m4a container
        #[arg(short, long, value_enum, default_value_t = CompressFormat::Mp3)]
        format: CompressFormat,

        /// Bitrate, e.g. 192k; a bare number means kbit/s (default: 320k mp3, 256k aac)
        #[arg(short, long)]
        bitrate: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default speech provider
    SetProvider {
        /// Provider name (openai, elevenlabs)
        provider: String,
    },
    /// Set the voice used with a provider
    SetVoice {
        /// Voice name or ID
        voice: String,

        /// Provider the voice belongs to (default: the configured provider)
        #[arg(long)]
        provider: Option<String>,
    },
    /// Set default M4B bitrate
    SetBitrate {
        /// Bitrate, e.g. 64k
        bitrate: String,
    },
    /// Set pause between synthesis requests
    SetDelay {
        /// Milliseconds
        ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    // Handle subcommands
    match &args.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        Some(Commands::Scan { folder, output }) => return handle_scan(folder, output),
        Some(Commands::Split {
            file,
            max_chars,
            json,
        }) => return handle_split(file, *max_chars, *json),
        Some(Commands::Merge {
            inputs,
            output,
            silence,
            delete_input,
        }) => return handle_merge(inputs, output, *silence, *delete_input),
        Some(Commands::M4b {
            inputs,
            output,
            title,
            author,
            cover,
            bitrate,
        }) => {
            return handle_m4b(
                inputs,
                output,
                title.clone(),
                author.clone(),
                cover.clone(),
                bitrate.clone(),
            );
        }
        Some(Commands::Compress {
            input_folder,
            output_folder,
            format,
            bitrate,
        }) => return handle_compress(input_folder, output_folder, *format, bitrate.as_deref()),
        None => {}
    }

    let input = args.input.clone().ok_or_else(|| {
        anyhow::anyhow!("Markdown file or folder is required. Run 'md-audio --help' for usage.")
    })?;

    if !input.exists() {
        anyhow::bail!("Input not found: {}", input.display());
    }

    // Load configuration; flags take precedence
    let mut config = AudiobookConfig::load().context("Failed to load configuration")?;
    if let Some(provider) = &args.provider {
        config.provider = provider.clone();
    }
    if args.max_chars.is_some() {
        config.max_chars = args.max_chars;
    }
    if args.keep {
        config.keep_intermediates = true;
    }

    let kind: ProviderKind = config
        .provider
        .parse()
        .map_err(PipelineError::provider_setup)?;
    let mut tts_config = tts_client::Config::load().map_err(PipelineError::provider_setup)?;
    apply_provider_overrides(
        &mut tts_config,
        kind,
        args.voice.as_deref(),
        args.model.as_deref(),
    );
    let provider = get_provider(kind, tts_config.get_provider_config(kind.key()))
        .map_err(PipelineError::provider_setup)?;

    let toolkit = FfmpegToolkit::default();
    if !toolkit.is_available() {
        anyhow::bail!(
            "ffmpeg and ffprobe are required but were not found.\n\
             \x20 macOS: brew install ffmpeg\n\
             \x20 Ubuntu: sudo apt-get install ffmpeg"
        );
    }

    let documents = load_documents(&input)?;
    if documents.is_empty() {
        anyhow::bail!("No markdown files found in {}", input.display());
    }

    let output_path = args.output.clone().unwrap_or_else(|| default_output(&input));
    let work_dir = args.work_dir.clone().unwrap_or_else(|| {
        let stem = output_path.file_stem().unwrap_or_default();
        output_path.with_file_name(format!("{}_work", stem.to_string_lossy()))
    });

    let title = args.title.clone().or_else(|| match documents.as_slice() {
        [single] => Some(single.title()),
        _ => Some(title_from_filename(&input.with_extension("md"))),
    });
    let metadata = BookMetadata::new(title, args.author.clone());
    let encode_options = EncodeOptions {
        bitrate: config.bitrate.clone(),
        cover: args.cover.clone().or_else(|| config.cover.clone()),
    };

    let pipeline = Pipeline::new(
        provider.as_ref(),
        &toolkit,
        &work_dir,
        &PipelineOptions::from_config(&config),
    )?;

    if args.debug {
        eprintln!("Input: {}", input.display());
        eprintln!("Output: {}", output_path.display());
        eprintln!("Work dir: {}", work_dir.display());
        eprintln!("Provider: {}", provider.name());
        eprintln!("Max chars: {}", pipeline.max_chars());
        eprintln!("Request delay: {} ms", config.request_delay_ms);
    }

    eprintln!(
        "Narrating {} document(s) with {} ({} chars per request)",
        documents.len(),
        provider.name(),
        pipeline.max_chars()
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let report = pipeline
        .run_book(
            &documents,
            metadata,
            &output_path,
            &encode_options,
            |section, index, total| {
                if index == 0 {
                    pb.inc_length(total as u64);
                }
                pb.inc(1);
                pb.set_message(format!("{} {}/{}", section, index + 1, total));
            },
        )
        .await?;

    pb.finish_and_clear();

    // Report summary
    for document in &report.documents {
        for section in &document.sections {
            let status = match &section.status {
                SectionStatus::Completed(_) => format!(
                    "done ({} chunks, {} oversized, {:.1}s)",
                    section.chunks, section.oversized_chunks, section.duration_seconds
                ),
                SectionStatus::AlreadyDone(_) => "already done".to_string(),
                SectionStatus::Empty => "empty".to_string(),
                SectionStatus::Failed(message) => format!("FAILED - {}", message),
            };
            eprintln!("  {} / {}: {}", document.name, section.title, status);
        }
    }

    let failed = report.failed();
    let Some(plan) = report.plan else {
        anyhow::bail!(
            "{} section(s) failed; finished sections are kept in {}. Run again to resume.",
            failed,
            work_dir.display()
        );
    };

    for warning in &plan.warnings {
        eprintln!("Warning: {}", warning);
    }

    if !config.keep_intermediates {
        // Only succeeds once the directory is empty
        let _ = std::fs::remove_dir(&work_dir);
    }

    let size_mb = std::fs::metadata(&output_path)?.len() as f64 / (1024.0 * 1024.0);
    eprintln!(
        "Chapters: {}, Duration: {:.1} minutes",
        plan.chapters.len(),
        plan.total_duration() / 60.0
    );
    eprintln!("Output: {} ({:.1} MB)", output_path.display(), size_mb);

    Ok(())
}

/// A single markdown file, or every markdown file under a folder.
fn load_documents(input: &Path) -> Result<Vec<Document>> {
    let files = if input.is_dir() {
        inventory::find_markdown_files(input)?
    } else {
        vec![input.to_path_buf()]
    };

    files
        .iter()
        .map(|path| {
            Document::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

/// `<name>.m4b` next to the input file or folder.
fn default_output(input: &Path) -> PathBuf {
    let name = if input.is_dir() {
        input.file_name()
    } else {
        input.file_stem()
    }
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "audiobook".to_string());
    input.with_file_name(format!("{}.m4b", name))
}

fn require_toolkit() -> Result<FfmpegToolkit> {
    let toolkit = FfmpegToolkit::default();
    if !toolkit.is_available() {
        anyhow::bail!("ffmpeg and ffprobe are required but were not found");
    }
    Ok(toolkit)
}

fn handle_scan(folder: &Path, output: &Path) -> Result<()> {
    let files = inventory::scan_markdown_files(folder)?;
    if files.is_empty() {
        eprintln!("Warning: No markdown files found.");
        return Ok(());
    }

    inventory::write_csv(output, &files)?;

    let total: usize = files.iter().map(|f| f.number_of_chars).sum();
    eprintln!("Successfully wrote {} files to {}", files.len(), output.display());
    eprintln!("Total characters: {}", total);
    Ok(())
}

#[derive(Serialize)]
struct SplitSection {
    title: String,
    stem: String,
    chunks: Vec<SplitChunk>,
}

#[derive(Serialize)]
struct SplitChunk {
    chars: usize,
    oversized: bool,
}

fn handle_split(file: &Path, max_chars: Option<usize>, json: bool) -> Result<()> {
    let config = AudiobookConfig::load().context("Failed to load configuration")?;
    let max_chars = match max_chars.or(config.max_chars) {
        Some(n) => n,
        None => config
            .provider
            .parse::<ProviderKind>()
            .map_err(PipelineError::provider_setup)?
            .max_chars(),
    };

    let document = Document::from_path(file)?;
    let sections: Vec<_> = text::split_by_headings(&document.text)
        .into_iter()
        .filter(|s| !s.is_blank())
        .collect();
    let titles = text::unique_titles(&sections);

    let mut preview = Vec::with_capacity(sections.len());
    for (index, (section, title)) in sections.iter().zip(titles).enumerate() {
        let chunks = text::segment(&text::clean_for_speech(&section.content), max_chars)?;
        preview.push(SplitSection {
            stem: text::sections::section_stem(index, &title),
            title,
            chunks: chunks
                .iter()
                .map(|c| SplitChunk {
                    chars: c.char_len(),
                    oversized: c.oversized,
                })
                .collect(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!("{} ({} chars per request)", file.display(), max_chars);
    for section in &preview {
        println!();
        println!("{} [{}]", section.title, section.stem);
        for (i, chunk) in section.chunks.iter().enumerate() {
            let flag = if chunk.oversized { "  OVERSIZED" } else { "" };
            println!("  chunk {}: {} chars{}", i, chunk.chars, flag);
        }
    }
    let total: usize = preview.iter().map(|s| s.chunks.len()).sum();
    println!();
    println!("Sections: {}, Chunks: {}", preview.len(), total);
    Ok(())
}

fn handle_merge(
    inputs: &[PathBuf],
    output: &Path,
    silence: Option<u64>,
    delete_input: bool,
) -> Result<()> {
    let toolkit = require_toolkit()?;
    let silence_ms = match silence {
        Some(ms) => ms,
        None => AudiobookConfig::load()?.silence_ms,
    };

    let files = pipeline::expand_audio_inputs(inputs);
    if files.is_empty() {
        anyhow::bail!("No input files found.");
    }

    eprintln!("Merging {} audio files...", files.len());
    let plan = pipeline::merge_audio(&toolkit, &files, output, silence_ms)?;
    for warning in &plan.warnings {
        eprintln!("Warning: {}", warning);
    }

    let duration = plan.total_duration();
    let size_mb = std::fs::metadata(output)?.len() as f64 / (1024.0 * 1024.0);
    eprintln!(
        "Total duration: {:.2} minutes ({:.1} seconds)",
        duration / 60.0,
        duration
    );
    eprintln!("Output: {} ({:.1} MB)", output.display(), size_mb);

    if delete_input {
        let deleted = pipeline::delete_inputs(&files, output);
        eprintln!("Deleted {} input file(s)", deleted);
    }

    Ok(())
}

fn handle_m4b(
    inputs: &[PathBuf],
    output: &Path,
    title: Option<String>,
    author: Option<String>,
    cover: Option<PathBuf>,
    bitrate: Option<String>,
) -> Result<()> {
    let toolkit = require_toolkit()?;
    let config = AudiobookConfig::load().context("Failed to load configuration")?;

    let files = pipeline::sorted_audio_inputs(inputs);
    if files.is_empty() {
        anyhow::bail!("No input files found.");
    }

    let options = EncodeOptions {
        bitrate: bitrate.unwrap_or(config.bitrate),
        cover: cover.or(config.cover),
    };

    eprintln!("Creating M4B from {} file(s)...", files.len());
    let plan = pipeline::encode_files(
        &toolkit,
        &files,
        BookMetadata::new(title, author),
        output,
        &options,
    )?;

    for warning in &plan.warnings {
        eprintln!("Warning: {}", warning);
    }
    for chapter in &plan.chapters {
        eprintln!(
            "  {:>8.1}s  {:>7.1}s  {}",
            chapter.start_seconds,
            chapter.duration_seconds(),
            chapter.title
        );
    }

    let size_mb = std::fs::metadata(output)?.len() as f64 / (1024.0 * 1024.0);
    eprintln!("Duration: {:.1} minutes", plan.total_duration() / 60.0);
    eprintln!("Output: {} ({:.1} MB)", output.display(), size_mb);
    Ok(())
}

/// Set the voice and model of one provider, leaving every other provider as is.
fn apply_provider_overrides(
    tts_config: &mut tts_client::Config,
    kind: ProviderKind,
    voice: Option<&str>,
    model: Option<&str>,
) {
    let provider_config = tts_config.provider_config_mut(kind.key());
    if let Some(voice) = voice {
        provider_config.voice = Some(voice.to_string());
    }
    if let Some(model) = model {
        provider_config.model = Some(model.to_string());
    }
}

fn handle_compress(
    input_folder: &Path,
    output_folder: &Path,
    format: CompressFormat,
    bitrate: Option<&str>,
) -> Result<()> {
    let toolkit = require_toolkit()?;

    let report = pipeline::compress_folder(
        &toolkit,
        input_folder,
        output_folder,
        format,
        bitrate,
        |file| eprintln!("Processing: {}", file.display()),
    )?;

    for file in &report.compressed {
        eprintln!(
            "  -> {}: {:.2}MB -> {:.2}MB ({:.1}% reduction)",
            file.output.display(),
            file.input_bytes as f64 / (1024.0 * 1024.0),
            file.output_bytes as f64 / (1024.0 * 1024.0),
            file.reduction_percent()
        );
    }
    for (file, message) in &report.failed {
        eprintln!("  -> Error compressing {}: {}", file.display(), message);
    }

    eprintln!(
        "Compressed {} file(s), {} error(s)",
        report.compressed.len(),
        report.failed.len()
    );
    if report.compressed.is_empty() && report.failed.is_empty() {
        eprintln!("No audio files found in {}", input_folder.display());
    }
    if !report.failed.is_empty() {
        anyhow::bail!("{} file(s) could not be compressed", report.failed.len());
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AudiobookConfig::load()?;
            println!("Configuration file: {:?}", AudiobookConfig::config_path()?);
            println!();
            println!("provider = \"{}\"", config.provider);
            let tts_config = tts_client::Config::load().map_err(PipelineError::provider_setup)?;
            let provider_config = config
                .provider
                .parse::<ProviderKind>()
                .ok()
                .and_then(|kind| tts_config.get_provider_config(kind.key()));
            match provider_config.and_then(|p| p.voice.as_deref()) {
                Some(voice) => println!("voice = \"{}\"", voice),
                None => println!("voice = (provider default)"),
            }
            match provider_config.and_then(|p| p.model.as_deref()) {
                Some(model) => println!("model = \"{}\"", model),
                None => println!("model = (provider default)"),
            }
            match config.max_chars {
                Some(n) => println!("max_chars = {}", n),
                None => println!("max_chars = (provider limit)"),
            }
            println!("request_delay_ms = {}", config.request_delay_ms);
            println!("bitrate = \"{}\"", config.bitrate);
            println!("silence_ms = {}", config.silence_ms);
            println!("keep_intermediates = {}", config.keep_intermediates);
            if let Some(cover) = &config.cover {
                println!("cover = \"{}\"", cover.display());
            }
        }
        ConfigAction::SetProvider { provider } => {
            let kind: ProviderKind = provider.parse().map_err(PipelineError::provider_setup)?;
            let mut config = AudiobookConfig::load()?;
            config.provider = kind.key().to_string();
            config.save()?;
            println!("Default provider set to: {}", kind);
        }
        ConfigAction::SetVoice { voice, provider } => {
            let provider = match provider {
                Some(provider) => provider.clone(),
                None => AudiobookConfig::load()?.provider,
            };
            let kind: ProviderKind = provider.parse().map_err(PipelineError::provider_setup)?;
            let mut tts_config =
                tts_client::Config::load().map_err(PipelineError::provider_setup)?;
            apply_provider_overrides(&mut tts_config, kind, Some(voice.as_str()), None);
            tts_config.save().map_err(PipelineError::provider_setup)?;
            println!("Voice for {} set to: {}", kind, voice);
        }
        ConfigAction::SetBitrate { bitrate } => {
            let mut config = AudiobookConfig::load()?;
            config.bitrate = bitrate.clone();
            config.save()?;
            println!("Default bitrate set to: {}", bitrate);
        }
        ConfigAction::SetDelay { ms } => {
            let mut config = AudiobookConfig::load()?;
            config.request_delay_ms = *ms;
            config.save()?;
            println!("Request delay set to: {} ms", ms);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_default_action() {
        let args = Args::try_parse_from([
            "md-audio",
            "book.md",
            "-o",
            "out.m4b",
            "--provider",
            "elevenlabs",
            "--max-chars",
            "2000",
            "--keep",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("book.md")));
        assert_eq!(args.output, Some(PathBuf::from("out.m4b")));
        assert_eq!(args.provider.as_deref(), Some("elevenlabs"));
        assert_eq!(args.max_chars, Some(2000));
        assert!(args.keep);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_parses_merge() {
        let args = Args::try_parse_from([
            "md-audio",
            "merge",
            "a.mp3",
            "b.mp3",
            "-o",
            "out.mp3",
            "--silence",
            "0",
            "--delete-input",
        ])
        .unwrap();
        match args.command {
            Some(Commands::Merge {
                inputs,
                silence,
                delete_input,
                ..
            }) => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(silence, Some(0));
                assert!(delete_input);
            }
            other => panic!("expected merge, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_compress() {
        let args =
            Args::try_parse_from(["md-audio", "compress", "in", "out", "-f", "aac", "-b", "192"])
                .unwrap();
        match args.command {
            Some(Commands::Compress {
                input_folder,
                output_folder,
                format,
                bitrate,
            }) => {
                assert_eq!(input_folder, PathBuf::from("in"));
                assert_eq!(output_folder, PathBuf::from("out"));
                assert_eq!(format, CompressFormat::Aac);
                assert_eq!(bitrate.as_deref(), Some("192"));
            }
            other => panic!("expected compress, got {:?}", other),
        }

        let args = Args::try_parse_from(["md-audio", "compress", "in", "out"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Compress {
                format: CompressFormat::Mp3,
                bitrate: None,
                ..
            })
        ));
    }

    #[test]
    fn test_voice_override_is_per_provider() {
        let mut tts_config = tts_client::Config::default();
        tts_config.provider_config_mut("elevenlabs").voice = Some("nPczCjzI2devNBz1zQrb".to_string());

        apply_provider_overrides(&mut tts_config, ProviderKind::OpenAi, Some("nova"), Some("tts-1-hd"));

        let openai = tts_config.get_provider_config("openai").unwrap();
        assert_eq!(openai.voice.as_deref(), Some("nova"));
        assert_eq!(openai.model.as_deref(), Some("tts-1-hd"));
        let elevenlabs = tts_config.get_provider_config("elevenlabs").unwrap();
        assert_eq!(elevenlabs.voice.as_deref(), Some("nPczCjzI2devNBz1zQrb"));
        assert!(elevenlabs.model.is_none());

        apply_provider_overrides(&mut tts_config, ProviderKind::ElevenLabs, None, None);
        let elevenlabs = tts_config.get_provider_config("elevenlabs").unwrap();
        assert_eq!(elevenlabs.voice.as_deref(), Some("nPczCjzI2devNBz1zQrb"));
    }

    #[test]
    fn test_cli_parses_set_voice_for_provider() {
        let args = Args::try_parse_from([
            "md-audio",
            "config",
            "set-voice",
            "nova",
            "--provider",
            "openai",
        ])
        .unwrap();
        match args.command {
            Some(Commands::Config {
                action: ConfigAction::SetVoice { voice, provider },
            }) => {
                assert_eq!(voice, "nova");
                assert_eq!(provider.as_deref(), Some("openai"));
            }
            other => panic!("expected set-voice, got {:?}", other),
        }
    }

    #[test]
    fn test_default_output() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("story.md");
        assert_eq!(default_output(&file), temp_dir.path().join("story.m4b"));

        let folder = temp_dir.path().join("my_book");
        std::fs::create_dir_all(&folder).unwrap();
        assert_eq!(default_output(&folder), temp_dir.path().join("my_book.m4b"));
    }

    #[test]
    fn test_load_documents_from_folder() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("02_b.md"), "# B\nbeta").unwrap();
        std::fs::write(temp_dir.path().join("01_a.md"), "# A\nalpha").unwrap();

        let documents = load_documents(temp_dir.path()).unwrap();
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["01_a", "02_b"]);
    }
}
