//! Audio assembly: chapter timing, FFmpeg metadata and the ffmpeg toolkit.

pub mod assembler;
pub mod metadata;
pub mod toolkit;

pub use assembler::{
    AssemblyPlan, AudioSegment, BookMetadata, Chapter, SegmentKind, assemble, merge_plans,
    probe_or_zero, probe_segments, title_from_filename,
};
pub use toolkit::{AudioToolkit, CompressFormat, EncodeOptions, FfmpegToolkit};
