//! FFmpeg metadata generation for M4B chapter markers.

use std::fs;
use std::path::Path;

use super::assembler::AssemblyPlan;

/// Render an FFMETADATA1 document for a plan.
///
/// Chapter times use a millisecond timebase. Title, artist and album artist
/// are only written when known; the album falls back to "Audiobook".
pub fn render_ffmetadata(plan: &AssemblyPlan) -> String {
    let metadata = &plan.metadata;
    let mut lines = vec![";FFMETADATA1".to_string()];

    if let Some(title) = &metadata.title {
        lines.push(format!("title={}", escape_metadata_value(title)));
    }
    if let Some(author) = &metadata.author {
        lines.push(format!("artist={}", escape_metadata_value(author)));
        lines.push(format!("album_artist={}", escape_metadata_value(author)));
    }
    let album = metadata.title.as_deref().unwrap_or("Audiobook");
    lines.push(format!("album={}", escape_metadata_value(album)));
    lines.push("genre=Audiobook".to_string());
    lines.push(format!("date={}", metadata.year));
    lines.push(String::new());

    for chapter in &plan.chapters {
        lines.push("[CHAPTER]".to_string());
        lines.push("TIMEBASE=1/1000".to_string());
        lines.push(format!("START={}", chapter.start_ms()));
        lines.push(format!("END={}", chapter.end_ms()));
        lines.push(format!("title={}", escape_metadata_value(&chapter.title)));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write the FFMETADATA1 document for a plan to `output_path`.
pub fn write_ffmetadata(plan: &AssemblyPlan, output_path: &Path) -> std::io::Result<()> {
    fs::write(output_path, render_ffmetadata(plan))
}

/// Escape special characters in metadata values.
///
/// FFmpeg metadata values need to escape: = ; # \ and newlines. A newline
/// stays in the value as a backslash followed by a real line break.
fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }

    escaped
}
