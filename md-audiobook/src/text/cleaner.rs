//! Speech cleaning: markdown heading markers and typography the voices stumble on.

use super::sections::HEADING_MARKER;

/// Characters that can cause TTS issues and their replacements.
const PROBLEMATIC_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201c}', "\""),  // Left double quote
    ('\u{201d}', "\""),  // Right double quote
    ('\u{201e}', "\""),  // Low double quote
    ('\u{00ab}', "\""),  // Left guillemet
    ('\u{00bb}', "\""),  // Right guillemet
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "-"),   // Em dash
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00a0}', " "),   // Non-breaking space
    ('\u{200b}', ""),    // Zero-width space
    ('\u{200c}', ""),    // Zero-width non-joiner
    ('\u{200d}', ""),    // Zero-width joiner
    ('\u{feff}', ""),    // BOM
];

/// Clean markdown text before it is chunked and narrated.
///
/// - Heading lines lose their `#` markers; headings with no text are dropped
/// - Typographic quotes, dashes and invisible characters are normalized
/// - Control characters other than newline and tab are removed
/// - Three or more consecutive newlines collapse into one paragraph break
pub fn clean_for_speech(text: &str) -> String {
    let without_markers = strip_heading_markers(text);

    let mut result = String::with_capacity(without_markers.len());
    for c in without_markers.chars() {
        if let Some((_, replacement)) = PROBLEMATIC_CHARS.iter().find(|(ch, _)| *ch == c) {
            result.push_str(replacement);
        } else if c == '\n' || c == '\t' || !c.is_control() {
            result.push(c);
        }
    }

    collapse_blank_lines(&result)
}

/// Remove heading markers, keeping the heading text as a spoken line.
fn strip_heading_markers(text: &str) -> String {
    text.split('\n')
        .filter_map(|line| {
            if line.trim().starts_with(HEADING_MARKER) {
                let cleaned = line.trim().trim_start_matches(HEADING_MARKER).trim();
                (!cleaned.is_empty()).then_some(cleaned)
            } else {
                Some(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of more than two newlines (ignoring `\r`) into exactly two.
fn collapse_blank_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut newline_count = 0;

    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => {
                newline_count += 1;
                if newline_count <= 2 {
                    result.push('\n');
                }
            }
            _ => {
                newline_count = 0;
                result.push(c);
            }
        }
    }

    result
}
