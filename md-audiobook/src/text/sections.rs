//! Splitting markdown documents into heading-delimited sections.

use std::collections::HashSet;

use super::Section;

/// Marker that starts a heading line.
pub const HEADING_MARKER: char = '#';

/// Title given to text that precedes the first heading.
pub const PREAMBLE_TITLE: &str = "preamble";

/// Title used when a heading line has no text after its markers.
pub const UNTITLED: &str = "Untitled";

/// Split a document into sections at heading lines.
///
/// Every heading starts a new section; the heading line itself stays in the
/// section content. Leading text without a heading becomes a section titled
/// "preamble". A section is dropped on the next heading only if it has no
/// non-whitespace content; the last section is always returned.
pub fn split_by_headings(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = PREAMBLE_TITLE.to_string();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if let Some(heading) = heading_title(line) {
            let content = lines.join("\n");
            if !content.trim().is_empty() {
                let order = sections.len();
                sections.push(Section::new(title, content, order));
            }
            title = heading;
            lines.clear();
        }
        lines.push(line);
    }

    let order = sections.len();
    sections.push(Section::new(title, lines.join("\n"), order));
    sections
}

/// Title of a heading line, or None if the line is not a heading.
fn heading_title(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if !trimmed.starts_with(HEADING_MARKER) {
        return None;
    }

    let title = trimmed.trim_start_matches(HEADING_MARKER).trim();
    if title.is_empty() {
        Some(UNTITLED.to_string())
    } else {
        Some(title.to_string())
    }
}

/// Section titles with repeats numbered: "Notes", "Notes (2)", "Notes (3)".
///
/// A number is never chosen if it collides with a title written in the
/// document, so every returned title is distinct.
pub fn unique_titles(sections: &[Section]) -> Vec<String> {
    let written: HashSet<&str> = sections.iter().map(|s| s.title.as_str()).collect();
    let mut taken: HashSet<String> = HashSet::new();

    sections
        .iter()
        .map(|section| {
            let title = if taken.contains(&section.title) {
                (2..)
                    .map(|n| format!("{} ({})", section.title, n))
                    .find(|candidate| {
                        !taken.contains(candidate) && !written.contains(candidate.as_str())
                    })
                    .unwrap_or_default()
            } else {
                section.title.clone()
            };
            taken.insert(title.clone());
            title
        })
        .collect()
}

/// File stem for a section: a 1-based ordinal followed by the title slug.
///
/// The ordinal prefix keeps directory listings in narration order and is
/// stripped again when chapter titles are derived from file names.
pub fn section_stem(index: usize, title: &str) -> String {
    format!("{:02}_{}", index + 1, slugify(title))
}

/// Replace runs of non-alphanumeric characters with a single underscore.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}
