//! Text processing for TTS: speech cleaning, heading sections and chunking.

pub mod chunker;
pub mod cleaner;
pub mod sections;

pub use chunker::segment;
pub use cleaner::clean_for_speech;
pub use sections::{split_by_headings, unique_titles};

/// A chunk of text sized for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position within the section, starting at 0
    pub order: usize,
    /// The text content, trimmed
    pub text: String,
    /// Set when a single sentence exceeds the character budget
    pub oversized: bool,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(order: usize, text: String, oversized: bool) -> Self {
        Self {
            order,
            text,
            oversized,
        }
    }

    /// Length in characters, the unit provider budgets are expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A heading-delimited part of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text without markers, or "preamble"
    pub title: String,
    /// Lines of the section, heading line included
    pub content: String,
    /// Position within the document, starting at 0
    pub order: usize,
}

impl Section {
    /// Create a new section.
    pub fn new(title: impl Into<String>, content: impl Into<String>, order: usize) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            order,
        }
    }

    /// Whether the section has anything to narrate.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
