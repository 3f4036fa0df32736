//! Text chunking under a provider character budget.
//!
//! Paragraphs are packed greedily; a paragraph that cannot fit on its own is
//! broken at sentence boundaries and packed again at that granularity. A single
//! sentence longer than the budget is emitted whole and flagged `oversized`.

use super::Chunk;
use crate::error::{PipelineError, Result};

/// Separator between paragraphs.
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Punctuation that ends a sentence when followed by a space.
const SENTENCE_ENDINGS: &[u8] = b".!?";

/// Split text into chunks of at most `max_chars` characters.
///
/// Returns an error when `max_chars` is zero.
pub fn segment(text: &str, max_chars: usize) -> Result<Vec<Chunk>> {
    if max_chars == 0 {
        return Err(PipelineError::Configuration(
            "character budget must be greater than zero".to_string(),
        ));
    }

    let mut packer = Packer::new(max_chars);
    for paragraph in text
        .split(PARAGRAPH_DELIMITER)
        .filter(|p| !p.trim().is_empty())
    {
        packer.push_paragraph(paragraph);
    }

    Ok(packer.finish())
}

/// Split a paragraph after each `. `, `! ` or `? `.
///
/// Pieces keep their punctuation and trailing space, so concatenating them
/// gives back the input.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len().saturating_sub(1) {
        if SENTENCE_ENDINGS.contains(&bytes[i]) && bytes[i + 1] == b' ' {
            pieces.push(&text[start..i + 2]);
            start = i + 2;
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Greedy accumulator shared by the paragraph and sentence passes.
struct Packer {
    max_chars: usize,
    current: String,
    chunks: Vec<Chunk>,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            current: String::new(),
            chunks: Vec::new(),
        }
    }

    fn push_paragraph(&mut self, paragraph: &str) {
        let joined_len = char_len(&self.current) + PARAGRAPH_DELIMITER.len() + char_len(paragraph);

        if !self.current.is_empty() && joined_len > self.max_chars {
            self.seal_current();
        } else if !self.current.is_empty() {
            self.current.push_str(PARAGRAPH_DELIMITER);
        }
        self.current.push_str(paragraph);

        if char_len(self.current.trim()) > self.max_chars {
            self.split_current();
        }
    }

    /// Re-pack the current chunk sentence by sentence; the tail stays open.
    fn split_current(&mut self) {
        let paragraph = std::mem::take(&mut self.current);
        let mut pending = String::new();

        for sentence in split_into_sentences(&paragraph) {
            let fits = char_len(pending.trim_start()) + char_len(sentence.trim_end())
                <= self.max_chars;
            if !pending.trim().is_empty() && !fits {
                self.seal(&pending);
                pending.clear();
            }
            pending.push_str(sentence);
        }

        self.current = pending;
    }

    fn seal_current(&mut self) {
        let current = std::mem::take(&mut self.current);
        self.seal(&current);
    }

    fn seal(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let oversized = char_len(trimmed) > self.max_chars;
        if oversized {
            log::warn!(
                "Sentence of {} characters exceeds the {}-character budget; sending it whole",
                char_len(trimmed),
                self.max_chars
            );
        }

        let order = self.chunks.len();
        self.chunks
            .push(Chunk::new(order, trimmed.to_string(), oversized));
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.seal_current();
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_paragraphs_single_chunk() {
        let chunks = segment("Para1.\n\nPara2.", 20).unwrap();
        assert_eq!(texts(&chunks), vec!["Para1.\n\nPara2."]);
        assert!(!chunks[0].oversized);
    }

    #[test]
    fn test_paragraphs_over_budget() {
        let chunks = segment("Para1.\n\nPara2 is long. It has more. Than twenty.", 20).unwrap();
        assert_eq!(
            texts(&chunks),
            vec!["Para1.", "Para2 is long.", "It has more.", "Than twenty."]
        );
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.order, i);
            assert!(chunk.char_len() <= 20, "chunk too long: {:?}", chunk.text);
        }
    }

    #[test]
    fn test_paragraph_packing() {
        let text = "One one one.\n\nTwo two two.\n\nThree three.\n\nFour.";
        let chunks = segment(text, 30).unwrap();
        assert_eq!(
            texts(&chunks),
            vec!["One one one.\n\nTwo two two.", "Three three.\n\nFour."]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(segment("", 100).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_only() {
        assert!(segment("   \n\n   \n\n\n", 100).unwrap().is_empty());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let result = segment("Hello.", 0);
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_consecutive_delimiters_collapse() {
        let chunks = segment("Alpha.\n\n\n\nBeta.", 100).unwrap();
        assert_eq!(texts(&chunks), vec!["Alpha.\n\nBeta."]);
    }

    #[test]
    fn test_oversized_sentence_flagged() {
        let text = "Short. This single sentence is far longer than the budget allows! End.";
        let chunks = segment(text, 20).unwrap();
        assert_eq!(
            texts(&chunks),
            vec![
                "Short.",
                "This single sentence is far longer than the budget allows!",
                "End."
            ]
        );
        assert!(!chunks[0].oversized);
        assert!(chunks[1].oversized);
        assert!(!chunks[2].oversized);
    }

    #[test]
    fn test_tail_of_split_paragraph_stays_open() {
        let text = "Aaaa aaaa. Bbbb bbbb. Cc.\n\nDd.";
        let chunks = segment(text, 16).unwrap();
        assert_eq!(texts(&chunks), vec!["Aaaa aaaa.", "Bbbb bbbb. Cc.", "Dd."]);
    }

    #[test]
    fn test_budget_counts_characters_not_bytes() {
        let text = "Łódź żółć.\n\nźdźbło ćma.";
        let chunks = segment(text, 23).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_abbreviation_split_is_literal() {
        let sentences = split_into_sentences("Dr. Smith arrived. He sat? Yes! ok");
        assert_eq!(
            sentences,
            vec!["Dr. ", "Smith arrived. ", "He sat? ", "Yes! ", "ok"]
        );
    }

    #[test]
    fn test_split_into_sentences_no_boundary() {
        assert_eq!(split_into_sentences("no boundary here."), vec!["no boundary here."]);
        assert!(split_into_sentences("").is_empty());
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #[test]
        fn prop_rejoin_preserves_content(text in "[a-zA-Z,.!? \n]{0,400}", max in 1usize..80) {
            let chunks = segment(&text, max).unwrap();
            let rejoined = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(PARAGRAPH_DELIMITER);
            prop_assert_eq!(non_whitespace(&rejoined), non_whitespace(&text));
        }

        #[test]
        fn prop_budget_respected_unless_flagged(text in "[a-zA-Z,.!? \n]{0,400}", max in 1usize..80) {
            let chunks = segment(&text, max).unwrap();
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.order, i);
                prop_assert!(!chunk.text.trim().is_empty());
                if chunk.oversized {
                    prop_assert!(chunk.char_len() > max);
                    prop_assert_eq!(split_into_sentences(&chunk.text).len(), 1);
                    prop_assert!(!chunk.text.contains(PARAGRAPH_DELIMITER));
                } else {
                    prop_assert!(chunk.char_len() <= max);
                }
            }
        }
    }
}
