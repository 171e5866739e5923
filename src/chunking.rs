use crate::document::Document;
use crate::error::ChunkError;
use std::collections::VecDeque;

/// Separators tried in order: paragraphs, lines, words, characters
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Page the chunk was cut from (1-based)
    pub source_page: usize,
    /// Position of this chunk in the document-wide chunk sequence
    pub chunk_index: usize,
    /// Identifier of the document this chunk belongs to
    pub source_id: String,
}

/// Splits documents into chunks bounded by a character count
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidSize(chunk_size));
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }

        Ok(Chunker {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split every page of the document, keeping page order.
    ///
    /// Pages are split independently so a chunk never spans two pages.
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &document.pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    text,
                    source_page: page.page_number,
                    chunk_index: chunks.len(),
                    source_id: page.source_id.clone(),
                });
            }
        }

        chunks
    }

    /// Split raw text into trimmed, non-empty pieces of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(position) = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(*sep))
        else {
            return trimmed(text).into_iter().collect();
        };
        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            // Flush what fits before handling the oversize piece
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }

            if remaining.is_empty() {
                chunks.extend(trimmed(piece));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    /// Greedily join small pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = |occupied: bool| if occupied { separator_len } else { 0 };

            if !window.is_empty() && total + len + separator_len > self.chunk_size {
                chunks.extend(join(&window, separator));

                while total > self.chunk_overlap
                    || (total > 0 && total + len + joiner(!window.is_empty()) > self.chunk_size)
                {
                    let Some((_, first_len)) = window.pop_front() else {
                        break;
                    };
                    total = total.saturating_sub(first_len + joiner(!window.is_empty()));
                }
            }

            window.push_back((piece, len));
            if window.len() > 1 {
                total += len + separator_len;
            } else {
                total += len;
            }
        }

        chunks.extend(join(&window, separator));
        chunks
    }
}

fn join(window: &VecDeque<(&str, usize)>, separator: &str) -> Option<String> {
    let text = window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    trimmed(&text)
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
