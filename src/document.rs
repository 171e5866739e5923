use crate::error::LoadError;
use log::{debug, info, warn};
use mime_guess::from_path;
use std::fs;
use std::path::Path;

/// A single physical page of a loaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    /// 1-based page number
    pub page_number: usize,
    pub source_id: String,
}

/// Represents a document as an ordered sequence of pages
#[derive(Debug, Clone)]
pub struct Document {
    /// The document's file name (used as document ID)
    pub source_id: String,
    /// The document's MIME type
    pub mime_type: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Load a document from a file path (supports PDF and plain text)
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, LoadError> {
        let path = file_path.as_ref();
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Detect MIME type
        let mime_type = from_path(path).first_or_octet_stream().to_string();
        debug!("Detected MIME type: {}", mime_type);

        let texts = read_pages(path, &mime_type)?;
        let document = Document::from_pages(source_id, texts).with_mime_type(mime_type);

        if document.is_blank() {
            warn!("Document {} contains no extractable text", document.source_id);
        }

        Ok(document)
    }

    /// Build a document from in-memory page texts, numbering pages from 1
    pub fn from_pages<S, I, T>(source_id: S, texts: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let source_id = source_id.into();
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Page {
                text: text.into(),
                page_number: idx + 1,
                source_id: source_id.clone(),
            })
            .collect();

        Document {
            source_id,
            mime_type: "text/plain".to_string(),
            pages,
        }
    }

    fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = mime_type;
        self
    }

    /// True when no page carries any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}

/// Read the page texts of a document based on its MIME type
fn read_pages(path: &Path, mime_type: &str) -> Result<Vec<String>, LoadError> {
    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let pages =
                pdf_extract::extract_text_by_pages(path).map_err(|e| LoadError::Pdf {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            info!("Extracted {} pages", pages.len());

            // PDF extraction can sometimes include excessive whitespace
            Ok(pages.iter().map(|page| normalize_whitespace(page)).collect())
        }

        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(vec![content])
        }

        _ => Err(LoadError::Unsupported {
            path: path.to_path_buf(),
            mime_type: mime_type.to_string(),
        }),
    }
}

/// Normalize whitespace in text: drop carriage returns, collapse runs of spaces
/// and cap consecutive newlines at a paragraph break
fn normalize_whitespace(text: &str) -> String {
    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(text.len());

    for c in text.chars().filter(|&c| c != '\r') {
        if c == '\n' {
            newline_count += 1;
            continue;
        }

        if newline_count > 0 {
            normalized.push_str(if newline_count >= 2 { "\n\n" } else { "\n" });
            newline_count = 0;
            prev_char = '\n';
        }

        if !(c == ' ' && (prev_char == ' ' || prev_char == '\n')) {
            normalized.push(c);
        }
        prev_char = c;
    }

    normalized.trim().to_string()
}
