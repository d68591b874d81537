//! Source document text
//!
//! Extraction of text from the original legal document happens outside this
//! crate. A `DocumentSource` hands over the already extracted plain text.
//! Form feeds between pages, as left by `pdftotext`, are folded into newlines.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can produce the full text of the document
pub trait DocumentSource {
    fn extract_text(&self) -> Result<String, DocumentError>;
}

/// A UTF-8 text file holding the extracted document
#[derive(Debug, Clone)]
pub struct PlainTextFile {
    path: PathBuf,
}

impl PlainTextFile {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for PlainTextFile {
    #[inline]
    fn extract_text(&self) -> Result<String, DocumentError> {
        let text = fs::read_to_string(&self.path).map_err(|source| DocumentError::Read {
            path: self.path.clone(),
            source,
        })?;
        let pages = text.split(PAGE_BREAK).count();
        let text = join_pages(text.split(PAGE_BREAK));
        debug!(
            "Read {} pages, {} bytes of document text from {}",
            pages,
            text.len(),
            self.path.display()
        );
        Ok(text)
    }
}

/// Join per-page text the way page extraction yields it, skipping pages with no text
#[inline]
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .filter(|page| !page.as_ref().is_empty())
        .map(|page| page.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
