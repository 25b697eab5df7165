//! Page text extraction from source PDFs.
//!
//! Source documents are represented as a collection of pages, where each
//! page has content and a page number.

use crate::error::{AuditError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A single page of extracted text.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    /// Text content of the page.
    pub content: String,
}

impl Page {
    pub fn new(number: usize, content: String) -> Self {
        Self { number, content }
    }
}

/// A regulatory source document, split into pages.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Identifier recorded on every chunk (the file name for PDFs).
    pub name: String,
    /// Original file path (if loaded from file).
    pub path: Option<PathBuf>,
    pub pages: Vec<Page>,
}

impl SourceDocument {
    /// Extract every page of a PDF file.
    pub fn from_pdf(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuditError::ArtifactNotFound(path.to_path_buf()));
        }

        let texts = pdf_extract::extract_text_by_pages(path).map_err(|e| {
            AuditError::PdfExtraction {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::new(i + 1, text))
            .collect();

        Ok(Self {
            name: source_name(path),
            path: Some(path.to_path_buf()),
            pages,
        })
    }

    /// Create a single-page document from raw text.
    pub fn from_text(name: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            path: None,
            pages: vec![Page::new(1, content)],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages joined, each preceded by a line break.
    pub fn raw_content(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("\n{}", p.content))
            .collect()
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Find all PDF files under `dir`, sorted by path.
pub fn discover_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AuditError::ArtifactNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_raw_content_prefixes_each_page() {
        let doc = SourceDocument {
            name: "gdpr.pdf".to_string(),
            path: None,
            pages: vec![
                Page::new(1, "Article 1".to_string()),
                Page::new(2, "Article 2".to_string()),
            ],
        };
        assert_eq!(doc.raw_content(), "\nArticle 1\nArticle 2");
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_discover_pdf_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), b"").unwrap();
        fs::write(dir.path().join("a.PDF"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.pdf"), b"").unwrap();

        let files = discover_pdf_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| source_name(p)).collect();

        assert_eq!(files.len(), 3);
        assert!(names.contains(&"a.PDF".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        let result = discover_pdf_files(Path::new("/nonexistent/corpus"));
        assert!(matches!(result, Err(AuditError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_invalid_pdf_reports_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        let result = SourceDocument::from_pdf(&path);
        assert!(matches!(result, Err(AuditError::PdfExtraction { .. })));
    }
}
