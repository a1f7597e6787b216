//! Source document discovery, hashing and text extraction.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "pdf"];

/// A resume file read from the source directory. Identity is the file name.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_hash = content_hash(&bytes);
        Self {
            name: name.into(),
            bytes,
            content_hash,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

/// SHA-256 hex digest of raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A file that was listed but could not be read.
#[derive(Debug, Clone)]
pub struct UnreadableDocument {
    pub name: String,
    pub error: String,
}

/// Lists supported regular files in `dir`, sorted by name. A missing directory is empty.
pub async fn discover(
    dir: &Path,
) -> std::io::Result<(Vec<SourceDocument>, Vec<UnreadableDocument>)> {
    let mut reader = match tokio::fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Resume directory {} does not exist; nothing to ingest", dir.display());
            return Ok((Vec::new(), Vec::new()));
        }
        Err(e) => return Err(e),
    };

    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let supported = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if supported {
            candidates.push((name, path));
        } else {
            debug!("Skipping unsupported file {name}");
        }
    }
    candidates.sort();

    let mut documents = Vec::with_capacity(candidates.len());
    let mut unreadable = Vec::new();
    for (name, path) in candidates {
        match tokio::fs::read(&path).await {
            Ok(bytes) => documents.push(SourceDocument::new(name, bytes)),
            Err(e) => unreadable.push(UnreadableDocument {
                name,
                error: format!("Failed to read file: {e}"),
            }),
        }
    }
    Ok((documents, unreadable))
}

/// Plain text of a document. PDFs are parsed off the async runtime.
pub async fn extract_text(doc: &SourceDocument) -> Result<String, String> {
    let text = match doc.extension().as_str() {
        "pdf" => {
            let bytes = doc.bytes.clone();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| format!("PDF extraction task failed: {e}"))?
                .map_err(|e| format!("PDF extraction failed: {e}"))?
        }
        _ => String::from_utf8_lossy(&doc.bytes).into_owned(),
    };
    let text = text.replace('\u{0}', "");
    if text.trim().is_empty() {
        return Err("Document contains no extractable text".to_string());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Bob").unwrap();
        std::fs::write(dir.path().join("a.MD"), "Alice").unwrap();
        std::fs::write(dir.path().join("notes.docx"), "ignored").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let (docs, unreadable) = discover(dir.path()).await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.MD", "b.txt"]);
        assert!(unreadable.is_empty());
    }

    #[tokio::test]
    async fn test_discover_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let (docs, _) = discover(&dir.path().join("absent")).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let doc = SourceDocument::new("blank.txt", b"  \n ".to_vec());
        assert!(extract_text(&doc).await.is_err());
    }
}
