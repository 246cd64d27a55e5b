//! Corpus loading: listing source files, reading them as documents,
//! fingerprinting the file set and turning documents into chunks.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{info, warn};

use crate::chunker::{Chunker, ChunkingConfig};
use crate::types::{Document, DocumentChunk};

/// Size and modification time of one corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub name: String,
    pub size: u64,
    pub modified_ms: u64,
}

/// Cheap change-detection signal for a corpus directory: the sorted list of
/// file stamps. Two fingerprints are equal only if the same files exist with
/// the same sizes and modification times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFingerprint {
    pub files: Vec<FileStamp>,
}

impl CorpusFingerprint {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

#[derive(Debug, Clone)]
pub struct CorpusLoader {
    extensions: Vec<String>,
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new(vec!["txt".to_string()])
    }
}

impl CorpusLoader {
    pub fn new(extensions: Vec<String>) -> Self {
        let extensions = extensions.into_iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect();
        Self { extensions }
    }

    /// Matching files under `root`, sorted by path. A missing root yields an
    /// empty list.
    pub fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        if !root.is_dir() {
            warn!(target: "redchamber::corpus", root = %root.display(), "corpus directory not found");
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    pub fn fingerprint(&self, root: &Path) -> CorpusFingerprint {
        let mut files = Vec::new();
        for path in self.list_files(root) {
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(target: "redchamber::corpus", path = %path.display(), error = %e, "cannot stat file");
                    continue;
                }
            };
            let modified_ms = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
            files.push(FileStamp { name: doc_name(root, &path), size: meta.len(), modified_ms });
        }
        CorpusFingerprint { files }
    }

    /// Read every matching file as UTF-8. Unreadable, non-UTF-8 and blank
    /// files are skipped with a warning.
    pub fn load_documents(&self, root: &Path) -> Vec<Document> {
        let mut documents = Vec::new();
        for path in self.list_files(root) {
            match fs::read_to_string(&path) {
                Ok(content) if content.trim().is_empty() => {
                    warn!(target: "redchamber::corpus", path = %path.display(), "skipping empty file");
                }
                Ok(content) => {
                    info!(target: "redchamber::corpus", path = %path.display(), "loaded document");
                    documents.push(Document { name: doc_name(root, &path), path, content });
                }
                Err(e) => {
                    warn!(target: "redchamber::corpus", path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        info!(target: "redchamber::corpus", documents = documents.len(), "corpus loaded");
        documents
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

fn doc_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Loads a corpus directory and chunks every document.
#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    loader: CorpusLoader,
    chunker: Chunker,
}

impl DataProcessor {
    pub fn new(loader: CorpusLoader, chunking: ChunkingConfig) -> Self {
        Self { loader, chunker: Chunker::new(chunking) }
    }

    pub fn loader(&self) -> &CorpusLoader {
        &self.loader
    }

    pub fn process_directory(&self, data_dir: &Path) -> Vec<DocumentChunk> {
        let documents = self.loader.load_documents(data_dir);
        let chunks = self.chunk_documents(&documents);
        info!(
            target: "redchamber::corpus",
            documents = documents.len(),
            chunks = chunks.len(),
            "processed corpus"
        );
        chunks
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<DocumentChunk> {
        documents.iter().flat_map(|doc| self.chunk_document(doc)).collect()
    }

    pub fn chunk_document(&self, doc: &Document) -> Vec<DocumentChunk> {
        let texts = self.chunker.split(&doc.content);
        let total_chunks = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{}:{}", doc.name, chunk_index),
                doc_name: doc.name.clone(),
                doc_path: doc.path.to_string_lossy().to_string(),
                content,
                chunk_index,
                total_chunks,
            })
            .collect()
    }
}
