//! On-disk snapshot cache: `chunks.json` plus `index.json`.
//!
//! `index.json` carries the blake3 digest of the `chunks.json` bytes it was
//! written with, so a crash between the two renames leaves a pair that fails
//! verification instead of a mixed snapshot. Each file is written to a temp
//! file in the cache directory and renamed into place.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use redchamber_core::types::DocumentChunk;

use crate::snapshot::{IndexSnapshot, SnapshotError, SnapshotKey, SparseVector, Vocabulary, SNAPSHOT_FORMAT_VERSION};

pub const CHUNKS_FILE: &str = "chunks.json";
pub const INDEX_FILE: &str = "index.json";

#[derive(Serialize)]
struct ChunksOut<'a> { format_version: u32, chunks: &'a [DocumentChunk] }

#[derive(Deserialize)]
struct ChunksIn { format_version: u32, chunks: Vec<DocumentChunk> }

#[derive(Serialize)]
struct IndexOut<'a> {
	format_version: u32,
	chunks_digest: String,
	built_at: DateTime<Utc>,
	key: &'a SnapshotKey,
	vocabulary: &'a Vocabulary,
	idf: &'a [f32],
	vectors: &'a [SparseVector],
}

#[derive(Deserialize)]
struct IndexIn {
	format_version: u32,
	chunks_digest: String,
	built_at: DateTime<Utc>,
	key: SnapshotKey,
	vocabulary: Vocabulary,
	idf: Vec<f32>,
	vectors: Vec<SparseVector>,
}

/// Outcome of comparing the cached snapshot with the expected key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
	Fresh,
	Missing,
	CorpusChanged,
	ParamsChanged,
	Unreadable,
}

/// Summary of the cached snapshot, read from `index.json` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDescription {
	pub dir: PathBuf,
	pub built_at: DateTime<Utc>,
	pub chunks: usize,
	pub vocabulary: usize,
	pub files: usize,
	pub corpus_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct IndexCache {
	dir: PathBuf,
}

impl IndexCache {
	pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

	pub fn dir(&self) -> &Path { &self.dir }

	pub fn exists(&self) -> bool { self.dir.join(CHUNKS_FILE).is_file() && self.dir.join(INDEX_FILE).is_file() }

	/// Persist `snapshot`, replacing any previous one.
	pub fn save(&self, snapshot: &IndexSnapshot) -> Result<(), SnapshotError> {
		fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::io(&self.dir, e))?;
		let chunks_bytes = serde_json::to_vec(&ChunksOut { format_version: SNAPSHOT_FORMAT_VERSION, chunks: snapshot.chunks() })?;
		let index = IndexOut {
			format_version: SNAPSHOT_FORMAT_VERSION,
			chunks_digest: blake3::hash(&chunks_bytes).to_hex().to_string(),
			built_at: snapshot.built_at(),
			key: snapshot.key(),
			vocabulary: snapshot.vocabulary(),
			idf: snapshot.idf(),
			vectors: snapshot.vectors(),
		};
		let index_bytes = serde_json::to_vec(&index)?;
		self.publish(CHUNKS_FILE, &chunks_bytes)?;
		self.publish(INDEX_FILE, &index_bytes)?;
		info!(target: "redchamber::cache", dir = %self.dir.display(), chunks = snapshot.len(), "snapshot saved");
		Ok(())
	}

	/// The cached snapshot when it is readable, consistent and built for
	/// `expected`. Every failure is logged and reported as absent.
	pub fn load(&self, expected: &SnapshotKey) -> Option<IndexSnapshot> {
		if !self.exists() {
			info!(target: "redchamber::cache", dir = %self.dir.display(), "no cached snapshot");
			return None;
		}
		match self.try_load() {
			Ok(snapshot) if Self::is_fresh(&snapshot, expected) => {
				info!(target: "redchamber::cache", chunks = snapshot.len(), built_at = %snapshot.built_at(), "cached snapshot restored");
				Some(snapshot)
			}
			Ok(snapshot) => {
				warn!(target: "redchamber::cache", state = ?compare(snapshot.key(), expected), "cached snapshot is stale");
				None
			}
			Err(e) => {
				warn!(target: "redchamber::cache", dir = %self.dir.display(), error = %e, "cached snapshot unusable");
				None
			}
		}
	}

	pub fn is_fresh(snapshot: &IndexSnapshot, expected: &SnapshotKey) -> bool { snapshot.key() == expected }

	/// Freshness of the cache against `expected`, from `index.json` only.
	pub fn state(&self, expected: &SnapshotKey) -> CacheState {
		if !self.exists() {
			return CacheState::Missing;
		}
		match self.read_index() {
			Ok(index) => compare(&index.key, expected),
			Err(_) => CacheState::Unreadable,
		}
	}

	pub fn describe(&self) -> Result<Option<CacheDescription>, SnapshotError> {
		if !self.exists() {
			return Ok(None);
		}
		let index = self.read_index()?;
		Ok(Some(CacheDescription {
			dir: self.dir.clone(),
			built_at: index.built_at,
			chunks: index.vectors.len(),
			vocabulary: index.vocabulary.len(),
			files: index.key.fingerprint.files.len(),
			corpus_bytes: index.key.fingerprint.total_bytes(),
		}))
	}

	/// Remove both artifacts. Returns whether anything was removed.
	pub fn clear(&self) -> Result<bool, SnapshotError> {
		let mut removed = false;
		for name in [INDEX_FILE, CHUNKS_FILE] {
			let path = self.dir.join(name);
			match fs::remove_file(&path) {
				Ok(()) => removed = true,
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => return Err(SnapshotError::io(path, e)),
			}
		}
		info!(target: "redchamber::cache", dir = %self.dir.display(), removed, "cache cleared");
		Ok(removed)
	}

	fn try_load(&self) -> Result<IndexSnapshot, SnapshotError> {
		let index = self.read_index()?;
		let chunks_path = self.dir.join(CHUNKS_FILE);
		let chunks_bytes = fs::read(&chunks_path).map_err(|e| SnapshotError::io(&chunks_path, e))?;
		if blake3::hash(&chunks_bytes).to_hex().as_str() != index.chunks_digest {
			return Err(SnapshotError::DigestMismatch);
		}
		let chunks: ChunksIn = serde_json::from_slice(&chunks_bytes)?;
		check_version(chunks.format_version)?;
		IndexSnapshot::from_parts(chunks.chunks, index.vocabulary, index.idf, index.vectors, index.key, index.built_at)
	}

	fn read_index(&self) -> Result<IndexIn, SnapshotError> {
		let path = self.dir.join(INDEX_FILE);
		let bytes = fs::read(&path).map_err(|e| SnapshotError::io(&path, e))?;
		let index: IndexIn = serde_json::from_slice(&bytes)?;
		check_version(index.format_version)?;
		Ok(index)
	}

	fn publish(&self, name: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
		let target = self.dir.join(name);
		let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| SnapshotError::io(&self.dir, e))?;
		tmp.write_all(bytes).map_err(|e| SnapshotError::io(tmp.path(), e))?;
		tmp.as_file().sync_all().map_err(|e| SnapshotError::io(tmp.path(), e))?;
		tmp.persist(&target).map_err(|e| SnapshotError::io(&target, e.error))?;
		Ok(())
	}
}

fn check_version(found: u32) -> Result<(), SnapshotError> {
	if found == SNAPSHOT_FORMAT_VERSION {
		Ok(())
	} else {
		Err(SnapshotError::FormatVersion { found, expected: SNAPSHOT_FORMAT_VERSION })
	}
}

fn compare(cached: &SnapshotKey, expected: &SnapshotKey) -> CacheState {
	if cached.params != expected.params {
		CacheState::ParamsChanged
	} else if cached.fingerprint != expected.fingerprint {
		CacheState::CorpusChanged
	} else {
		CacheState::Fresh
	}
}
