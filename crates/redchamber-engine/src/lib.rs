//! redchamber-engine
//!
//! Ties corpus loading, the tokenizer, the vector index and its cache into a
//! single retrieval service. The current snapshot is shared behind an
//! `RwLock<Arc<_>>`; rebuilds produce a new snapshot and swap it in only after
//! it has been saved, so queries always see one complete snapshot.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{info, warn};

use redchamber_core::answer::{AnswerOutcome, AnswerReport};
use redchamber_core::config::RagSettings;
use redchamber_core::corpus::{CorpusLoader, DataProcessor};
use redchamber_core::traits::{AnswerGenerator, Retriever};
use redchamber_core::types::{AskResponse, DocumentChunk, RankedSource, SearchHit};
use redchamber_text::{StopWords, TermTokenizer};
use redchamber_vector::{search, BuildParams, CacheState, IndexCache, IndexSnapshot, SnapshotError, SnapshotKey};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] redchamber_core::error::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Observer for index builds. Every method defaults to a no-op.
pub trait BuildProgress {
    fn start(&mut self, _documents: usize) {}
    fn document(&mut self, _name: &str, _chunks: usize) {}
    fn finish(&mut self, _chunks: usize) {}
}

impl BuildProgress for () {}

/// Everything needed to turn the corpus into a snapshot.
struct Pipeline {
    settings: RagSettings,
    corpus_dir: PathBuf,
    processor: DataProcessor,
    tokenizer: TermTokenizer,
    cache: IndexCache,
}

impl Pipeline {
    fn new(settings: RagSettings) -> Self {
        let corpus_dir = settings.data.corpus_path();
        let stopwords_file = settings.tokenizer.stopwords_file(&settings.data);
        let tokenizer = TermTokenizer::new(StopWords::load_or_default(stopwords_file.as_deref()));
        let processor = DataProcessor::new(CorpusLoader::new(settings.data.extensions.clone()), settings.chunking.clone());
        let cache = IndexCache::new(settings.data.cache_path());
        Self { settings, corpus_dir, processor, tokenizer, cache }
    }

    fn expected_key(&self) -> SnapshotKey {
        SnapshotKey {
            fingerprint: self.processor.loader().fingerprint(&self.corpus_dir),
            params: BuildParams::new(self.settings.chunking.clone(), self.settings.index.clone(), &self.tokenizer),
        }
    }

    fn load_or_build(&self, key: SnapshotKey, progress: &mut dyn BuildProgress) -> Result<IndexSnapshot> {
        match self.cache.load(&key) {
            Some(snapshot) => Ok(snapshot),
            None => self.build_and_save(key, progress),
        }
    }

    fn build_and_save(&self, key: SnapshotKey, progress: &mut dyn BuildProgress) -> Result<IndexSnapshot> {
        let snapshot = self.build(key, progress)?;
        self.cache.save(&snapshot)?;
        Ok(snapshot)
    }

    fn build(&self, key: SnapshotKey, progress: &mut dyn BuildProgress) -> Result<IndexSnapshot> {
        let started = Instant::now();
        let documents = self.processor.loader().load_documents(&self.corpus_dir);
        progress.start(documents.len());
        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for doc in &documents {
            let doc_chunks = self.processor.chunk_document(doc);
            progress.document(&doc.name, doc_chunks.len());
            chunks.extend(doc_chunks);
        }
        progress.finish(chunks.len());

        let snapshot = redchamber_vector::build(chunks, &self.tokenizer, key)?;
        info!(
            target: "redchamber::engine",
            documents = documents.len(),
            chunks = snapshot.len(),
            vocabulary = snapshot.vocabulary().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot built"
        );
        Ok(snapshot)
    }
}

pub struct RagEngine {
    pipeline: Pipeline,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    rebuild_lock: Mutex<()>,
}

impl RagEngine {
    /// Restore the cached snapshot when it is fresh, build and save one
    /// otherwise. A snapshot that cannot be saved is still served.
    pub fn open(settings: RagSettings) -> Result<Self> {
        Self::open_with(settings, &mut ())
    }

    pub fn open_with(settings: RagSettings, progress: &mut dyn BuildProgress) -> Result<Self> {
        settings.validate()?;
        let pipeline = Pipeline::new(settings);
        info!(
            target: "redchamber::engine",
            corpus = %pipeline.corpus_dir.display(),
            cache = %pipeline.cache.dir().display(),
            "opening engine"
        );
        let key = pipeline.expected_key();
        let snapshot = match pipeline.cache.load(&key) {
            Some(snapshot) => snapshot,
            None => {
                let snapshot = pipeline.build(key, progress)?;
                if let Err(e) = pipeline.cache.save(&snapshot) {
                    warn!(target: "redchamber::engine", error = %e, "snapshot not cached, serving it from memory");
                }
                snapshot
            }
        };
        Ok(Self { pipeline, snapshot: RwLock::new(Arc::new(snapshot)), rebuild_lock: Mutex::new(()) })
    }

    pub fn settings(&self) -> &RagSettings { &self.pipeline.settings }

    pub fn tokenizer(&self) -> &TermTokenizer { &self.pipeline.tokenizer }

    pub fn cache(&self) -> &IndexCache { &self.pipeline.cache }

    /// The snapshot queries currently run against.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Key that `settings` and the corpus they point at would produce,
    /// without opening an engine.
    pub fn expected_key_for(settings: &RagSettings) -> Result<SnapshotKey> {
        settings.validate()?;
        Ok(Pipeline::new(settings.clone()).expected_key())
    }

    /// Key the current corpus and settings would produce.
    pub fn expected_key(&self) -> SnapshotKey {
        self.pipeline.expected_key()
    }

    pub fn cache_state(&self) -> CacheState {
        self.pipeline.cache.state(&self.expected_key())
    }

    /// Bring the snapshot up to date with the corpus. Returns `true` when a
    /// different snapshot was installed.
    pub fn refresh(&self) -> Result<bool> {
        self.refresh_with(&mut ())
    }

    pub fn refresh_with(&self, progress: &mut dyn BuildProgress) -> Result<bool> {
        let _guard = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let key = self.expected_key();
        if self.snapshot().key() == &key {
            return Ok(false);
        }
        warn!(target: "redchamber::engine", "corpus or settings changed since the snapshot was built");
        let snapshot = self.pipeline.load_or_build(key, progress)?;
        self.install(snapshot);
        Ok(true)
    }

    /// Rebuild from the corpus, ignoring the cache.
    pub fn rebuild(&self) -> Result<()> {
        self.rebuild_with(&mut ())
    }

    pub fn rebuild_with(&self, progress: &mut dyn BuildProgress) -> Result<()> {
        let _guard = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.pipeline.build_and_save(self.expected_key(), progress)?;
        self.install(snapshot);
        Ok(())
    }

    pub fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<SearchHit> {
        let snapshot = self.snapshot();
        search(&snapshot, &self.pipeline.tokenizer, query, top_k, min_similarity)
    }

    pub fn ask(&self, question: &str, top_k: usize, min_similarity: f32) -> AskResponse {
        let sources: Vec<RankedSource> = self.search(question, top_k, min_similarity).into_iter().map(RankedSource::from).collect();
        info!(target: "redchamber::engine", sources = sources.len(), "retrieved sources");
        AskResponse { question: question.to_string(), sources }
    }

    /// Retrieve sources and hand them to `generator`. The generator is not
    /// called when nothing clears the similarity threshold.
    pub fn answer_with<G: AnswerGenerator + ?Sized>(&self, generator: &G, question: &str, top_k: usize, min_similarity: f32) -> AnswerReport {
        let response = self.ask(question, top_k, min_similarity);
        let outcome = if response.sources.is_empty() {
            AnswerOutcome::NoRelevantContent
        } else {
            match generator.generate(question, &response.sources) {
                Ok(answer) => AnswerOutcome::Answered(answer),
                Err(e) => {
                    warn!(target: "redchamber::engine", error = %e, retryable = e.is_retryable(), "answer generation failed");
                    AnswerOutcome::Failed(e)
                }
            }
        };
        AnswerReport { response, outcome }
    }

    fn install(&self, snapshot: IndexSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

impl Retriever for RagEngine {
    fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<SearchHit> {
        RagEngine::search(self, query, top_k, min_similarity)
    }
}
