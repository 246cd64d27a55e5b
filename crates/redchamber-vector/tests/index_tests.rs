use std::fs;

use redchamber_core::chunker::ChunkingConfig;
use redchamber_core::config::IndexSettings;
use redchamber_core::corpus::{CorpusFingerprint, DataProcessor, FileStamp};
use redchamber_core::types::{Document, DocumentChunk};
use redchamber_text::TermTokenizer;
use redchamber_vector::cache::{CHUNKS_FILE, INDEX_FILE};
use redchamber_vector::{build, search, BuildParams, CacheState, IndexCache, IndexSnapshot, SnapshotKey};

fn key_for(tokenizer: &TermTokenizer, chunking: ChunkingConfig, files: &[(&str, u64)]) -> SnapshotKey {
    let fingerprint = CorpusFingerprint {
        files: files.iter().map(|(name, size)| FileStamp { name: name.to_string(), size: *size, modified_ms: 0 }).collect(),
    };
    SnapshotKey { fingerprint, params: BuildParams::new(chunking, IndexSettings::default(), tokenizer) }
}

fn chunk_doc(name: &str, content: &str, chunking: ChunkingConfig) -> Vec<DocumentChunk> {
    let processor = DataProcessor::new(Default::default(), chunking);
    processor.chunk_document(&Document { name: name.into(), path: name.into(), content: content.into() })
}

fn example_snapshot(tokenizer: &TermTokenizer) -> IndexSnapshot {
    let chunking = ChunkingConfig { chunk_size: 5, overlap: 0, carry_overlap: false };
    let chunks = chunk_doc("story.txt", "甲是谁。乙是谁。丙发生了什么事。", chunking.clone());
    build(chunks, tokenizer, key_for(tokenizer, chunking, &[("story.txt", 48)])).unwrap()
}

fn library_snapshot(tokenizer: &TermTokenizer) -> IndexSnapshot {
    let chunking = ChunkingConfig { chunk_size: 40, overlap: 0, carry_overlap: false };
    let mut chunks = chunk_doc(
        "a.txt",
        "贾宝玉衔玉而生，是荣国府的公子。林黛玉自幼体弱，寄居贾府。薛宝钗端庄稳重，随母入京。",
        chunking.clone(),
    );
    chunks.extend(chunk_doc(
        "b.txt",
        "刘姥姥进大观园，众人大笑。王熙凤协理宁国府，威重令行。贾宝玉与林黛玉共读西厢。",
        chunking.clone(),
    ));
    build(chunks, tokenizer, key_for(tokenizer, chunking, &[("a.txt", 10), ("b.txt", 20)])).unwrap()
}

#[test]
fn example_scenario_ranks_matching_sentence_first() {
    let tokenizer = TermTokenizer::default();
    let snapshot = example_snapshot(&tokenizer);
    assert_eq!(snapshot.len(), 3);

    let top = search(&snapshot, &tokenizer, "甲是谁", 1, 0.01);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].chunk.content, "甲是谁。");

    let all = search(&snapshot, &tokenizer, "甲是谁", 10, 0.0);
    assert_eq!(all.len(), 2, "the third chunk shares no term");
    assert!((all[0].similarity - 1.0).abs() < 1e-5);
    assert_eq!(all[1].chunk.content, "乙是谁。");
    assert!(all[0].similarity > all[1].similarity);
}

#[test]
fn vocabulary_is_sorted_with_unit_vectors() {
    let tokenizer = TermTokenizer::default();
    let snapshot = library_snapshot(&tokenizer);
    let terms = snapshot.vocabulary().terms();
    assert!(!terms.is_empty());
    assert!(terms.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(snapshot.idf().len(), terms.len());
    for v in snapshot.vectors().iter().filter(|v| !v.is_zero()) {
        let norm: f32 = v.weights.iter().map(|w| w * w).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}

#[test]
fn build_is_deterministic() {
    let tokenizer = TermTokenizer::default();
    let a = library_snapshot(&tokenizer);
    let b = library_snapshot(&tokenizer);
    assert_eq!(a.vocabulary(), b.vocabulary());
    assert_eq!(a.idf(), b.idf());
    assert_eq!(a.vectors(), b.vectors());
    for query in ["贾宝玉", "林黛玉 贾府", "大观园"] {
        assert_eq!(search(&a, &tokenizer, query, 5, 0.0), search(&b, &tokenizer, query, 5, 0.0));
    }
}

#[test]
fn max_features_keeps_most_frequent_terms() {
    let tokenizer = TermTokenizer::default();
    let chunking = ChunkingConfig { chunk_size: 10, overlap: 0, carry_overlap: false };
    let chunks = chunk_doc("x.txt", "红楼梦好。红楼人物。红楼诗词。梦醒时分。", chunking.clone());
    let mut key = key_for(&tokenizer, chunking, &[("x.txt", 1)]);
    key.params.index.max_features = 2;
    let snapshot = build(chunks, &tokenizer, key).unwrap();
    // "红楼" is in three chunks; every other term is in one, so ties fall back to term order.
    assert_eq!(snapshot.vocabulary().len(), 2);
    assert!(snapshot.vocabulary().index_of("红楼").is_some());
}

#[test]
fn max_df_drops_terms_present_everywhere() {
    let tokenizer = TermTokenizer::default();
    let chunking = ChunkingConfig { chunk_size: 6, overlap: 0, carry_overlap: false };
    let chunks = chunk_doc("x.txt", "宝玉来了。宝玉走了。宝玉笑了。", chunking.clone());
    let snapshot = build(chunks, &tokenizer, key_for(&tokenizer, chunking, &[("x.txt", 1)])).unwrap();
    assert!(snapshot.vocabulary().index_of("宝玉").is_none());
    assert!(snapshot.vocabulary().index_of("来了").is_some());
}

#[test]
fn empty_inputs_yield_empty_results() {
    let tokenizer = TermTokenizer::default();
    let chunking = ChunkingConfig::default();
    let empty = build(Vec::new(), &tokenizer, key_for(&tokenizer, chunking, &[])).unwrap();
    assert!(empty.is_empty());
    assert!(empty.vocabulary().is_empty());
    assert!(search(&empty, &tokenizer, "甲是谁", 3, 0.01).is_empty());

    let snapshot = example_snapshot(&tokenizer);
    assert!(search(&snapshot, &tokenizer, "", 3, 0.01).is_empty());
    assert!(search(&snapshot, &tokenizer, "的 了 。", 3, 0.01).is_empty());
    assert!(search(&snapshot, &tokenizer, "完全无关", 3, 0.0).is_empty());
    assert!(search(&snapshot, &tokenizer, "甲是谁", 0, 0.0).is_empty());
}

#[test]
fn threshold_and_top_k_are_monotonic() {
    let tokenizer = TermTokenizer::default();
    let snapshot = library_snapshot(&tokenizer);
    let query = "贾宝玉和林黛玉";
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.01, 0.05, 0.1, 0.3, 0.6, 0.9] {
        let n = search(&snapshot, &tokenizer, query, 100, threshold).len();
        assert!(n <= previous);
        previous = n;
    }
    let mut previous = 0;
    for top_k in 1..8 {
        let hits = search(&snapshot, &tokenizer, query, top_k, 0.0);
        assert!(hits.len() >= previous);
        assert!(hits.len() <= top_k);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        previous = hits.len();
    }
}

#[test]
fn ties_are_broken_by_chunk_order() {
    let tokenizer = TermTokenizer::default();
    let chunking = ChunkingConfig { chunk_size: 6, overlap: 0, carry_overlap: false };
    let mut chunks = chunk_doc("a.txt", "宝玉读书。黛玉葬花。", chunking.clone());
    chunks.extend(chunk_doc("b.txt", "宝玉读书。", chunking.clone()));
    let snapshot = build(chunks, &tokenizer, key_for(&tokenizer, chunking, &[("a.txt", 1), ("b.txt", 1)])).unwrap();
    let hits = search(&snapshot, &tokenizer, "宝玉读书", 5, 0.0);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].similarity, hits[1].similarity);
    assert_eq!(hits[0].chunk.doc_name, "a.txt");
    assert_eq!(hits[1].chunk.doc_name, "b.txt");
}

#[test]
fn cache_round_trip_preserves_search_results() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tokenizer = TermTokenizer::default();
    let snapshot = library_snapshot(&tokenizer);
    let cache = IndexCache::new(tmp.path().join("cache"));
    assert!(!cache.exists());
    cache.save(&snapshot).unwrap();
    assert!(cache.exists());

    let restored = cache.load(snapshot.key()).expect("fresh cache restores");
    assert_eq!(restored, snapshot);
    assert!(IndexCache::is_fresh(&restored, snapshot.key()));
    for query in ["贾宝玉", "刘姥姥 大观园", "王熙凤"] {
        assert_eq!(search(&restored, &tokenizer, query, 4, 0.01), search(&snapshot, &tokenizer, query, 4, 0.01));
    }

    let description = cache.describe().unwrap().unwrap();
    assert_eq!(description.chunks, snapshot.len());
    assert_eq!(description.vocabulary, snapshot.vocabulary().len());
    assert_eq!(description.files, 2);
    assert_eq!(description.corpus_bytes, 30);
}

#[test]
fn stale_key_is_reported_and_not_loaded() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tokenizer = TermTokenizer::default();
    let snapshot = library_snapshot(&tokenizer);
    let cache = IndexCache::new(tmp.path());
    cache.save(&snapshot).unwrap();
    assert_eq!(cache.state(snapshot.key()), CacheState::Fresh);

    let mut resized = snapshot.key().clone();
    resized.fingerprint.files[0].size += 1;
    assert_eq!(cache.state(&resized), CacheState::CorpusChanged);
    assert!(cache.load(&resized).is_none());

    let mut removed = snapshot.key().clone();
    removed.fingerprint.files.pop();
    assert_eq!(cache.state(&removed), CacheState::CorpusChanged);

    let mut rechunked = snapshot.key().clone();
    rechunked.params.chunking.chunk_size = 300;
    assert_eq!(cache.state(&rechunked), CacheState::ParamsChanged);
    assert!(cache.load(&rechunked).is_none());
}

#[test]
fn corrupt_or_partial_cache_is_treated_as_absent() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tokenizer = TermTokenizer::default();
    let snapshot = example_snapshot(&tokenizer);
    let cache = IndexCache::new(tmp.path());

    cache.save(&snapshot).unwrap();
    fs::write(tmp.path().join(INDEX_FILE), b"{ not json").unwrap();
    assert!(cache.load(snapshot.key()).is_none());
    assert_eq!(cache.state(snapshot.key()), CacheState::Unreadable);

    cache.save(&snapshot).unwrap();
    fs::remove_file(tmp.path().join(CHUNKS_FILE)).unwrap();
    assert_eq!(cache.state(snapshot.key()), CacheState::Missing);
    assert!(cache.load(snapshot.key()).is_none());

    // A chunk artifact from another save does not pair with this index.
    cache.save(&snapshot).unwrap();
    let other = library_snapshot(&tokenizer);
    let other_dir = tempfile::TempDir::new().unwrap();
    IndexCache::new(other_dir.path()).save(&other).unwrap();
    fs::copy(other_dir.path().join(CHUNKS_FILE), tmp.path().join(CHUNKS_FILE)).unwrap();
    assert!(cache.load(snapshot.key()).is_none());
}

#[test]
fn clear_removes_artifacts() {
    let tmp = tempfile::TempDir::new().unwrap();
    let tokenizer = TermTokenizer::default();
    let cache = IndexCache::new(tmp.path());
    assert!(!cache.clear().unwrap());
    cache.save(&example_snapshot(&tokenizer)).unwrap();
    assert!(cache.clear().unwrap());
    assert!(!cache.exists());
    assert!(cache.describe().unwrap().is_none());
}
