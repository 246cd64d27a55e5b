use std::fs;
use std::io::Write;
use tempfile::TempDir;

use redchamber_core::chunker::ChunkingConfig;
use redchamber_core::corpus::{CorpusLoader, DataProcessor};

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "甄士隐梦幻识通灵。").unwrap();

    let processor = DataProcessor::default();
    let chunks = processor.process_directory(dir);

    assert_eq!(chunks.len(), 1, "one short sentence becomes one chunk");
    assert_eq!(chunks[0].content, "甄士隐梦幻识通灵。");
    assert_eq!(chunks[0].id, "a.txt:0");
    assert_eq!(chunks[0].doc_name, "a.txt");
    assert_eq!(chunks[0].total_chunks, 1);
}

#[test]
fn chunks_keep_document_order_and_indices() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.txt"), "乙一。乙二。").unwrap();
    fs::write(dir.join("a.txt"), "甲一。甲二。").unwrap();

    let processor = DataProcessor::new(
        CorpusLoader::default(),
        ChunkingConfig { chunk_size: 3, overlap: 0, carry_overlap: false },
    );
    let chunks = processor.process_directory(dir);
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt:0", "a.txt:1", "b.txt:0", "b.txt:1"]);
    assert!(chunks.iter().all(|c| c.total_chunks == 2));
}

#[test]
fn unreadable_and_blank_files_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("good.txt"), "好了歌。").unwrap();
    fs::write(dir.join("binary.txt"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
    fs::write(dir.join("blank.txt"), "  \n\n ").unwrap();
    fs::write(dir.join("notes.md"), "不是文本语料。").unwrap();

    let docs = CorpusLoader::default().load_documents(dir);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "good.txt");
}

#[test]
fn nested_files_are_named_relative_to_root() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("vol1")).unwrap();
    fs::write(dir.join("vol1/ch01.txt"), "第一回。").unwrap();

    let docs = CorpusLoader::default().load_documents(dir);
    assert_eq!(docs[0].name, "vol1/ch01.txt");
}

#[test]
fn missing_corpus_directory_is_an_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    let loader = CorpusLoader::default();
    assert!(loader.load_documents(&missing).is_empty());
    assert!(loader.fingerprint(&missing).is_empty());
    assert!(DataProcessor::default().process_directory(&missing).is_empty());
}

#[test]
fn extensions_are_configurable() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "甲。").unwrap();
    fs::write(dir.join("b.MD"), "乙。").unwrap();

    let loader = CorpusLoader::new(vec![".md".to_string()]);
    let names: Vec<String> = loader.load_documents(dir).into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["b.MD"]);
}

#[test]
fn fingerprint_tracks_file_set_and_sizes() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let loader = CorpusLoader::default();
    fs::write(dir.join("a.txt"), "甲是谁。").unwrap();

    let first = loader.fingerprint(dir);
    assert_eq!(first, loader.fingerprint(dir), "unchanged corpus has a stable fingerprint");
    assert_eq!(first.files.len(), 1);
    assert_eq!(first.total_bytes(), "甲是谁。".len() as u64);

    fs::write(dir.join("a.txt"), "甲是谁？乙是谁？").unwrap();
    let resized = loader.fingerprint(dir);
    assert_ne!(first, resized);

    fs::write(dir.join("b.txt"), "丙。").unwrap();
    let added = loader.fingerprint(dir);
    assert_ne!(resized, added);
    assert_eq!(added.files.len(), 2);

    fs::remove_file(dir.join("a.txt")).unwrap();
    let removed = loader.fingerprint(dir);
    assert_eq!(removed.files.len(), 1);
    assert_eq!(removed.files[0].name, "b.txt");
}
