use super::*;
use crate::indexer::IndexBuilder;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Letter-frequency vectors under a configurable model name
struct LetterEmbedder {
    model: &'static str,
}

impl Embedder for LetterEmbedder {
    fn model_id(&self) -> &str {
        self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

fn letters() -> Arc<dyn Embedder> {
    Arc::new(LetterEmbedder { model: "letters" })
}

async fn build_index(dir: &Path, chunks: &[&str]) -> PathBuf {
    let source = dir.join("chunks.json");
    fs::write(&source, serde_json::to_string(chunks).expect("chunks serialize"))
        .expect("should write chunk file");
    let index_dir = dir.join("index");
    IndexBuilder::new(letters())
        .build(&[source], &index_dir, "qa")
        .await
        .expect("build should succeed");
    index_dir
}

#[tokio::test]
async fn retrieves_nearest_chunk_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["zzzz", "aaaa", "mmmm"]).await;

    let retriever = Retriever::open(&index_dir, "qa", letters())
        .await
        .expect("retriever should open");
    let chunks = retriever.retrieve("aaa", 2).await.expect("should retrieve");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], "aaaa");
}

#[tokio::test]
async fn k_larger_than_index_returns_everything() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["only chunk"]).await;

    let retriever = Retriever::open(&index_dir, "qa", letters())
        .await
        .expect("retriever should open");
    let chunks = retriever.retrieve("anything", 5).await.expect("should retrieve");

    assert_eq!(chunks, vec!["only chunk"]);
}

#[tokio::test]
async fn repeated_queries_are_stable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["night feeds", "latch pain", "pumping"]).await;

    let retriever = Retriever::open(&index_dir, "qa", letters())
        .await
        .expect("retriever should open");
    let first = retriever.search("latch", 3).await.expect("first search");
    let second = retriever.search("latch", 3).await.expect("second search");

    assert_eq!(first, second);
}

#[tokio::test]
async fn manifest_is_exposed() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["a", "b"]).await;

    let retriever = Retriever::open(&index_dir, "qa", letters())
        .await
        .expect("retriever should open");
    assert_eq!(retriever.manifest().chunk_count, 2);
    assert_eq!(retriever.manifest().embedding_model, "letters");
}

#[tokio::test]
async fn different_embedding_model_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["a"]).await;

    let other: Arc<dyn Embedder> = Arc::new(LetterEmbedder { model: "other-model" });
    let result = Retriever::open(&index_dir, "qa", other).await;

    assert!(matches!(result, Err(RagError::Storage(_))));
}

#[tokio::test]
async fn missing_index_is_a_storage_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let result = Retriever::open(temp_dir.path(), "qa", letters()).await;
    assert!(matches!(result, Err(RagError::Storage(_))));
}

#[tokio::test]
async fn table_disagreeing_with_manifest_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_dir = build_index(temp_dir.path(), &["one", "two"]).await;

    let mut store = VectorStore::open(&index_dir, "qa").await.expect("index should open");
    store
        .insert(&[crate::database::IndexRecord {
            position: 2,
            vector: vec![0.0; 26],
            content: "stray".to_string(),
        }])
        .await
        .expect("should insert stray row");

    let result = Retriever::open(&index_dir, "qa", letters()).await;
    assert!(matches!(result, Err(RagError::Storage(_))));
}
