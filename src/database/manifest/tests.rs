use super::*;
use tempfile::TempDir;

fn manifest() -> IndexManifest {
    IndexManifest {
        name: "breastfeeding_index".to_string(),
        embedding_model: "all-minilm:latest".to_string(),
        dimension: 384,
        distance: DISTANCE_METRIC.to_string(),
        chunk_count: 120,
        source_files: vec!["nhs_qa_strings.json".to_string()],
        built_at: Utc::now(),
    }
}

#[test]
fn save_and_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let original = manifest();

    let path = original.save(temp_dir.path()).expect("should save manifest");
    assert_eq!(
        path,
        temp_dir.path().join("breastfeeding_index.manifest.json")
    );

    let loaded = IndexManifest::load(temp_dir.path(), "breastfeeding_index")
        .expect("should load manifest");
    assert_eq!(original, loaded);
}

#[test]
fn missing_manifest_is_a_storage_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = IndexManifest::load(temp_dir.path(), "absent");
    assert!(matches!(result, Err(RagError::Storage(_))));
}

#[test]
fn corrupt_manifest_is_a_storage_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(IndexManifest::path(temp_dir.path(), "broken"), "{ not json")
        .expect("should write file");

    let result = IndexManifest::load(temp_dir.path(), "broken");
    assert!(matches!(result, Err(RagError::Storage(_))));
}

#[test]
fn unwritable_directory_is_a_config_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = manifest().save(&temp_dir.path().join("does-not-exist"));
    assert!(matches!(result, Err(RagError::Config(_))));
}

#[test]
fn remove_deletes_manifest() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    manifest().save(temp_dir.path()).expect("should save manifest");

    IndexManifest::remove(temp_dir.path(), "breastfeeding_index").expect("should remove");
    assert!(!IndexManifest::path(temp_dir.path(), "breastfeeding_index").exists());

    IndexManifest::remove(temp_dir.path(), "breastfeeding_index")
        .expect("removing a missing manifest is fine");
}

#[test]
fn verify_accepts_matching_model() {
    assert!(manifest().verify("all-minilm:latest", 384).is_ok());
}

#[test]
fn verify_rejects_other_model() {
    let result = manifest().verify("nomic-embed-text:latest", 384);
    assert!(matches!(result, Err(RagError::Storage(_))));
}

#[test]
fn verify_rejects_dimension_mismatch() {
    let result = manifest().verify("all-minilm:latest", 768);
    assert!(matches!(result, Err(RagError::Storage(_))));
}
