//! Catalog behaviour on the SQLite backend, including ingestion and reopen.

mod common;

use common::{ml_catalog, ML_TITLE};
use std::sync::Arc;
use syllabus::catalog::{CourseCatalog, SqliteCatalogIndex};
use syllabus::config::{CatalogProvider, EmbeddingProvider, Settings};
use syllabus::embedding::HashingEmbedder;
use syllabus::ingest::{ingest_catalog, load_catalog_file};
use syllabus::rag::open_catalog;
use tempfile::TempDir;

#[tokio::test]
async fn fuzzy_course_search_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(SqliteCatalogIndex::new(&dir.path().join("catalog.db")).unwrap());
    let catalog = ml_catalog(index).await;

    let results = catalog.search("linear equation", Some("Intro"), None, None).await;
    assert!(results.error.is_none());
    assert!(results.hits[0].passage.content.contains("Linear regression"));

    let outline = catalog.get_course_outline("machine learning").await.unwrap().unwrap();
    let numbers: Vec<u32> = outline.lessons.iter().map(|l| l.lesson_number).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
}

#[tokio::test]
async fn catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");

    {
        let index = Arc::new(SqliteCatalogIndex::new(&path).unwrap());
        ml_catalog(index).await;
    }

    let index = Arc::new(SqliteCatalogIndex::new(&path).unwrap());
    let catalog = CourseCatalog::new(index, Arc::new(HashingEmbedder::default()), 5).unwrap();

    assert_eq!(catalog.course_count().await.unwrap(), 1);
    let resolved = catalog.resolve_course_title("ML intro").await.unwrap();
    assert_eq!(resolved.as_deref(), Some(ML_TITLE));
}

#[tokio::test]
async fn ingest_file_through_settings() {
    let dir = TempDir::new().unwrap();

    let mut settings = Settings::default();
    settings.catalog.provider = CatalogProvider::Sqlite;
    settings.catalog.sqlite_path = dir.path().join("db").join("catalog.db").to_string_lossy().to_string();
    settings.embedding.provider = EmbeddingProvider::Hashing;
    settings.embedding.dimensions = 256;

    let file_path = dir.path().join("courses.json");
    std::fs::write(
        &file_path,
        serde_json::json!({
            "courses": [{
                "title": "Prompt Compression and Query Optimization",
                "instructor": "Richmond Alake",
                "lessons": [
                    {"lesson_number": 0, "title": "Introduction"},
                    {"lesson_number": 1, "title": "Vector Search"}
                ],
                "passages": [
                    {"lesson_number": 0, "content": "This course covers prompt compression."},
                    {"lesson_number": 1, "content": "Vector search retrieves similar embeddings."}
                ]
            }]
        })
        .to_string(),
    )
    .unwrap();

    let catalog = open_catalog(&settings).unwrap();
    let file = load_catalog_file(&file_path).unwrap();
    let report = ingest_catalog(&catalog, &file, false).await.unwrap();
    assert_eq!(report.courses_added, 1);
    assert_eq!(report.passages_added, 2);

    let results = catalog.search("vector search", Some("Prompt"), Some(1), None).await;
    assert!(results.error.is_none());
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].passage.lesson_number, Some(1));
}
