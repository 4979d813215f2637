//! Loading pre-chunked course catalogs into the store.
//!
//! A catalog file is JSON:
//!
//! ```json
//! {
//!   "courses": [
//!     {
//!       "title": "Introduction to Machine Learning",
//!       "course_link": "https://example.com/ml",
//!       "instructor": "Dr. Test",
//!       "lessons": [{ "lesson_number": 0, "title": "Overview", "lesson_link": null }],
//!       "passages": [{ "lesson_number": 0, "chunk_index": 0, "content": "..." }]
//!     }
//!   ]
//! }
//! ```
//!
//! `chunk_index` may be omitted, in which case the passage's position in the
//! list is used. Two passages of a course may not share a lesson and chunk
//! index.

use crate::catalog::{Course, CourseCatalog, CoursePassage};
use crate::error::{Result, SyllabusError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub courses: Vec<CourseEntry>,
}

/// A course plus its already-chunked passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEntry {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub passages: Vec<PassageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageEntry {
    #[serde(default)]
    pub lesson_number: Option<u32>,
    #[serde(default)]
    pub chunk_index: Option<u32>,
    pub content: String,
}

impl CourseEntry {
    /// Passages tagged with this course's title.
    ///
    /// Fails if two passages end up with the same lesson and chunk index,
    /// since the store would keep only one of them.
    pub fn passages(&self) -> Result<Vec<CoursePassage>> {
        let mut seen = HashSet::new();
        let mut passages = Vec::with_capacity(self.passages.len());

        for (i, p) in self.passages.iter().enumerate() {
            let chunk_index = p.chunk_index.unwrap_or(i as u32);
            if !seen.insert((p.lesson_number, chunk_index)) {
                let lesson = p
                    .lesson_number
                    .map_or_else(|| "no lesson".to_string(), |n| format!("lesson {}", n));
                return Err(SyllabusError::InvalidInput(format!(
                    "Course '{}' has more than one passage at {}, chunk {}",
                    self.course.title, lesson, chunk_index
                )));
            }
            passages.push(CoursePassage {
                content: p.content.clone(),
                course_title: self.course.title.clone(),
                lesson_number: p.lesson_number,
                chunk_index,
            });
        }

        Ok(passages)
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub courses_added: usize,
    pub passages_added: usize,
    /// Titles skipped because they were already stored.
    pub skipped: Vec<String>,
}

/// Read one catalog file.
pub fn load_catalog_file(path: &Path) -> Result<CatalogFile> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        SyllabusError::InvalidInput(format!("Invalid catalog file {}: {}", path.display(), e))
    })
}

/// Catalog files at a path: the file itself, or every `.json` file in a
/// directory, sorted by name.
pub fn catalog_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SyllabusError::InvalidInput(format!(
            "Catalog path not found: {}",
            path.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Store every course in `file`.
///
/// Courses whose title is already stored are skipped unless `force` is set,
/// in which case their metadata and passages are replaced. Every entry is
/// checked before anything is written.
#[instrument(skip(catalog, file), fields(courses = file.courses.len()))]
pub async fn ingest_catalog(catalog: &CourseCatalog, file: &CatalogFile, force: bool) -> Result<IngestReport> {
    let prepared = file
        .courses
        .iter()
        .map(|entry| -> Result<_> { Ok((entry, entry.passages()?)) })
        .collect::<Result<Vec<_>>>()?;

    let existing: HashSet<String> = catalog.existing_course_titles().await?.into_iter().collect();
    let mut report = IngestReport::default();

    for (entry, passages) in prepared {
        let title = &entry.course.title;
        if !force && existing.contains(title) {
            info!("Course '{}' already stored, skipping", title);
            report.skipped.push(title.clone());
            continue;
        }

        if passages.is_empty() {
            warn!("Course '{}' has no passages", title);
        }

        catalog.add_course_metadata(&entry.course).await?;
        report.passages_added += catalog.add_course_content(&passages).await?;
        report.courses_added += 1;
    }

    info!(
        "Ingested {} courses ({} passages), skipped {}",
        report.courses_added,
        report.passages_added,
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalogIndex;
    use crate::embedding::HashingEmbedder;
    use std::sync::Arc;

    const SAMPLE: &str = r#"{
        "courses": [
            {
                "title": "Building Towards Computer Use",
                "course_link": "https://example.com/cu",
                "instructor": "Colt Steele",
                "lessons": [
                    {"lesson_number": 0, "title": "Introduction", "lesson_link": "https://example.com/cu/0"},
                    {"lesson_number": 1, "title": "API Basics"}
                ],
                "passages": [
                    {"lesson_number": 0, "content": "Welcome to the course."},
                    {"lesson_number": 1, "chunk_index": 7, "content": "Send a request to the messages endpoint."}
                ]
            }
        ]
    }"#;

    fn catalog() -> CourseCatalog {
        CourseCatalog::new(
            Arc::new(MemoryCatalogIndex::new()),
            Arc::new(HashingEmbedder::default()),
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_catalog_file() {
        let file: CatalogFile = serde_json::from_str(SAMPLE).unwrap();
        let entry = &file.courses[0];

        assert_eq!(entry.course.title, "Building Towards Computer Use");
        assert_eq!(entry.course.lessons.len(), 2);
        assert_eq!(entry.course.lessons[1].lesson_link, None);

        let passages = entry.passages().unwrap();
        assert_eq!(passages[0].chunk_index, 0);
        assert_eq!(passages[1].chunk_index, 7);
        assert_eq!(passages[1].course_title, "Building Towards Computer Use");
    }

    #[tokio::test]
    async fn test_ingest_skips_existing_unless_forced() {
        let file: CatalogFile = serde_json::from_str(SAMPLE).unwrap();
        let catalog = catalog();

        let first = ingest_catalog(&catalog, &file, false).await.unwrap();
        assert_eq!(first.courses_added, 1);
        assert_eq!(first.passages_added, 2);

        let second = ingest_catalog(&catalog, &file, false).await.unwrap();
        assert_eq!(second.courses_added, 0);
        assert_eq!(second.skipped, vec!["Building Towards Computer Use".to_string()]);

        let forced = ingest_catalog(&catalog, &file, true).await.unwrap();
        assert_eq!(forced.courses_added, 1);
        assert_eq!(catalog.course_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_passage_keys_rejected() {
        // Second passage defaults to chunk 1, which the third claims explicitly
        let file: CatalogFile = serde_json::from_str(
            r#"{"courses": [
                {"title": "Good", "passages": [{"lesson_number": 0, "content": "fine"}]},
                {"title": "Clashing", "passages": [
                    {"lesson_number": 1, "chunk_index": 0, "content": "first"},
                    {"lesson_number": 1, "content": "second"},
                    {"lesson_number": 1, "chunk_index": 1, "content": "third"}
                ]}
            ]}"#,
        )
        .unwrap();

        let err = file.courses[1].passages().unwrap_err();
        assert!(err.to_string().contains("lesson 1, chunk 1"));

        let catalog = catalog();
        let result = ingest_catalog(&catalog, &file, false).await;
        assert!(matches!(result, Err(SyllabusError::InvalidInput(_))));
        // Nothing is written, not even the valid course
        assert_eq!(catalog.course_count().await.unwrap(), 0);
    }

    #[test]
    fn test_catalog_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("a.json"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = catalog_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let loaded = load_catalog_file(&files[0]).unwrap();
        assert_eq!(loaded.courses.len(), 1);

        assert!(catalog_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_invalid_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"courses\": [{}]}").unwrap();
        assert!(matches!(
            load_catalog_file(&path),
            Err(SyllabusError::InvalidInput(_))
        ));
    }
}
