//! In-memory catalog index.
//!
//! Useful for testing and small catalogs.

use super::{
    best_course, cosine_similarity, rank_hits, CatalogIndex, Course, CourseSummary,
    IndexedPassage, PassageFilter, PassageHit,
};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::RwLock;

type PassageKey = (String, Option<u32>, u32);

struct StoredCourse {
    course: Course,
    embedding: Vec<f32>,
    indexed_at: DateTime<Utc>,
}

/// In-memory catalog index.
pub struct MemoryCatalogIndex {
    courses: RwLock<HashMap<String, StoredCourse>>,
    passages: RwLock<HashMap<PassageKey, IndexedPassage>>,
}

impl MemoryCatalogIndex {
    /// Create an empty in-memory index.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
            passages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCatalogIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> SyllabusError {
    SyllabusError::Catalog(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl CatalogIndex for MemoryCatalogIndex {
    async fn upsert_course(&self, course: &Course, title_embedding: &[f32]) -> Result<()> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        courses.insert(
            course.title.clone(),
            StoredCourse {
                course: course.clone(),
                embedding: title_embedding.to_vec(),
                indexed_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn upsert_passages(&self, passages: &[IndexedPassage]) -> Result<usize> {
        let mut store = self.passages.write().map_err(poisoned)?;
        for indexed in passages {
            let p = &indexed.passage;
            store.insert(
                (p.course_title.clone(), p.lesson_number, p.chunk_index),
                indexed.clone(),
            );
        }
        Ok(passages.len())
    }

    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(best_course(courses.values().map(|stored| {
            (
                cosine_similarity(query_embedding, &stored.embedding),
                stored.course.clone(),
            )
        })))
    }

    async fn search_passages(
        &self,
        query_embedding: &[f32],
        filter: &PassageFilter,
        limit: NonZeroUsize,
    ) -> Result<Vec<PassageHit>> {
        let passages = self.passages.read().map_err(poisoned)?;

        let hits: Vec<PassageHit> = passages
            .values()
            .filter(|indexed| filter.matches(&indexed.passage))
            .map(|indexed| PassageHit {
                passage: indexed.passage.clone(),
                score: cosine_similarity(query_embedding, &indexed.embedding),
            })
            .collect();

        Ok(rank_hits(hits, limit))
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.get(title).map(|stored| stored.course.clone()))
    }

    async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let courses = self.courses.read().map_err(poisoned)?;
        let passages = self.passages.read().map_err(poisoned)?;

        let mut passage_counts: HashMap<&str, u32> = HashMap::new();
        for (title, _, _) in passages.keys() {
            *passage_counts.entry(title.as_str()).or_default() += 1;
        }

        let mut summaries: Vec<CourseSummary> = courses
            .values()
            .map(|stored| CourseSummary {
                title: stored.course.title.clone(),
                instructor: stored.course.instructor.clone(),
                lesson_count: stored.course.lessons.len() as u32,
                passage_count: passage_counts
                    .get(stored.course.title.as_str())
                    .copied()
                    .unwrap_or(0),
                indexed_at: stored.indexed_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(summaries)
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.courses.read().map_err(poisoned)?.len())
    }

    async fn passage_count(&self) -> Result<usize> {
        Ok(self.passages.read().map_err(poisoned)?.len())
    }
}
