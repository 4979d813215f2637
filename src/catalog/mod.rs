//! Course catalog for Syllabus.
//!
//! Two collections back the catalog: course metadata (title, instructor,
//! link, ordered lessons) and content passages tagged with their course
//! title and lesson number. [`CatalogIndex`] is the storage seam with
//! in-memory and SQLite backends; [`CourseCatalog`] adds fuzzy course
//! resolution and filtered semantic search on top of it.

mod memory;
mod sqlite;
mod store;

pub use memory::MemoryCatalogIndex;
pub use sqlite::SqliteCatalogIndex;
pub use store::CourseCatalog;

use crate::config::{CatalogProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A single lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Position of the lesson; unique within its course.
    pub lesson_number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson, if published.
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// Course metadata. The title identifies the course within the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    #[serde(default)]
    pub course_link: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson by number.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A slice of course text, the unit of semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePassage {
    /// Text content.
    pub content: String,
    /// Title of the course this passage belongs to.
    pub course_title: String,
    /// Lesson the passage belongs to, if any.
    #[serde(default)]
    pub lesson_number: Option<u32>,
    /// Order of the passage within its lesson or course.
    pub chunk_index: u32,
}

/// A passage together with its embedding, as held by an index.
#[derive(Debug, Clone)]
pub struct IndexedPassage {
    pub passage: CoursePassage,
    pub embedding: Vec<f32>,
}

/// Equality filter applied to passage search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassageFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl PassageFilter {
    /// Whether a passage satisfies every set field.
    pub fn matches(&self, passage: &CoursePassage) -> bool {
        self.course_title
            .as_ref()
            .map_or(true, |title| *title == passage.course_title)
            && self
                .lesson_number
                .map_or(true, |n| passage.lesson_number == Some(n))
    }
}

/// A passage returned from search with its similarity score.
#[derive(Debug, Clone)]
pub struct PassageHit {
    /// The matched passage.
    pub passage: CoursePassage,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

impl PassageHit {
    /// Cosine distance, for callers that rank by distance.
    pub fn distance(&self) -> f32 {
        1.0 - self.score
    }
}

/// Outcome of a catalog search.
///
/// When `error` is set the hit list is empty and the result must not be read
/// as "zero matches".
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<PassageHit>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Successful search results.
    pub fn from_hits(hits: Vec<PassageHit>) -> Self {
        Self { hits, error: None }
    }

    /// An empty result carrying an error message.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// One lesson line in a course outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonOutline {
    pub lesson_number: u32,
    pub lesson_title: String,
    pub lesson_link: Option<String>,
}

/// Structured course listing, lessons in lesson-number order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<LessonOutline>,
}

impl From<Course> for CourseOutline {
    fn from(course: Course) -> Self {
        let mut lessons: Vec<LessonOutline> = course
            .lessons
            .into_iter()
            .map(|l| LessonOutline {
                lesson_number: l.lesson_number,
                lesson_title: l.title,
                lesson_link: l.lesson_link,
            })
            .collect();
        lessons.sort_by_key(|l| l.lesson_number);

        Self {
            title: course.title,
            course_link: course.course_link,
            instructor: course.instructor,
            lessons,
        }
    }
}

/// Summary information about an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub title: String,
    pub instructor: Option<String>,
    pub lesson_count: u32,
    pub passage_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Storage backend for the course catalog.
///
/// Writes happen during ingestion; query-time callers only read. Backends
/// must allow concurrent readers.
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Insert or replace a course, keyed by title.
    async fn upsert_course(&self, course: &Course, title_embedding: &[f32]) -> Result<()>;

    /// Insert or replace passages, keyed by (course, lesson, chunk index).
    async fn upsert_passages(&self, passages: &[IndexedPassage]) -> Result<usize>;

    /// The course whose title embedding is closest to the query, if any exist.
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<Course>>;

    /// Similarity search over passages matching the filter.
    async fn search_passages(
        &self,
        query_embedding: &[f32],
        filter: &PassageFilter,
        limit: NonZeroUsize,
    ) -> Result<Vec<PassageHit>>;

    /// Get a course by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// List all courses, sorted by title.
    async fn list_courses(&self) -> Result<Vec<CourseSummary>>;

    /// Number of stored courses.
    async fn course_count(&self) -> Result<usize>;

    /// Number of stored passages.
    async fn passage_count(&self) -> Result<usize>;
}

/// Open the catalog backend selected by the settings.
pub fn open_index(settings: &Settings) -> Result<Arc<dyn CatalogIndex>> {
    let index: Arc<dyn CatalogIndex> = match settings.catalog.provider {
        CatalogProvider::Sqlite => Arc::new(SqliteCatalogIndex::new(&settings.sqlite_path())?),
        CatalogProvider::Memory => Arc::new(MemoryCatalogIndex::new()),
    };
    Ok(index)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank scored items best-first and keep the top `limit`.
pub(crate) fn rank_hits(mut hits: Vec<PassageHit>, limit: NonZeroUsize) -> Vec<PassageHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.passage.course_title.cmp(&b.passage.course_title))
            .then_with(|| a.passage.lesson_number.cmp(&b.passage.lesson_number))
            .then_with(|| a.passage.chunk_index.cmp(&b.passage.chunk_index))
    });
    hits.truncate(limit.get());
    hits
}

/// Pick the best-scoring course; ties go to the alphabetically first title.
pub(crate) fn best_course<I>(scored: I) -> Option<Course>
where
    I: IntoIterator<Item = (f32, Course)>,
{
    scored
        .into_iter()
        .max_by(|(sa, a), (sb, b)| {
            sa.partial_cmp(sb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.title.cmp(&a.title))
        })
        .map(|(_, course)| course)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(course: &str, lesson: Option<u32>, chunk: u32) -> CoursePassage {
        CoursePassage {
            content: "text".to_string(),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: chunk,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_filter_matches() {
        let p = passage("Course A", Some(2), 0);

        assert!(PassageFilter::default().matches(&p));
        assert!(PassageFilter {
            course_title: Some("Course A".to_string()),
            lesson_number: Some(2),
        }
        .matches(&p));
        assert!(!PassageFilter {
            course_title: Some("Course B".to_string()),
            lesson_number: None,
        }
        .matches(&p));
        assert!(!PassageFilter {
            course_title: None,
            lesson_number: Some(1),
        }
        .matches(&passage("Course A", None, 0)));
    }

    #[test]
    fn test_outline_sorts_lessons() {
        let course = Course {
            title: "Course".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![
                Lesson {
                    lesson_number: 2,
                    title: "Two".to_string(),
                    lesson_link: None,
                },
                Lesson {
                    lesson_number: 0,
                    title: "Zero".to_string(),
                    lesson_link: None,
                },
            ],
        };

        let outline = CourseOutline::from(course);
        let numbers: Vec<u32> = outline.lessons.iter().map(|l| l.lesson_number).collect();
        assert_eq!(numbers, vec![0, 2]);
        assert_eq!(outline.lessons[0].lesson_title, "Zero");
    }

    #[test]
    fn test_search_results_error_is_empty() {
        let results = SearchResults::from_error("boom");
        assert!(results.is_empty());
        assert_eq!(results.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_best_course_tie_breaks_by_title() {
        let make = |title: &str| Course {
            title: title.to_string(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        };

        let best = best_course(vec![(0.5, make("Beta")), (0.5, make("Alpha")), (0.1, make("Gamma"))]);
        assert_eq!(best.unwrap().title, "Alpha");
        assert!(best_course(Vec::new()).is_none());
    }

    #[test]
    fn test_rank_hits_truncates() {
        let hits = vec![
            PassageHit {
                passage: passage("A", Some(0), 0),
                score: 0.2,
            },
            PassageHit {
                passage: passage("A", Some(1), 0),
                score: 0.9,
            },
            PassageHit {
                passage: passage("A", Some(2), 0),
                score: 0.5,
            },
        ];

        let ranked = rank_hits(hits, NonZeroUsize::new(2).unwrap());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].passage.lesson_number, Some(1));
        assert_eq!(ranked[1].passage.lesson_number, Some(2));
        assert!((ranked[0].distance() - 0.1).abs() < 1e-6);
    }
}
