//! Query-time catalog operations: course resolution, filtered search, outlines.

use super::{
    CatalogIndex, Course, CourseOutline, CoursePassage, CourseSummary, IndexedPassage,
    PassageFilter, SearchResults,
};
use crate::embedding::Embedder;
use crate::error::{Result, SyllabusError};
use std::collections::{BTreeSet, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Course catalog with fuzzy title resolution and filtered semantic search.
///
/// Cheap to clone; clones share the same index and embedder.
#[derive(Clone)]
pub struct CourseCatalog {
    index: Arc<dyn CatalogIndex>,
    embedder: Arc<dyn Embedder>,
    max_results: NonZeroUsize,
}

impl CourseCatalog {
    /// Create a catalog over an index.
    ///
    /// `max_results` is the default search limit. Zero is a configuration
    /// error and is rejected here rather than at query time.
    pub fn new(
        index: Arc<dyn CatalogIndex>,
        embedder: Arc<dyn Embedder>,
        max_results: usize,
    ) -> Result<Self> {
        let max_results = NonZeroUsize::new(max_results).ok_or_else(|| {
            SyllabusError::Config("max_results must be greater than 0".to_string())
        })?;

        Ok(Self {
            index,
            embedder,
            max_results,
        })
    }

    /// Default number of passages returned by [`search`](Self::search).
    pub fn max_results(&self) -> NonZeroUsize {
        self.max_results
    }

    /// Resolve a partial or misspelled course name to the closest stored title.
    ///
    /// There is no similarity floor: any query resolves to some course as long
    /// as the catalog is non-empty. `None` means the catalog holds no courses.
    #[instrument(skip(self))]
    pub async fn resolve_course_title(&self, query: &str) -> Result<Option<String>> {
        let embedding = self.embedder.embed(query).await?;
        let course = self.index.nearest_course(&embedding).await?;

        match &course {
            Some(c) => debug!("Resolved '{}' to course '{}'", query, c.title),
            None => debug!("No courses stored; '{}' unresolved", query),
        }

        Ok(course.map(|c| c.title))
    }

    /// Semantic search over passages, optionally scoped to a course and lesson.
    ///
    /// Never fails: index and embedding failures come back in
    /// [`SearchResults::error`]. A course name that cannot be resolved also
    /// yields an error-tagged result instead of a catalog-wide search.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<NonZeroUsize>,
    ) -> SearchResults {
        let course_title = match course_title {
            Some(name) => match self.resolve_course_title(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => {
                    return SearchResults::from_error(format!(
                        "No course found matching '{}'",
                        name
                    ))
                }
                Err(e) => {
                    warn!("Course resolution failed: {}", e);
                    return SearchResults::from_error(format!("Search error: {}", e));
                }
            },
            None => None,
        };

        let filter = PassageFilter {
            course_title,
            lesson_number,
        };

        match self.search_filtered(query, &filter, limit.unwrap_or(self.max_results)).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Passage search failed: {}", e);
                SearchResults::from_error(format!("Search error: {}", e))
            }
        }
    }

    async fn search_filtered(
        &self,
        query: &str,
        filter: &PassageFilter,
        limit: NonZeroUsize,
    ) -> Result<SearchResults> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.index.search_passages(&embedding, filter, limit).await?;
        debug!("Search for '{}' returned {} passages", query, hits.len());
        Ok(SearchResults::from_hits(hits))
    }

    /// Resolve a course name and return its outline, lessons in number order.
    #[instrument(skip(self))]
    pub async fn get_course_outline(&self, query: &str) -> Result<Option<CourseOutline>> {
        let Some(title) = self.resolve_course_title(query).await? else {
            return Ok(None);
        };

        let course = self.index.get_course(&title).await?;
        Ok(course.map(CourseOutline::from))
    }

    /// Link for a lesson, if the course and lesson exist and carry one.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let course = self.index.get_course(course_title).await?;
        Ok(course
            .as_ref()
            .and_then(|c| c.lesson(lesson_number))
            .and_then(|l| l.lesson_link.clone()))
    }

    /// Insert or replace course metadata, keyed by title.
    #[instrument(skip(self, course), fields(title = %course.title))]
    pub async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        if course.title.trim().is_empty() {
            return Err(SyllabusError::InvalidInput(
                "Course title must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = course.lessons.iter().find(|l| !seen.insert(l.lesson_number)) {
            return Err(SyllabusError::InvalidInput(format!(
                "Course '{}' has duplicate lesson number {}",
                course.title, dup.lesson_number
            )));
        }

        let embedding = self.embedder.embed(&course.title).await?;
        self.index.upsert_course(course, &embedding).await?;

        info!("Stored course metadata for '{}'", course.title);
        Ok(())
    }

    /// Insert or replace content passages.
    ///
    /// Every passage must reference a course already stored.
    #[instrument(skip(self, passages), fields(count = passages.len()))]
    pub async fn add_course_content(&self, passages: &[CoursePassage]) -> Result<usize> {
        if passages.is_empty() {
            return Ok(0);
        }

        let titles: BTreeSet<&str> = passages.iter().map(|p| p.course_title.as_str()).collect();
        for title in titles {
            if self.index.get_course(title).await?.is_none() {
                return Err(SyllabusError::InvalidInput(format!(
                    "Passages reference unknown course '{}'",
                    title
                )));
            }
        }

        let texts: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != passages.len() {
            return Err(SyllabusError::Embedding(format!(
                "Expected {} embeddings, got {}",
                passages.len(),
                embeddings.len()
            )));
        }

        let indexed: Vec<IndexedPassage> = passages
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(passage, embedding)| IndexedPassage { passage, embedding })
            .collect();

        self.index.upsert_passages(&indexed).await
    }

    /// Titles of every stored course, sorted.
    pub async fn existing_course_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .index
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect())
    }

    /// Summaries of every stored course, sorted by title.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        self.index.list_courses().await
    }

    /// Number of stored courses.
    pub async fn course_count(&self) -> Result<usize> {
        self.index.course_count().await
    }
}
