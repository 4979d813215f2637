//! SQLite-based catalog index.
//!
//! Embeddings are stored as little-endian `f32` blobs and cosine similarity
//! is computed in Rust. Fine for catalogs of a few thousand passages.

use super::{
    best_course, cosine_similarity, rank_hits, CatalogIndex, Course, CoursePassage,
    CourseSummary, IndexedPassage, Lesson, PassageFilter, PassageHit,
};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        course_link TEXT,
        instructor TEXT,
        lessons_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS passages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_title TEXT NOT NULL,
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_passages_course ON passages(course_title, lesson_number);

    -- Lesson numbers are unsigned, so -1 stands in for "no lesson"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_passages_key
        ON passages(course_title, IFNULL(lesson_number, -1), chunk_index);
"#;

/// SQLite-based catalog index.
pub struct SqliteCatalogIndex {
    conn: Mutex<Connection>,
}

impl SqliteCatalogIndex {
    /// Open (or create) a catalog database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets readers proceed while ingestion writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite catalog at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::Catalog(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Course, Vec<u8>)> {
        let lessons_json: String = row.get(3)?;
        let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok((
            Course {
                title: row.get(0)?,
                course_link: row.get(1)?,
                instructor: row.get(2)?,
                lessons,
            },
            row.get(4)?,
        ))
    }
}

#[async_trait]
impl CatalogIndex for SqliteCatalogIndex {
    #[instrument(skip(self, course, title_embedding), fields(title = %course.title))]
    async fn upsert_course(&self, course: &Course, title_embedding: &[f32]) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, course_link, instructor, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                course.title,
                course.course_link,
                course.instructor,
                lessons_json,
                Self::embedding_to_bytes(title_embedding),
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Upserted course {}", course.title);
        Ok(())
    }

    #[instrument(skip(self, passages), fields(count = passages.len()))]
    async fn upsert_passages(&self, passages: &[IndexedPassage]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for indexed in passages {
            let p = &indexed.passage;

            // `IS` so a NULL lesson number still identifies the row
            tx.execute(
                "DELETE FROM passages WHERE course_title = ?1 AND lesson_number IS ?2 AND chunk_index = ?3",
                params![p.course_title, p.lesson_number, p.chunk_index],
            )?;
            tx.execute(
                r#"
                INSERT INTO passages (course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    p.course_title,
                    p.lesson_number,
                    p.chunk_index,
                    p.content,
                    Self::embedding_to_bytes(&indexed.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} passages", passages.len());
        Ok(passages.len())
    }

    #[instrument(skip_all)]
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, course_link, instructor, lessons_json, embedding FROM courses",
        )?;

        let rows = stmt.query_map([], Self::row_to_course)?;
        let mut scored = Vec::new();
        for row in rows {
            let (course, embedding) = row?;
            let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&embedding));
            scored.push((score, course));
        }

        Ok(best_course(scored))
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_passages(
        &self,
        query_embedding: &[f32],
        filter: &PassageFilter,
        limit: NonZeroUsize,
    ) -> Result<Vec<PassageHit>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, embedding
            FROM passages
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![filter.course_title, filter.lesson_number], |row| {
            let embedding: Vec<u8> = row.get(4)?;
            Ok(PassageHit {
                passage: CoursePassage {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: row.get(2)?,
                    content: row.get(3)?,
                },
                score: cosine_similarity(query_embedding, &Self::bytes_to_embedding(&embedding)),
            })
        })?;

        let hits = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        let ranked = rank_hits(hits, limit);

        debug!("Found {} matching passages", ranked.len());
        Ok(ranked)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT title, course_link, instructor, lessons_json, embedding FROM courses WHERE title = ?1",
                params![title],
                Self::row_to_course,
            )
            .optional()?;

        Ok(course.map(|(course, _)| course))
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.title, c.instructor, c.lessons_json, c.indexed_at,
                   (SELECT COUNT(*) FROM passages p WHERE p.course_title = c.title)
            FROM courses c
            ORDER BY c.title
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let lessons_json: String = row.get(2)?;
            let lesson_count = serde_json::from_str::<Vec<Lesson>>(&lessons_json)
                .map(|lessons| lessons.len() as u32)
                .unwrap_or(0);
            let indexed_at: String = row.get(3)?;

            Ok(CourseSummary {
                title: row.get(0)?,
                instructor: row.get(1)?,
                lesson_count,
                passage_count: row.get(4)?,
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn passage_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
