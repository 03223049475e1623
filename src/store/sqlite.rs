//! SQLite-backed [`ArtifactStore`].
//!
//! The set union happens in the database: every artifact row is unique over
//! its full content, and a merge is one transaction of
//! `INSERT ... ON CONFLICT DO NOTHING` statements. There is no
//! read-modify-write cycle, so concurrent merges into one course cannot lose
//! each other's artifacts.

use super::{normalize_username, ArtifactStore, CourseKey, CourseRecord};
use crate::error::Doc2StudyError;
use crate::output::{Artifacts, Flashcard, QuizQuestion};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Row, Sqlite, Transaction};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, info};

/// Store backed by a sqlx SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// `sqlite::memory:` gives a private database that lives as long as the
    /// store; it is held on a single pooled connection.
    pub async fn connect(url: &str) -> Result<Self, Doc2StudyError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self::new(pool);
        store.run_migrations().await?;
        info!("Opened course store at {}", url);
        Ok(store)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), Doc2StudyError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn record_id(&self, key: &CourseKey) -> Result<Option<i64>, Doc2StudyError> {
        let row = sqlx::query("SELECT id FROM course_records WHERE username = ? AND course = ?")
            .bind(&key.username)
            .bind(&key.course)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

// ── Row types ────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct FlashcardRow {
    front: String,
    back: String,
}

impl FlashcardRow {
    fn to_domain(self) -> Flashcard {
        Flashcard {
            front: self.front,
            back: self.back,
        }
    }
}

#[derive(FromRow)]
struct QuizRow {
    question: String,
    options: String,
    answer: String,
}

impl QuizRow {
    fn to_domain(self) -> Result<QuizQuestion, Doc2StudyError> {
        let options: Vec<String> = serde_json::from_str(&self.options).map_err(|e| {
            Doc2StudyError::StorageUnavailable {
                detail: format!("corrupt quiz options column: {e}"),
            }
        })?;
        Ok(QuizQuestion {
            question: self.question,
            options,
            answer: self.answer,
        })
    }
}

// ── Merge ────────────────────────────────────────────────────────────────────

async fn upsert_record(
    tx: &mut Transaction<'_, Sqlite>,
    key: &CourseKey,
) -> Result<i64, Doc2StudyError> {
    let row = sqlx::query(
        "INSERT INTO course_records (username, course) VALUES (?, ?) \
         ON CONFLICT (username, course) DO UPDATE SET updated_at = datetime('now') \
         RETURNING id",
    )
    .bind(&key.username)
    .bind(&key.course)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.get("id"))
}

async fn insert_flashcards(
    tx: &mut Transaction<'_, Sqlite>,
    record_id: i64,
    cards: &[Flashcard],
) -> Result<usize, Doc2StudyError> {
    let mut added = 0;
    for card in cards {
        let result = sqlx::query(
            "INSERT INTO flashcards (record_id, front, back) VALUES (?, ?, ?) \
             ON CONFLICT DO NOTHING",
        )
        .bind(record_id)
        .bind(&card.front)
        .bind(&card.back)
        .execute(&mut **tx)
        .await?;
        added += result.rows_affected() as usize;
    }
    Ok(added)
}

async fn insert_quizzes(
    tx: &mut Transaction<'_, Sqlite>,
    record_id: i64,
    questions: &[QuizQuestion],
) -> Result<usize, Doc2StudyError> {
    let mut added = 0;
    for q in questions {
        let options = serde_json::to_string(&q.options)
            .map_err(|e| Doc2StudyError::Internal(format!("encode quiz options: {e}")))?;
        let result = sqlx::query(
            "INSERT INTO quiz_questions (record_id, question, options, answer) VALUES (?, ?, ?, ?) \
             ON CONFLICT DO NOTHING",
        )
        .bind(record_id)
        .bind(&q.question)
        .bind(options)
        .bind(&q.answer)
        .execute(&mut **tx)
        .await?;
        added += result.rows_affected() as usize;
    }
    Ok(added)
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn accumulate(
        &self,
        key: &CourseKey,
        artifacts: &Artifacts,
    ) -> Result<usize, Doc2StudyError> {
        let mut tx = self.pool.begin().await?;
        let record_id = upsert_record(&mut tx, key).await?;
        let added = match artifacts {
            Artifacts::Flashcards(cards) => insert_flashcards(&mut tx, record_id, cards).await?,
            Artifacts::Quiz(questions) => insert_quizzes(&mut tx, record_id, questions).await?,
        };
        tx.commit().await?;

        debug!(
            "Merged {} {} into {}: {} new",
            artifacts.len(),
            artifacts.kind(),
            key,
            added
        );
        Ok(added)
    }

    async fn fetch(&self, key: &CourseKey) -> Result<CourseRecord, Doc2StudyError> {
        let Some(record_id) = self.record_id(key).await? else {
            return Ok(CourseRecord::empty(key.clone()));
        };

        let flashcards = sqlx::query_as::<_, FlashcardRow>(
            "SELECT front, back FROM flashcards WHERE record_id = ? ORDER BY id",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(FlashcardRow::to_domain)
        .collect();

        let quizzes = sqlx::query_as::<_, QuizRow>(
            "SELECT question, options, answer FROM quiz_questions WHERE record_id = ? ORDER BY id",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(QuizRow::to_domain)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(CourseRecord {
            key: key.clone(),
            flashcards,
            quizzes,
        })
    }

    async fn list_courses(&self, username: &str) -> Result<BTreeSet<String>, Doc2StudyError> {
        let rows = sqlx::query("SELECT course FROM course_records WHERE username = ?")
            .bind(normalize_username(username))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("course")).collect())
    }
}
