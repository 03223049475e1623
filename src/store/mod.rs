//! Course records: the persistent, per-(user, course) union of artifacts.
//!
//! A generation run never replaces what a course already holds. Each batch is
//! merged as a set union into the field its [`ArtifactKind`] selects, so
//! generating the same artifacts twice leaves the record unchanged.
//!
//! [`ArtifactStore`] is the seam; [`SqliteStore`] persists to SQLite via sqlx
//! and [`MemoryStore`] keeps everything in process.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Doc2StudyError;
use crate::output::{ArtifactKind, Artifacts, Flashcard, QuizQuestion};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Course name used when the caller leaves it blank.
pub const DEFAULT_COURSE: &str = "General";

/// Identifies one course record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey {
    pub username: String,
    /// Title-cased course name.
    pub course: String,
}

impl CourseKey {
    /// Build a key, normalising the course name with [`normalize_course`].
    pub fn new(username: impl Into<String>, course: &str) -> Self {
        Self {
            username: normalize_username(&username.into()),
            course: normalize_course(course),
        }
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.course)
    }
}

/// Usernames are compared after trimming surrounding whitespace.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Trim and title-case a course name; blank becomes [`DEFAULT_COURSE`].
///
/// Every letter that follows a non-letter is upper-cased and every other
/// letter lower-cased, so `"intro to BIOLOGY"` and `"Intro To Biology"` name
/// the same course.
pub fn normalize_course(course: &str) -> String {
    let trimmed = course.trim();
    if trimmed.is_empty() {
        return DEFAULT_COURSE.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut prev_is_letter = false;
    for c in trimmed.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Everything stored for one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub key: CourseKey,
    /// Flashcards in first-stored order, without duplicates.
    pub flashcards: Vec<Flashcard>,
    /// Quiz questions in first-stored order, without duplicates.
    pub quizzes: Vec<QuizQuestion>,
}

impl CourseRecord {
    pub fn empty(key: CourseKey) -> Self {
        Self {
            key,
            flashcards: Vec::new(),
            quizzes: Vec::new(),
        }
    }

    /// Number of stored artifacts of `kind`.
    pub fn count(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::Flashcards => self.flashcards.len(),
            ArtifactKind::Quiz => self.quizzes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flashcards.is_empty() && self.quizzes.is_empty()
    }
}

/// Persistent accumulation of artifacts per course.
///
/// Implementations must make [`accumulate`](ArtifactStore::accumulate) atomic
/// per key: two concurrent merges into the same course both land in full.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Merge `artifacts` into the record for `key`, creating it if needed.
    ///
    /// Returns how many artifacts were new. Artifacts already stored, and
    /// repeats within `artifacts`, are not counted or stored again.
    async fn accumulate(&self, key: &CourseKey, artifacts: &Artifacts)
        -> Result<usize, Doc2StudyError>;

    /// The record for `key`; empty if nothing was ever stored.
    async fn fetch(&self, key: &CourseKey) -> Result<CourseRecord, Doc2StudyError>;

    /// Every course name `username` has a record for.
    async fn list_courses(&self, username: &str) -> Result<BTreeSet<String>, Doc2StudyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_names_are_title_cased() {
        assert_eq!(normalize_course("intro to BIOLOGY"), "Intro To Biology");
        assert_eq!(normalize_course("  chemistry  "), "Chemistry");
        assert_eq!(normalize_course("o'neil 3d art"), "O'Neil 3D Art");
    }

    #[test]
    fn blank_course_is_general() {
        assert_eq!(normalize_course(""), "General");
        assert_eq!(normalize_course("   "), "General");
    }

    #[test]
    fn equivalent_names_share_a_key() {
        assert_eq!(
            CourseKey::new("ana", "world history"),
            CourseKey::new("ana", "World HISTORY ")
        );
        assert_ne!(CourseKey::new("ana", "math"), CourseKey::new("bo", "math"));
    }

    #[test]
    fn key_display() {
        assert_eq!(CourseKey::new("ana", "math").to_string(), "ana/Math");
    }

    #[test]
    fn empty_record_counts() {
        let record = CourseRecord::empty(CourseKey::new("ana", "math"));
        assert!(record.is_empty());
        assert_eq!(record.count(ArtifactKind::Quiz), 0);
    }
}
