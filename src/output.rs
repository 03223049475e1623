//! Study artifacts and per-run results.
//!
//! [`Flashcard`] and [`QuizQuestion`] are the wire contract with callers: they
//! serialise to exactly `{"front","back"}` and `{"question","options","answer"}`.
//! [`Artifacts`] tags a batch with its kind so the store knows which field of a
//! course record it merges into.

use crate::store::CourseKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A two-sided flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// A four-option multiple-choice question.
///
/// `answer` is expected to be one of `options`, but this is not a type-level
/// guarantee; see [`QuizQuestion::answer_is_listed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizQuestion {
    /// Number of options every question must carry.
    pub const OPTION_COUNT: usize = 4;

    pub fn new(
        question: impl Into<String>,
        options: [&str; Self::OPTION_COUNT],
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: answer.into(),
        }
    }

    /// Whether `answer` matches one of the options exactly.
    pub fn answer_is_listed(&self) -> bool {
        self.options.iter().any(|o| o == &self.answer)
    }
}

/// Which kind of artifact to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A set of [`Flashcard`]s (default).
    #[default]
    Flashcards,
    /// A set of [`QuizQuestion`]s.
    Quiz,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Flashcards => f.write_str("flashcards"),
            ArtifactKind::Quiz => f.write_str("quiz"),
        }
    }
}

/// A batch of generated artifacts of a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum Artifacts {
    Flashcards(Vec<Flashcard>),
    Quiz(Vec<QuizQuestion>),
}

impl Artifacts {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifacts::Flashcards(_) => ArtifactKind::Flashcards,
            Artifacts::Quiz(_) => ArtifactKind::Quiz,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Artifacts::Flashcards(cards) => cards.len(),
            Artifacts::Quiz(questions) => questions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a successful [`crate::pipeline::llm::generate`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Validated, cleaned artifacts.
    pub artifacts: Artifacts,
    /// 1-based number of the attempt that succeeded.
    pub attempts: u32,
    /// Wall-clock time across all attempts, including backoff.
    pub duration_ms: u64,
}

/// Result of a full pipeline run: generation plus accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// The (user, course) record the artifacts were merged into.
    pub key: CourseKey,
    /// Artifacts produced by this run (including ones already stored).
    pub artifacts: Artifacts,
    /// How many of `artifacts` were new to the course record.
    pub added: usize,
    /// Generation attempts used.
    pub attempts: u32,
    /// 1-based pages the text was taken from, in request order.
    pub pages: Vec<usize>,
    /// Total pages the document was split into.
    pub total_pages: usize,
    /// End-to-end duration in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashcard_wire_shape() {
        let card = Flashcard::new("Capital of France?", "Paris");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"front": "Capital of France?", "back": "Paris"})
        );
    }

    #[test]
    fn quiz_wire_shape() {
        let q = QuizQuestion::new("2 + 2?", ["3", "4", "5", "22"], "4");
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["options"].as_array().unwrap().len(), 4);
        assert_eq!(json["answer"], "4");
        assert!(q.answer_is_listed());
    }

    #[test]
    fn unlisted_answer_detected() {
        let q = QuizQuestion::new("Colour of the sky?", ["red", "green", "yellow", "pink"], "blue");
        assert!(!q.answer_is_listed());
    }

    #[test]
    fn artifacts_report_kind() {
        let a = Artifacts::Quiz(vec![]);
        assert_eq!(a.kind(), ArtifactKind::Quiz);
        assert!(a.is_empty());
    }
}
