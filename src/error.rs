//! Error types for the doc2study library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2StudyError`] (**fatal**): the request cannot produce artifacts
//!   (unsupported upload, bad page selection, every generation attempt used
//!   up, store unreachable). Returned as `Err(Doc2StudyError)` from the
//!   pipeline entry points.
//!
//! * [`AttemptError`] (**non-fatal**): a single generation attempt failed
//!   (model call error, no JSON array in the reply, schema violation). The
//!   generator retries these locally and only escalates to
//!   [`Doc2StudyError::GenerationExhausted`] once the attempt budget is gone.
//!
//! Extraction and selection errors are deterministic for a fixed input and
//! are never retried.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2study library.
#[derive(Debug, Error)]
pub enum Doc2StudyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The upload is not one of the supported container formats.
    #[error("Unsupported document format '{format}' (expected pdf, pptx or docx)")]
    UnsupportedFormat { format: String },

    /// The document was recognised but its contents could not be read.
    #[error("Failed to extract text from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    // ── Selection errors ──────────────────────────────────────────────────
    /// A selected page index is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    InvalidPageSelection { page: usize, total: usize },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every attempt failed; nothing was generated and nothing was stored.
    #[error("Generation failed after {attempts} attempts.\nLast error: {last_error}")]
    GenerationExhausted {
        attempts: u32,
        last_error: AttemptError,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The artifact store could not be reached or rejected the operation.
    #[error("Artifact store unavailable: {detail}")]
    StorageUnavailable { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2StudyError {
    /// `true` for errors caused by what the caller sent rather than by the
    /// model or the infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Doc2StudyError::FileNotFound { .. }
                | Doc2StudyError::UnsupportedFormat { .. }
                | Doc2StudyError::ExtractionFailed { .. }
                | Doc2StudyError::InvalidPageSelection { .. }
        )
    }
}

impl From<sqlx::Error> for Doc2StudyError {
    fn from(e: sqlx::Error) -> Self {
        Doc2StudyError::StorageUnavailable {
            detail: e.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Doc2StudyError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Doc2StudyError::StorageUnavailable {
            detail: format!("migration failed: {e}"),
        }
    }
}

/// A non-fatal error for a single generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AttemptError {
    /// The model call itself failed (network, quota, provider error).
    #[error("attempt {attempt}: model call failed: {detail}")]
    ModelCallFailed { attempt: u32, detail: String },

    /// The model call did not return within the configured timeout.
    #[error("attempt {attempt}: model call timed out after {secs}s")]
    Timeout { attempt: u32, secs: u64 },

    /// The reply had no JSON array, did not parse, or broke the schema.
    #[error("attempt {attempt}: malformed model output: {detail}")]
    MalformedModelOutput { attempt: u32, detail: String },
}

impl AttemptError {
    /// The 1-based attempt this error belongs to.
    pub fn attempt(&self) -> u32 {
        match self {
            AttemptError::ModelCallFailed { attempt, .. }
            | AttemptError::Timeout { attempt, .. }
            | AttemptError::MalformedModelOutput { attempt, .. } => *attempt,
        }
    }
}

/// Error returned by a [`crate::pipeline::llm::CompletionModel`].
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct ModelError {
    pub detail: String,
}

impl ModelError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_page_selection_display() {
        let e = Doc2StudyError::InvalidPageSelection { page: 7, total: 3 };
        let msg = e.to_string();
        assert!(msg.contains("Page 7"), "got: {msg}");
        assert!(msg.contains("3 pages"), "got: {msg}");
    }

    #[test]
    fn exhausted_display_carries_last_error() {
        let e = Doc2StudyError::GenerationExhausted {
            attempts: 3,
            last_error: AttemptError::MalformedModelOutput {
                attempt: 3,
                detail: "no JSON array found".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("no JSON array found"));
    }

    #[test]
    fn storage_error_is_not_a_client_error() {
        let e = Doc2StudyError::StorageUnavailable {
            detail: "locked".into(),
        };
        assert!(!e.is_client_error());
        assert!(Doc2StudyError::UnsupportedFormat {
            format: "txt".into()
        }
        .is_client_error());
    }

    #[test]
    fn attempt_number_is_exposed() {
        let e = AttemptError::Timeout { attempt: 2, secs: 60 };
        assert_eq!(e.attempt(), 2);
        assert!(e.to_string().contains("60s"));
    }
}
