//! # doc2study
//!
//! Turn course material (PDF, DOCX, PPTX) into flashcards and multiple-choice
//! quizzes with an LLM, and keep them per user and course.
//!
//! ## Why pages?
//!
//! Lecture decks and handouts are long, and a student usually wants to study
//! one part of them. The document is split into line-bounded pages so the
//! student can pick exactly which text the model sees.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Stage     private temp dir, removed on drop
//!  ├─ 2. Extract   PDF pages / DOCX paragraphs / PPTX slides (spawn_blocking)
//!  ├─ 3. Paginate  ≤ 25 lines per page
//!  ├─ 4. Select    caller-ordered pages → one text
//!  ├─ 5. Generate  prompt → JSON → validate → clean, with bounded retry
//!  └─ 6. Store     set-union merge into the (user, course) record
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2study::{
//!     CourseKey, FileDocumentReader, GenerationConfig, GenerationRequest, ProviderModel,
//!     SqliteStore, StudyPipeline,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let pipeline = StudyPipeline::new(
//!         Arc::new(FileDocumentReader),
//!         Arc::new(ProviderModel::from_config(&config)?),
//!         Arc::new(SqliteStore::connect("sqlite://doc2study.db").await?),
//!         config,
//!     );
//!
//!     let upload = pipeline.open("lecture.pptx")?;
//!     let request = GenerationRequest::new(CourseKey::new("ana", "biology"));
//!     let report = pipeline.generate(&upload, &request).await?;
//!     println!("{} new flashcards", report.added);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2study` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! doc2study = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod store;
pub mod study;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, PageSelection};
pub use error::{AttemptError, Doc2StudyError, ModelError};
pub use output::{
    ArtifactKind, Artifacts, Flashcard, GenerationOutput, GenerationReport, QuizQuestion,
};
pub use pipeline::extract::{DocumentFormat, DocumentReader, ExtractedBlock, FileDocumentReader};
pub use pipeline::input::StagedUpload;
pub use pipeline::llm::{generate, CompletionModel, ProviderModel};
pub use pipeline::paginate::{paginate, Page};
pub use pipeline::parse::clean_text;
pub use pipeline::select::resolve;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{ArtifactStore, CourseKey, CourseRecord, MemoryStore, SqliteStore};
pub use study::{GenerationRequest, StudyPipeline};
