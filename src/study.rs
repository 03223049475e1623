//! The end-to-end study pipeline.
//!
//! [`StudyPipeline`] wires the stages together around three collaborators:
//! a [`DocumentReader`], a [`CompletionModel`] and an [`ArtifactStore`]. Each
//! is held behind an `Arc<dyn ..>` so the binary can plug in pdfium, a real
//! provider and SQLite while tests use fixtures, stubs and [`MemoryStore`].
//!
//! [`MemoryStore`]: crate::store::MemoryStore

use crate::config::{GenerationConfig, PageSelection};
use crate::error::Doc2StudyError;
use crate::output::{ArtifactKind, GenerationReport};
use crate::pipeline::extract::DocumentReader;
use crate::pipeline::input::{self, StagedUpload};
use crate::pipeline::llm::{self, CompletionModel};
use crate::pipeline::paginate::{paginate, Page};
use crate::pipeline::select;
use crate::store::{ArtifactStore, CourseKey, CourseRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default number of artifacts requested per run.
pub const DEFAULT_COUNT: usize = 8;

/// What to generate, from which pages, and where to keep it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub pages: PageSelection,
    /// Target number of artifacts (at least 1).
    pub count: usize,
    pub kind: ArtifactKind,
    pub key: CourseKey,
}

impl GenerationRequest {
    /// Flashcards from every page, [`DEFAULT_COUNT`] of them.
    pub fn new(key: CourseKey) -> Self {
        Self {
            pages: PageSelection::All,
            count: DEFAULT_COUNT,
            kind: ArtifactKind::default(),
            key,
        }
    }

    pub fn pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Document-to-artifact pipeline bound to its collaborators.
#[derive(Clone)]
pub struct StudyPipeline {
    reader: Arc<dyn DocumentReader>,
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn ArtifactStore>,
    config: GenerationConfig,
}

impl StudyPipeline {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        model: Arc<dyn CompletionModel>,
        store: Arc<dyn ArtifactStore>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            reader,
            model,
            store,
            config,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Stage uploaded bytes in a private temp directory.
    pub async fn stage(&self, bytes: &[u8], filename: &str) -> Result<StagedUpload, Doc2StudyError> {
        input::stage_bytes(bytes, filename).await
    }

    /// Use a local file in place.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<StagedUpload, Doc2StudyError> {
        input::stage_path(path)
    }

    /// Read and paginate a document, for page selection.
    pub async fn pages(&self, upload: &StagedUpload) -> Result<Vec<Page>, Doc2StudyError> {
        let blocks = self.reader.read(upload.path(), upload.format()).await?;
        let pages = paginate(blocks, self.config.lines_per_page);
        debug!(
            "{} paginated into {} pages of at most {} lines",
            upload.path().display(),
            pages.len(),
            self.config.lines_per_page
        );
        Ok(pages)
    }

    /// Read, select, generate and merge into the course record.
    ///
    /// # Errors
    /// Extraction and selection errors come back before the model is called.
    /// [`Doc2StudyError::GenerationExhausted`] leaves the store untouched.
    pub async fn generate(
        &self,
        upload: &StagedUpload,
        request: &GenerationRequest,
    ) -> Result<GenerationReport, Doc2StudyError> {
        let start = Instant::now();
        info!(
            "Generating {} for {} from {} ({})",
            request.kind,
            request.key,
            upload.path().display(),
            upload.format()
        );

        let pages = self.pages(upload).await?;
        let numbers = request.pages.to_page_numbers(pages.len())?;
        let text = select::concat_pages(&pages, &numbers);
        debug!("Selected pages {:?}: {} chars", numbers, text.len());

        let output = llm::generate(
            self.model.as_ref(),
            &text,
            request.count,
            request.kind,
            &self.config,
        )
        .await?;

        let added = self.store.accumulate(&request.key, &output.artifacts).await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: {} {} generated, {} new, {}ms",
            request.key,
            output.artifacts.len(),
            request.kind,
            added,
            duration_ms
        );

        Ok(GenerationReport {
            key: request.key.clone(),
            artifacts: output.artifacts,
            added,
            attempts: output.attempts,
            pages: numbers,
            total_pages: pages.len(),
            duration_ms,
        })
    }

    /// Stage `bytes`, run [`generate`](Self::generate), then drop the staged
    /// copy before returning.
    pub async fn generate_from_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationReport, Doc2StudyError> {
        let upload = self.stage(bytes, filename).await?;
        self.generate(&upload, request).await
    }

    pub async fn course(&self, key: &CourseKey) -> Result<CourseRecord, Doc2StudyError> {
        self.store.fetch(key).await
    }

    pub async fn courses(&self, username: &str) -> Result<BTreeSet<String>, Doc2StudyError> {
        self.store.list_courses(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = GenerationRequest::new(CourseKey::new("ana", ""));
        assert_eq!(req.pages, PageSelection::All);
        assert_eq!(req.count, 8);
        assert_eq!(req.kind, ArtifactKind::Flashcards);
        assert_eq!(req.key.course, "General");
    }

    #[test]
    fn request_builder_overrides() {
        let req = GenerationRequest::new(CourseKey::new("ana", "math"))
            .pages(PageSelection::List(vec![3, 1]))
            .count(5)
            .kind(ArtifactKind::Quiz);
        assert_eq!(req.pages, PageSelection::List(vec![3, 1]));
        assert_eq!(req.count, 5);
        assert_eq!(req.kind, ArtifactKind::Quiz);
    }
}
