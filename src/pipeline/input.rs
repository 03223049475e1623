//! Input staging: give every request its own copy of the document on disk.
//!
//! pdfium and the zip readers need a file-system path. Uploaded bytes are
//! written into a fresh `TempDir` whose name is unique per request, so two
//! concurrent uploads never share a file. The directory is removed when the
//! [`StagedUpload`] is dropped, whether generation succeeded, failed or
//! panicked.

use crate::error::Doc2StudyError;
use crate::pipeline::extract::DocumentFormat;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Prefix of every per-request staging directory.
pub const STAGING_PREFIX: &str = "doc2study-";

/// A document ready for extraction.
#[derive(Debug)]
pub enum StagedUpload {
    /// A caller-owned file used in place; never deleted.
    Local { path: PathBuf, format: DocumentFormat },
    /// Uploaded bytes written to a private temp directory.
    /// The `TempDir` is kept alive until the upload is dropped.
    Staged {
        path: PathBuf,
        format: DocumentFormat,
        _temp_dir: TempDir,
    },
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        match self {
            StagedUpload::Local { path, .. } | StagedUpload::Staged { path, .. } => path,
        }
    }

    pub fn format(&self) -> DocumentFormat {
        match self {
            StagedUpload::Local { format, .. } | StagedUpload::Staged { format, .. } => *format,
        }
    }
}

/// Stage uploaded `bytes` named `filename`.
///
/// The format comes from the filename's extension; only the extension is
/// reused for the staged file, so a filename can never escape the directory.
///
/// # Errors
/// [`Doc2StudyError::UnsupportedFormat`] before anything is written.
pub async fn stage_bytes(bytes: &[u8], filename: &str) -> Result<StagedUpload, Doc2StudyError> {
    let format = DocumentFormat::from_path(filename)?;

    let temp_dir = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir()
        .map_err(|e| Doc2StudyError::Internal(format!("Failed to create staging dir: {}", e)))?;
    let path = temp_dir.path().join(format!("upload.{}", format.extension()));

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Doc2StudyError::Internal(format!("Failed to write staged upload: {}", e)))?;

    debug!("Staged {} bytes of {} at {}", bytes.len(), format, path.display());
    Ok(StagedUpload::Staged {
        path,
        format,
        _temp_dir: temp_dir,
    })
}

/// Use an existing local file without copying it.
pub fn stage_path(path: impl AsRef<Path>) -> Result<StagedUpload, Doc2StudyError> {
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        return Err(Doc2StudyError::FileNotFound { path });
    }
    let format = DocumentFormat::from_path(&path)?;
    debug!("Using local {}: {}", format, path.display());
    Ok(StagedUpload::Local { path, format })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_file_lives_in_prefixed_dir() {
        let upload = stage_bytes(b"PK", "Lecture 3.DOCX").await.unwrap();
        assert_eq!(upload.format(), DocumentFormat::Docx);
        assert!(upload.path().exists());
        assert_eq!(upload.path().file_name().unwrap(), "upload.docx");

        let dir_name = upload
            .path()
            .parent()
            .and_then(|d| d.file_name())
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        assert!(dir_name.starts_with(STAGING_PREFIX), "got: {dir_name}");
    }

    #[tokio::test]
    async fn drop_removes_staging_dir() {
        let upload = stage_bytes(b"%PDF-1.7", "notes.pdf").await.unwrap();
        let dir = upload.path().parent().unwrap().to_path_buf();
        assert!(dir.exists());
        drop(upload);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn concurrent_uploads_do_not_collide() {
        let a = stage_bytes(b"a", "same.pdf").await.unwrap();
        let b = stage_bytes(b"b", "same.pdf").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"a");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let err = stage_bytes(b"hello", "notes.txt").await.unwrap_err();
        assert!(matches!(err, Doc2StudyError::UnsupportedFormat { .. }));
    }

    #[test]
    fn traversal_in_filename_stays_inside_dir() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let upload = rt
            .block_on(stage_bytes(b"x", "../../etc/evil.pptx"))
            .unwrap();
        assert_eq!(upload.path().file_name().unwrap(), "upload.pptx");
    }

    #[test]
    fn local_path_is_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, b"PK").unwrap();

        let upload = stage_path(&path).unwrap();
        assert_eq!(upload.path(), path.as_path());
        drop(upload);
        assert!(path.exists());
    }

    #[test]
    fn missing_local_path() {
        let err = stage_path("/nonexistent/deck.pptx").unwrap_err();
        assert!(matches!(err, Doc2StudyError::FileNotFound { .. }));
    }
}
