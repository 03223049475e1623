//! Progress-callback trait for generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to observe
//! the retry loop as it runs: which attempt is in flight, why an attempt
//! failed, and when a backoff pause starts.
//!
//! # Example
//!
//! ```rust
//! use doc2study::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct RetryCounter {
//!     retries: AtomicU32,
//! }
//!
//! impl GenerationProgressCallback for RetryCounter {
//!     fn on_retry_scheduled(&self, next_attempt: u32, delay_ms: u64) {
//!         self.retries.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("retrying (attempt {next_attempt}) in {delay_ms}ms");
//!     }
//! }
//!
//! let counter = Arc::new(RetryCounter { retries: AtomicU32::new(0) });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::AttemptError;
use crate::output::ArtifactKind;
use std::sync::Arc;

/// Called by the generator as it works through its attempts.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: several
/// requests may share one config across tasks.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before the first model call.
    fn on_generation_start(&self, kind: ArtifactKind, count: usize) {
        let _ = (kind, count);
    }

    /// Called just before each model call.
    ///
    /// # Arguments
    /// * `attempt`     : 1-based attempt number
    /// * `max_attempts`: configured attempt budget
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        let _ = (attempt, max_attempts);
    }

    /// Called when an attempt fails, before any backoff.
    fn on_attempt_failed(&self, error: &AttemptError, max_attempts: u32) {
        let _ = (error, max_attempts);
    }

    /// Called when a backoff pause starts; `next_attempt` follows it.
    fn on_retry_scheduled(&self, next_attempt: u32, delay_ms: u64) {
        let _ = (next_attempt, delay_ms);
    }

    /// Called once when an attempt produced valid artifacts.
    fn on_generation_complete(&self, artifact_count: usize, attempts: u32) {
        let _ = (artifact_count, attempts);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
