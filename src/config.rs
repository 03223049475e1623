//! Configuration types for document-to-study-artifact generation.
//!
//! All pipeline behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across requests and to log exactly which
//! settings produced a given set of artifacts.

use crate::error::Doc2StudyError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for the study pipeline.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2study::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .lines_per_page(30)
///     .max_attempts(5)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Maximum number of text lines grouped into one selectable page. Default: 25.
    ///
    /// A single block longer than this still gets a page of its own.
    pub lines_per_page: usize,

    /// LLM model identifier, e.g. "gpt-4.1-mini", "gemini-2.0-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Sampling temperature for the completion. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per attempt. Default: 4096.
    pub max_tokens: usize,

    /// Total generation attempts, including the first. Default: 3.
    ///
    /// Both transport failures and malformed replies consume an attempt.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds. Default: 1000.
    ///
    /// Applied after a failed attempt only when another attempt follows.
    pub retry_backoff_ms: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Reject quiz questions whose answer is not one of their options. Default: false.
    ///
    /// When false such questions are kept and a warning is logged.
    pub enforce_quiz_answers: bool,

    /// Optional progress callback for generation events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            lines_per_page: 25,
            model: None,
            provider_name: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            api_timeout_secs: 60,
            enforce_quiz_answers: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("lines_per_page", &self.lines_per_page)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("enforce_quiz_answers", &self.enforce_quiz_answers)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn lines_per_page(mut self, n: usize) -> Self {
        self.config.lines_per_page = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn enforce_quiz_answers(mut self, v: bool) -> Self {
        self.config.enforce_quiz_answers = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Doc2StudyError> {
        let c = &self.config;
        if c.lines_per_page == 0 {
            return Err(Doc2StudyError::InvalidConfig(
                "lines_per_page must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(Doc2StudyError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Doc2StudyError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of a paginated document feed the generator.
///
/// Unlike a print selection, order matters: the text of each selected page is
/// concatenated in the order the caller listed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page, in document order (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive, ascending).
    Range(usize, usize),
    /// Specific pages in caller order (1-indexed; repeats are ignored).
    List(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into 1-based page numbers, in caller order.
    ///
    /// Fails on the first index outside `1..=total_pages`, and when the
    /// selection picks nothing at all.
    pub fn to_page_numbers(&self, total_pages: usize) -> Result<Vec<usize>, Doc2StudyError> {
        let requested: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => vec![*p],
            PageSelection::Range(start, end) => {
                let out_of_range = |page| Doc2StudyError::InvalidPageSelection {
                    page,
                    total: total_pages,
                };
                if *start == 0 {
                    return Err(out_of_range(0));
                }
                if *end > total_pages {
                    return Err(out_of_range(*end));
                }
                // Descending range selects nothing.
                if start > end {
                    return Err(out_of_range(0));
                }
                (*start..=*end).collect()
            }
            PageSelection::List(pages) => {
                let mut seen = Vec::with_capacity(pages.len());
                for &p in pages {
                    if !seen.contains(&p) {
                        seen.push(p);
                    }
                }
                seen
            }
        };

        if let Some(&bad) = requested.iter().find(|&&p| p == 0 || p > total_pages) {
            return Err(Doc2StudyError::InvalidPageSelection {
                page: bad,
                total: total_pages,
            });
        }
        if requested.is_empty() {
            return Err(Doc2StudyError::InvalidPageSelection {
                page: 0,
                total: total_pages,
            });
        }
        Ok(requested)
    }
}

impl std::str::FromStr for PageSelection {
    type Err = Doc2StudyError;

    /// Parse `all`, `5`, `3-7` or `2,1,4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let number = |p: &str| {
            p.trim().parse::<usize>().map_err(|_| {
                Doc2StudyError::InvalidConfig(format!("Invalid page number: '{}'", p.trim()))
            })
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }
        if s.contains(',') {
            let pages = s.split(',').map(number).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::List(pages));
        }
        if let Some((start, end)) = s.split_once('-') {
            return Ok(PageSelection::Range(number(start)?, number(end)?));
        }
        Ok(PageSelection::Single(number(&s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = GenerationConfig::default();
        assert_eq!(c.lines_per_page, 25);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_backoff_ms, 1000);
        assert!(!c.enforce_quiz_answers);
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let err = GenerationConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(matches!(err, Doc2StudyError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_lines_per_page() {
        assert!(GenerationConfig::builder().lines_per_page(0).build().is_err());
    }

    #[test]
    fn list_selection_keeps_caller_order() {
        let pages = PageSelection::List(vec![2, 1]).to_page_numbers(2).unwrap();
        assert_eq!(pages, vec![2, 1]);
    }

    #[test]
    fn list_selection_drops_repeats() {
        let pages = PageSelection::List(vec![3, 1, 3]).to_page_numbers(3).unwrap();
        assert_eq!(pages, vec![3, 1]);
    }

    #[test]
    fn zero_and_overflow_are_rejected() {
        assert!(matches!(
            PageSelection::Single(0).to_page_numbers(4),
            Err(Doc2StudyError::InvalidPageSelection { page: 0, total: 4 })
        ));
        assert!(matches!(
            PageSelection::List(vec![1, 5]).to_page_numbers(4),
            Err(Doc2StudyError::InvalidPageSelection { page: 5, total: 4 })
        ));
        assert!(PageSelection::Range(3, 9).to_page_numbers(4).is_err());
    }

    #[test]
    fn huge_range_end_is_rejected_without_expanding() {
        assert!(matches!(
            PageSelection::Range(1, 3_000_000_000).to_page_numbers(3),
            Err(Doc2StudyError::InvalidPageSelection { page: 3_000_000_000, total: 3 })
        ));
        let parsed: PageSelection = "1-18446744073709551615".parse().unwrap();
        assert!(matches!(
            parsed.to_page_numbers(3),
            Err(Doc2StudyError::InvalidPageSelection { total: 3, .. })
        ));
    }

    #[test]
    fn range_bounds_report_the_offending_page() {
        assert!(matches!(
            PageSelection::Range(0, 2).to_page_numbers(5),
            Err(Doc2StudyError::InvalidPageSelection { page: 0, total: 5 })
        ));
        assert!(matches!(
            PageSelection::Range(3, 1).to_page_numbers(5),
            Err(Doc2StudyError::InvalidPageSelection { page: 0, total: 5 })
        ));
        assert_eq!(PageSelection::Range(2, 4).to_page_numbers(5).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn all_on_empty_document_is_rejected() {
        assert!(PageSelection::All.to_page_numbers(0).is_err());
    }

    #[test]
    fn parse_selection_strings() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("4".parse::<PageSelection>().unwrap(), PageSelection::Single(4));
        assert_eq!(
            "2-5".parse::<PageSelection>().unwrap(),
            PageSelection::Range(2, 5)
        );
        assert_eq!(
            " 3, 1 ,2".parse::<PageSelection>().unwrap(),
            PageSelection::List(vec![3, 1, 2])
        );
        assert!("x".parse::<PageSelection>().is_err());
    }
}
