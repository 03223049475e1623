//! Model interaction: prompt the model and retry until the reply is usable.
//!
//! The generator is an explicit state machine, one pass per attempt:
//!
//! ```text
//! Requesting ──▶ Parsing ──▶ Validating ──▶ Succeeded
//!     ▲             │            │
//!     │             ▼            ▼
//!     └──(backoff)── Failed(attempt) ──▶ exhausted
//! ```
//!
//! Transport errors, timeouts and malformed replies all consume an attempt.
//! The backoff is a fixed `retry_backoff_ms` pause and only happens when
//! another attempt follows; the last failure returns immediately.

use crate::config::GenerationConfig;
use crate::error::{AttemptError, Doc2StudyError, ModelError};
use crate::output::{ArtifactKind, Artifacts, GenerationOutput};
use crate::pipeline::parse;
use crate::prompts::{generation_prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Default model used when a provider is chosen without naming a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A text-in, text-out generative model.
///
/// Implemented by [`ProviderModel`] for real providers and by stubs in tests.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// [`CompletionModel`] over an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, Doc2StudyError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl CompletionModel for ProviderModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ModelError::new(e.to_string()))?;
        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

fn build_options(config: &GenerationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Doc2StudyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Doc2StudyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Named provider** (`config.provider_name`) with `config.model`, or
///    [`DEFAULT_MODEL`].
/// 2. **Environment pair**: `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
///    honoured only when both are set.
/// 3. **OpenAI key**: `OPENAI_API_KEY` selects OpenAI even when other keys
///    are present.
/// 4. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, Doc2StudyError> {
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Doc2StudyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Generator state machine ──────────────────────────────────────────────────

enum State {
    Requesting { attempt: u32 },
    Parsing { attempt: u32, response: String },
    Validating { attempt: u32, items: Vec<Value> },
    Succeeded { attempt: u32, artifacts: Artifacts },
    Failed { error: AttemptError },
}

/// Generate `count` artifacts of `kind` from `text`.
///
/// Returns every artifact of the first reply that passes validation; the
/// model may return more or fewer than `count`.
///
/// # Errors
/// [`Doc2StudyError::GenerationExhausted`] once `config.max_attempts`
/// attempts have failed, carrying the last attempt's error.
pub async fn generate(
    model: &dyn CompletionModel,
    text: &str,
    count: usize,
    kind: ArtifactKind,
    config: &GenerationConfig,
) -> Result<GenerationOutput, Doc2StudyError> {
    if count == 0 {
        return Err(Doc2StudyError::InvalidConfig(
            "artifact count must be at least 1".into(),
        ));
    }

    let start = Instant::now();
    let max_attempts = config.max_attempts;
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let prompt = generation_prompt(kind, text, count);
    let cb = config.progress_callback.as_ref();

    info!(
        "Generating {} {} from {} chars of text",
        count,
        kind,
        text.len()
    );
    if let Some(cb) = cb {
        cb.on_generation_start(kind, count);
    }

    let mut state = State::Requesting { attempt: 1 };
    loop {
        state = match state {
            State::Requesting { attempt } => {
                if let Some(cb) = cb {
                    cb.on_attempt_start(attempt, max_attempts);
                }
                match timeout(call_timeout, model.complete(&prompt)).await {
                    Ok(Ok(response)) => State::Parsing { attempt, response },
                    Ok(Err(e)) => State::Failed {
                        error: AttemptError::ModelCallFailed {
                            attempt,
                            detail: e.detail,
                        },
                    },
                    Err(_) => State::Failed {
                        error: AttemptError::Timeout {
                            attempt,
                            secs: config.api_timeout_secs,
                        },
                    },
                }
            }

            State::Parsing { attempt, response } => {
                match parse::extract_json_array(&response, attempt) {
                    Ok(items) => State::Validating { attempt, items },
                    Err(error) => State::Failed { error },
                }
            }

            State::Validating { attempt, items } => {
                match parse::validate(kind, items, config.enforce_quiz_answers, attempt) {
                    Ok(artifacts) => State::Succeeded { attempt, artifacts },
                    Err(error) => State::Failed { error },
                }
            }

            State::Succeeded { attempt, artifacts } => {
                if artifacts.len() != count {
                    debug!(
                        "Requested {} {} but the model returned {}",
                        count,
                        kind,
                        artifacts.len()
                    );
                }
                if let Some(cb) = cb {
                    cb.on_generation_complete(artifacts.len(), attempt);
                }
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Generated {} {} in {} attempt(s), {}ms",
                    artifacts.len(),
                    kind,
                    attempt,
                    duration_ms
                );
                return Ok(GenerationOutput {
                    artifacts,
                    attempts: attempt,
                    duration_ms,
                });
            }

            State::Failed { error } => {
                let attempt = error.attempt();
                warn!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                if let Some(cb) = cb {
                    cb.on_attempt_failed(&error, max_attempts);
                }
                if attempt >= max_attempts {
                    return Err(Doc2StudyError::GenerationExhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                if let Some(cb) = cb {
                    cb.on_retry_scheduled(attempt + 1, config.retry_backoff_ms);
                }
                sleep(Duration::from_millis(config.retry_backoff_ms)).await;
                State::Requesting {
                    attempt: attempt + 1,
                }
            }
        };
    }
}
