//! LLM provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the shared request/response types.
//! The only wire implementation is [`openai::OpenAiProvider`], which speaks
//! the OpenAI `/chat/completions` format (also served by many compatible
//! gateways).

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;

pub mod openai;

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A request to an LLM provider for a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier understood by the endpoint.
    pub model: String,
    /// Full turn sequence, system turn first.
    pub messages: Vec<Turn>,
    /// Sampling temperature. `None` leaves it to the endpoint default.
    pub temperature: Option<f64>,
}

/// Usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens used in the prompt/input.
    pub input_tokens: u32,
    /// Tokens generated in the response.
    pub output_tokens: u32,
}

/// The response from an LLM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Text of the first candidate.
    pub text: String,
    /// Token usage, zero when the endpoint does not report it.
    pub usage: UsageStats,
    /// The model identifier that served this response.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitised response body.
        body: String,
        /// Whether the full, unsanitised body mentioned `temperature`.
        mentions_temperature: bool,
    },
    /// Provider cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Build a [`ProviderError::HttpStatus`] from a raw error body.
    ///
    /// The `temperature` check runs on the raw body, before sanitising
    /// truncates it.
    pub fn http_status(status: u16, raw_body: &str) -> Self {
        Self::HttpStatus {
            status,
            body: sanitize_http_error_body(raw_body),
            mentions_temperature: contains_temperature(raw_body),
        }
    }

    /// Whether the failure text blames the `temperature` parameter.
    pub fn mentions_temperature(&self) -> bool {
        match self {
            Self::HttpStatus {
                mentions_temperature,
                ..
            } => *mentions_temperature,
            other => contains_temperature(&other.to_string()),
        }
    }
}

fn contains_temperature(text: &str) -> bool {
    text.to_ascii_lowercase().contains("temperature")
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::http_status(status.as_u16(), &body));
    }
    Ok(body)
}

/// Collapse whitespace, redact token-like strings and cap the length of an
/// upstream error body before it is shown or logged.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-proj-[A-Za-z0-9_\-]{10,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"Bearer [A-Za-z0-9_\-\.]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 512;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core LLM provider interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion from the LLM.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}
