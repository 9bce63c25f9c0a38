//! Completion client: credential resolution, the outbound call, and the
//! single retry without `temperature`.
//!
//! One invocation makes one outbound call, or two when the endpoint rejects
//! the temperature parameter. There is no backoff and no other retry.

use std::sync::Arc;

use tracing::{info, warn};

use crate::conversation::Turn;
use crate::credentials::{process_env, resolve_openai_auth, Credentials, OpenAiAuth};
use crate::providers::openai::OpenAiProvider;
use crate::providers::{CompletionRequest, LlmProvider, ProviderError};

/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f64 = 0.0;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f64 = 1.2;

/// Invalid generation parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// Temperature outside `[0.0, 1.2]` (or NaN).
    #[error("temperature {0} is outside [0.0, 1.2]")]
    TemperatureOutOfRange(f64),
    /// Blank model identifier.
    #[error("model identifier must not be empty")]
    EmptyModel,
}

/// Model and sampling settings supplied with each request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    model: String,
    temperature: f64,
}

impl GenerationParameters {
    /// Validate and build parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] for a blank model or out-of-range temperature.
    pub fn new(model: impl Into<String>, temperature: f64) -> Result<Self, ParameterError> {
        let model = model.into().trim().to_owned();
        if model.is_empty() {
            return Err(ParameterError::EmptyModel);
        }
        check_temperature(temperature)?;
        Ok(Self { model, temperature })
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sampling temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Switch model; unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::EmptyModel`] for a blank name.
    pub fn set_model(&mut self, model: &str) -> Result<(), ParameterError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(ParameterError::EmptyModel);
        }
        self.model = model.to_owned();
        Ok(())
    }

    /// Change temperature; unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::TemperatureOutOfRange`].
    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), ParameterError> {
        check_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }
}

fn check_temperature(temperature: f64) -> Result<(), ParameterError> {
    if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        Ok(())
    } else {
        Err(ParameterError::TemperatureOutOfRange(temperature))
    }
}

/// Why a completion produced no reply.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// No API key in the secret store or environment.
    #[error(
        "missing OPENAI_API_KEY: add it to the secret store (~/.aboutme/.env) or the environment"
    )]
    MissingCredential,
    /// The endpoint failed and the request is abandoned.
    #[error("completion failed{}: {source}", retry_note(.retried))]
    EndpointFailure {
        /// Last provider error.
        source: ProviderError,
        /// Whether the temperature-less retry was attempted.
        retried: bool,
    },
}

fn retry_note(retried: &bool) -> &'static str {
    if *retried {
        " (retry without temperature)"
    } else {
        ""
    }
}

impl CompletionError {
    /// Whether the whole interactive session must stop, not just this request.
    pub fn halts_session(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

type EnvResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
enum Backend {
    OpenAi { base_url: String },
    Fixed(Arc<dyn LlmProvider>),
}

/// Sends turn sequences to the completion endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    credentials: Credentials,
    env: EnvResolver,
    backend: Backend,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::OpenAi { base_url } => base_url.as_str(),
            Backend::Fixed(provider) => provider.name(),
        };
        f.debug_struct("CompletionClient")
            .field("credentials", &self.credentials)
            .field("backend", &backend)
            .finish()
    }
}

impl CompletionClient {
    /// Client for an OpenAI-compatible endpoint at `base_url`.
    pub fn openai(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            credentials,
            env: Arc::new(process_env),
            backend: Backend::OpenAi {
                base_url: base_url.into(),
            },
        }
    }

    /// Client routed to a fixed provider. The API key is still required.
    pub fn with_provider(credentials: Credentials, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            credentials,
            env: Arc::new(process_env),
            backend: Backend::Fixed(provider),
        }
    }

    /// Replace the environment resolver (for testing).
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    fn provider_for(&self, auth: OpenAiAuth) -> Arc<dyn LlmProvider> {
        match &self.backend {
            Backend::OpenAi { base_url } => Arc::new(OpenAiProvider::with_base_url(base_url, auth)),
            Backend::Fixed(provider) => Arc::clone(provider),
        }
    }

    /// Request a reply for `turns`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::MissingCredential`] before any network call
    /// when no key is configured, or [`CompletionError::EndpointFailure`]
    /// when the endpoint fails (after at most one temperature-less retry).
    pub async fn complete(
        &self,
        turns: &[Turn],
        params: &GenerationParameters,
    ) -> Result<String, CompletionError> {
        let auth = resolve_openai_auth(&self.credentials, |key| (self.env)(key))
            .ok_or(CompletionError::MissingCredential)?;
        let provider = self.provider_for(auth);

        let request = CompletionRequest {
            model: params.model().to_owned(),
            messages: turns.to_vec(),
            temperature: Some(params.temperature()),
        };

        let first = provider.complete(request.clone()).await;
        let response = match first {
            Ok(response) => response,
            Err(e) if e.mentions_temperature() => {
                warn!(
                    provider = provider.name(),
                    model = %request.model,
                    error = %e,
                    "endpoint rejected temperature, retrying without it"
                );
                let retry = CompletionRequest {
                    temperature: None,
                    ..request
                };
                provider
                    .complete(retry)
                    .await
                    .map_err(|source| CompletionError::EndpointFailure {
                        source,
                        retried: true,
                    })?
            }
            Err(source) => {
                return Err(CompletionError::EndpointFailure {
                    source,
                    retried: false,
                })
            }
        };

        info!(
            provider = provider.name(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );
        Ok(response.text)
    }
}
