//! Chat session: the session-scoped context every interaction runs against.
//!
//! Each user action becomes one [`ChatSession::interact`] call:
//! optional clear, render (reload documents, recompile, refresh slot 0),
//! input selection, and at most one completion. Interactions are strictly
//! sequential because the session is borrowed mutably for the duration.

use tracing::{debug, info, warn};

use crate::client::{CompletionClient, CompletionError, GenerationParameters, ParameterError};
use crate::conversation::{ConversationLog, Turn};
use crate::profile::document::{DocumentError, DocumentSources};
use crate::profile::{ProfileError, ProfileField, ProfileFields};
use crate::prompt::{Persona, PromptCompiler};
use crate::suggestions::{self, SuggestionCatalog};

/// One user action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interaction {
    /// Free text typed by the user.
    pub typed: Option<String>,
    /// Suggestion selected by the user.
    pub suggestion: Option<String>,
    /// Clear the conversation before anything else.
    pub clear: bool,
}

impl Interaction {
    /// Submit typed text.
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            typed: Some(text.into()),
            ..Self::default()
        }
    }

    /// Submit a selected suggestion.
    pub fn suggestion(text: impl Into<String>) -> Self {
        Self {
            suggestion: Some(text.into()),
            ..Self::default()
        }
    }

    /// Clear the conversation without submitting anything.
    pub fn clear() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }
}

/// What happened to the submitted input.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing was submitted.
    Idle,
    /// The endpoint replied; user and assistant turns were appended.
    Replied(String),
    /// The request failed; the log is unchanged.
    Failed(CompletionError),
}

/// Result of one interaction.
#[derive(Debug)]
pub struct InteractionReport {
    /// Text that was submitted, if any.
    pub submitted: Option<String>,
    /// Completion outcome.
    pub outcome: Outcome,
    /// Non-fatal document problems found during render.
    pub warnings: Vec<DocumentError>,
}

/// Session-scoped state: profile, documents, conversation and client.
#[derive(Debug)]
pub struct ChatSession {
    profile: ProfileFields,
    documents: DocumentSources,
    compiler: PromptCompiler,
    log: ConversationLog,
    params: GenerationParameters,
    client: CompletionClient,
    catalog: SuggestionCatalog,
    knowledge_base: Option<String>,
}

impl ChatSession {
    /// Start a session. The log is seeded with the compiled system turn.
    pub fn new(
        profile: ProfileFields,
        documents: DocumentSources,
        persona: Persona,
        params: GenerationParameters,
        client: CompletionClient,
    ) -> Self {
        let compiler = PromptCompiler::new(persona, documents.knowledge_base_max_chars);
        let mut session = Self {
            profile,
            documents,
            compiler,
            log: ConversationLog::new(),
            params,
            client,
            catalog: SuggestionCatalog::default(),
            knowledge_base: None,
        };
        let warnings = session.render();
        debug!(warnings = warnings.len(), "session started");
        session
    }

    /// Replace the suggestion catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: SuggestionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Run one user action to completion.
    pub async fn interact(&mut self, interaction: Interaction) -> InteractionReport {
        if interaction.clear {
            info!("conversation cleared");
            self.log.reset();
        }

        let warnings = self.render();

        let Some(text) = suggestions::select(
            interaction.typed.as_deref(),
            interaction.suggestion.as_deref(),
        ) else {
            return InteractionReport {
                submitted: None,
                outcome: Outcome::Idle,
                warnings,
            };
        };

        let outcome = self.submit(&text).await;
        InteractionReport {
            submitted: Some(text),
            outcome,
            warnings,
        }
    }

    async fn submit(&mut self, text: &str) -> Outcome {
        let user_turn = Turn::user(text);
        let outbound = self.log.with_pending(&user_turn);

        match self.client.complete(&outbound, &self.params).await {
            Ok(reply) => {
                self.log.append(user_turn);
                self.log.append(Turn::assistant(reply.clone()));
                debug!(turns = self.log.len(), "reply appended");
                Outcome::Replied(reply)
            }
            Err(e) => {
                warn!(error = %e, "completion failed, conversation left unchanged");
                Outcome::Failed(e)
            }
        }
    }

    /// Reload documents, recompile the prompt and refresh the system turn.
    ///
    /// Returns the document problems met while loading.
    pub fn render(&mut self) -> Vec<DocumentError> {
        let loaded = self.documents.load();
        self.profile.record = loaded.record;
        self.knowledge_base = loaded.knowledge_base;
        self.refresh_system_turn();
        loaded.warnings
    }

    fn refresh_system_turn(&mut self) {
        let prompt = self.system_prompt();
        if !self.log.ensure_system_turn(&prompt) {
            self.log.refresh_system_turn(&prompt);
        }
    }

    /// Prompt compiled from the current profile and cached knowledge base.
    pub fn system_prompt(&self) -> String {
        self.compiler
            .compile(&self.profile, self.knowledge_base.as_deref())
    }

    /// Discard the conversation. The next render recreates the system turn.
    pub fn reset(&mut self) {
        self.log.reset();
    }

    /// Edit one profile field; the system turn is refreshed immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] for an invalid value; the profile is unchanged.
    pub fn set_field(&mut self, field: ProfileField, value: &str) -> Result<(), ProfileError> {
        self.profile.set(field, value)?;
        info!(?field, "profile field updated");
        self.refresh_system_turn();
        Ok(())
    }

    /// Switch persona; the system turn is refreshed immediately.
    pub fn set_persona(&mut self, persona: Persona) {
        self.compiler = PromptCompiler::new(persona, self.documents.knowledge_base_max_chars);
        self.refresh_system_turn();
    }

    /// Switch model for subsequent requests.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::EmptyModel`] for a blank name.
    pub fn set_model(&mut self, model: &str) -> Result<(), ParameterError> {
        self.params.set_model(model)
    }

    /// Change temperature for subsequent requests.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::TemperatureOutOfRange`].
    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), ParameterError> {
        self.params.set_temperature(temperature)
    }

    /// Current profile.
    pub fn profile(&self) -> &ProfileFields {
        &self.profile
    }

    /// Conversation log.
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Current generation parameters.
    pub fn params(&self) -> &GenerationParameters {
        &self.params
    }

    /// Current persona.
    pub fn persona(&self) -> Persona {
        self.compiler.persona()
    }

    /// Suggestion catalog.
    pub fn catalog(&self) -> &SuggestionCatalog {
        &self.catalog
    }
}
