//! Chat session tests: render cycle, input selection, and log updates.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use aboutme::client::{CompletionClient, CompletionError, GenerationParameters};
use aboutme::conversation::{Role, Turn};
use aboutme::credentials::{Credentials, OPENAI_API_KEY};
use aboutme::profile::document::DocumentSources;
use aboutme::profile::{ProfileField, ProfileFields, Tone};
use aboutme::prompt::{Persona, PromptCompiler, KNOWLEDGE_BASE_HEADER, RECORD_HEADER};
use aboutme::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats,
};
use aboutme::session::{ChatSession, Interaction, Outcome};

/// Provider that replays scripted replies and records outbound turns.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok((*r).to_owned())).collect())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_sent(&self) -> Vec<Turn> {
        self.seen
            .lock()
            .expect("seen lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().expect("seen lock").push(request.messages);
        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".to_owned())));
        next.map(|text| CompletionResponse {
            text,
            usage: UsageStats::default(),
            model: "test/mock".to_owned(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn keyed() -> Credentials {
    let mut vars = BTreeMap::new();
    vars.insert(OPENAI_API_KEY.to_owned(), "sk-test".to_owned());
    Credentials::from_map(vars)
}

fn params() -> GenerationParameters {
    match GenerationParameters::new("gpt-4o-mini", 0.4) {
        Ok(params) => params,
        Err(err) => panic!("params should be valid: {err}"),
    }
}

fn session_with(
    provider: Arc<ScriptedProvider>,
    credentials: Credentials,
    documents: DocumentSources,
) -> ChatSession {
    let client = CompletionClient::with_provider(credentials, provider).with_env(|_| None);
    ChatSession::new(
        ProfileFields::default(),
        documents,
        Persona::Concierge,
        params(),
        client,
    )
}

fn session(provider: Arc<ScriptedProvider>) -> ChatSession {
    session_with(provider, keyed(), DocumentSources::default())
}

#[tokio::test]
async fn new_session_holds_only_the_compiled_system_turn() {
    let session = session(ScriptedProvider::replying(&[]));
    let expected = PromptCompiler::default().compile(&ProfileFields::default(), None);

    assert_eq!(session.log().turns(), &[Turn::system(expected)]);
}

#[tokio::test]
async fn typed_question_appends_user_and_assistant_turns() {
    let provider = ScriptedProvider::replying(&["Hello!"]);
    let mut session = session(provider.clone());
    let prompt = session.system_prompt();

    let report = session.interact(Interaction::typed("Hi")).await;

    assert!(matches!(&report.outcome, Outcome::Replied(reply) if reply == "Hello!"));
    assert_eq!(report.submitted.as_deref(), Some("Hi"));
    assert_eq!(
        session.log().turns(),
        &[
            Turn::system(prompt.clone()),
            Turn::user("Hi"),
            Turn::assistant("Hello!"),
        ]
    );
    assert_eq!(
        provider.last_sent(),
        vec![Turn::system(prompt), Turn::user("Hi")]
    );
}

#[tokio::test]
async fn minimal_profile_exchange_records_three_turns() {
    let provider = ScriptedProvider::replying(&["Hello!"]);
    let client = CompletionClient::with_provider(keyed(), provider.clone()).with_env(|_| None);
    let profile = ProfileFields {
        name: "A".to_owned(),
        roles: "Lead".to_owned(),
        tone: Tone::Warm,
        ..ProfileFields::default()
    };
    let mut session = ChatSession::new(
        profile,
        DocumentSources::default(),
        Persona::Concierge,
        params(),
        client,
    );

    let prompt = session.system_prompt();
    assert!(prompt.contains("\"name\": \"A\""));
    assert!(prompt.contains("\"roles\": \"Lead\""));
    assert!(prompt.contains("Tone: Warm."));
    assert!(!prompt.contains(KNOWLEDGE_BASE_HEADER));

    let report = session.interact(Interaction::typed("Hi")).await;

    assert!(matches!(&report.outcome, Outcome::Replied(reply) if reply == "Hello!"));
    assert_eq!(
        session.log().turns(),
        &[
            Turn::system(prompt),
            Turn::user("Hi"),
            Turn::assistant("Hello!"),
        ]
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn suggestion_is_submitted_exactly_once() {
    let provider = ScriptedProvider::replying(&["Data-driven leadership."]);
    let mut session = session(provider.clone());
    let question = "What type of leader are you?";

    session.interact(Interaction::suggestion(question)).await;

    assert_eq!(provider.calls(), 1);
    let user_turns: Vec<&Turn> = session
        .log()
        .history()
        .filter(|t| t.role == Role::User)
        .collect();
    assert_eq!(user_turns, vec![&Turn::user(question)]);
}

#[tokio::test]
async fn typed_text_wins_over_suggestion() {
    let provider = ScriptedProvider::replying(&["ok"]);
    let mut session = session(provider.clone());

    let report = session
        .interact(Interaction {
            typed: Some("Where did you study?".to_owned()),
            suggestion: Some("What are your strengths?".to_owned()),
            clear: false,
        })
        .await;

    assert_eq!(report.submitted.as_deref(), Some("Where did you study?"));
    assert_eq!(provider.calls(), 1);
    assert_eq!(
        provider.last_sent().last(),
        Some(&Turn::user("Where did you study?"))
    );
}

#[tokio::test]
async fn empty_interaction_sends_nothing() {
    let provider = ScriptedProvider::replying(&["unused"]);
    let mut session = session(provider.clone());

    let report = session.interact(Interaction::typed("   ")).await;

    assert!(matches!(report.outcome, Outcome::Idle));
    assert!(report.submitted.is_none());
    assert_eq!(provider.calls(), 0);
    assert_eq!(session.log().len(), 1);
}

#[tokio::test]
async fn clear_leaves_a_single_fresh_system_turn() {
    let provider = ScriptedProvider::replying(&["one", "two"]);
    let mut session = session(provider.clone());
    session.interact(Interaction::typed("first")).await;
    session.interact(Interaction::typed("second")).await;
    assert_eq!(session.log().len(), 5);

    let report = session.interact(Interaction::clear()).await;

    assert!(matches!(report.outcome, Outcome::Idle));
    assert_eq!(provider.calls(), 2);
    assert_eq!(
        session.log().turns(),
        &[Turn::system(session.system_prompt())]
    );
}

#[tokio::test]
async fn clear_with_question_starts_over_then_asks() {
    let provider = ScriptedProvider::replying(&["one", "two"]);
    let mut session = session(provider.clone());
    session.interact(Interaction::typed("first")).await;

    session
        .interact(Interaction {
            typed: Some("again".to_owned()),
            clear: true,
            ..Interaction::default()
        })
        .await;

    assert_eq!(provider.last_sent().len(), 2);
    let history: Vec<&Turn> = session.log().history().collect();
    assert_eq!(history, vec![&Turn::user("again"), &Turn::assistant("two")]);
}

#[tokio::test]
async fn endpoint_failure_leaves_the_log_unchanged() {
    let provider = ScriptedProvider::new(vec![
        Ok("Hello!".to_owned()),
        Err(ProviderError::http_status(500, "upstream down")),
    ]);
    let mut session = session(provider.clone());
    session.interact(Interaction::typed("Hi")).await;
    let before = session.log().clone();

    let report = session.interact(Interaction::typed("Still there?")).await;

    match &report.outcome {
        Outcome::Failed(err) => assert!(!err.halts_session()),
        other => panic!("expected failure, got: {other:?}"),
    }
    assert_eq!(session.log(), &before);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn missing_credential_fails_without_a_request() {
    let provider = ScriptedProvider::replying(&["unused"]);
    let mut session = session_with(
        provider.clone(),
        Credentials::default(),
        DocumentSources::default(),
    );

    let report = session.interact(Interaction::typed("Hi")).await;

    match &report.outcome {
        Outcome::Failed(err @ CompletionError::MissingCredential) => {
            assert!(err.halts_session());
        }
        other => panic!("expected missing credential, got: {other:?}"),
    }
    assert_eq!(provider.calls(), 0);
    assert_eq!(session.log().len(), 1);
}

#[tokio::test]
async fn profile_edit_refreshes_system_turn_and_keeps_history() {
    let provider = ScriptedProvider::replying(&["Hello!", "Sure."]);
    let mut session = session(provider.clone());
    session.interact(Interaction::typed("Hi")).await;

    let edit = session.set_field(ProfileField::Name, "Ada Lovelace");
    assert!(edit.is_ok());

    let system = match session.log().system_turn() {
        Some(turn) => turn.content.clone(),
        None => panic!("system turn should exist"),
    };
    assert!(system.contains("Ada Lovelace"));
    assert_eq!(session.log().len(), 3);

    session.interact(Interaction::typed("Tell me more")).await;
    let sent = provider.last_sent();
    assert_eq!(sent[0].content, system);
    assert_eq!(sent.len(), 4);
}

#[tokio::test]
async fn invalid_tone_is_rejected_without_touching_the_prompt() {
    let mut session = session(ScriptedProvider::replying(&[]));
    let before = session.system_prompt();

    assert!(session.set_field(ProfileField::Tone, "sarcastic").is_err());
    assert_eq!(session.system_prompt(), before);
}

#[tokio::test]
async fn persona_and_model_switches_apply_to_the_next_request() {
    let provider = ScriptedProvider::replying(&["ok"]);
    let mut session = session(provider.clone());

    session.set_persona(Persona::Avatar);
    assert!(session.set_model("gpt-4.1-mini").is_ok());
    assert!(session.set_temperature(2.0).is_err());
    session.interact(Interaction::typed("Hi")).await;

    assert_eq!(session.persona(), Persona::Avatar);
    assert_eq!(session.params().model(), "gpt-4.1-mini");
    assert!((session.params().temperature() - 0.4).abs() < f64::EPSILON);
    assert!(provider.last_sent()[0].content.contains("first person"));
}

#[tokio::test]
async fn knowledge_base_is_reread_on_every_interaction() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir should be created: {err}"),
    };
    let kb_path = dir.path().join("kb.md");
    assert!(fs::write(&kb_path, "Worked on spectrometers.").is_ok());

    let provider = ScriptedProvider::replying(&["one", "two"]);
    let mut session = session_with(
        provider.clone(),
        keyed(),
        DocumentSources {
            knowledge_base: Some(kb_path.clone()),
            ..DocumentSources::default()
        },
    );

    session.interact(Interaction::typed("first")).await;
    assert!(provider.last_sent()[0].content.contains("spectrometers"));

    assert!(fs::write(&kb_path, "Now building satellites.").is_ok());
    session.interact(Interaction::typed("second")).await;

    let sent = provider.last_sent();
    let system = &sent[0].content;
    assert!(system.contains(KNOWLEDGE_BASE_HEADER));
    assert!(system.contains("satellites"));
    assert!(!system.contains("spectrometers"));
}

#[tokio::test]
async fn malformed_structured_profile_is_a_warning_not_a_failure() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir should be created: {err}"),
    };
    let profile_path = dir.path().join("profile.json");
    assert!(fs::write(&profile_path, "{ not json").is_ok());

    let provider = ScriptedProvider::replying(&["ok"]);
    let mut session = session_with(
        provider.clone(),
        keyed(),
        DocumentSources {
            structured_profile: Some(profile_path),
            ..DocumentSources::default()
        },
    );

    let report = session.interact(Interaction::typed("Hi")).await;

    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(report.outcome, Outcome::Replied(_)));
    assert_eq!(session.profile().record, Some(serde_json::Map::new()));
    assert!(!session.system_prompt().contains(RECORD_HEADER));
}

#[tokio::test]
async fn structured_profile_record_reaches_the_prompt() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir should be created: {err}"),
    };
    let profile_path = dir.path().join("profile.json");
    assert!(fs::write(
        &profile_path,
        r#"{"education": ["MBA"], "location": "Zurich"}"#
    )
    .is_ok());

    let session = session_with(
        ScriptedProvider::replying(&[]),
        keyed(),
        DocumentSources {
            structured_profile: Some(profile_path),
            ..DocumentSources::default()
        },
    );

    let system = match session.log().system_turn() {
        Some(turn) => turn.content.clone(),
        None => panic!("system turn should exist"),
    };
    assert!(system.contains(RECORD_HEADER));
    assert!(system.contains("Zurich"));
}
