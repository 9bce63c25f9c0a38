//! Prompt compiler tests.

use serde_json::{json, Map, Value};

use aboutme::profile::{ProfileFields, Tone};
use aboutme::prompt::{
    Persona, PromptCompiler, KNOWLEDGE_BASE_HEADER, PROFILE_HEADER, RECORD_HEADER,
};

fn profile() -> ProfileFields {
    ProfileFields {
        name: "Grace Hopper".to_owned(),
        roles: "Rear Admiral; Computer scientist".to_owned(),
        organizations: "US Navy; Eckert-Mauchly".to_owned(),
        interests: "Compilers; Teaching".to_owned(),
        achievements: "- COBOL\n- First compiler".to_owned(),
        tone: Tone::Warm,
        record: None,
    }
}

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn compile_is_deterministic() {
    let compiler = PromptCompiler::default();
    let first = compiler.compile(&profile(), Some("Navy years."));
    let second = compiler.compile(&profile(), Some("Navy years."));
    assert_eq!(first, second);
}

#[test]
fn every_field_and_the_tone_label_are_interpolated() {
    let prompt = PromptCompiler::default().compile(&profile(), None);

    assert!(prompt.contains(PROFILE_HEADER));
    assert!(prompt.contains("Grace Hopper"));
    assert!(prompt.contains("Rear Admiral; Computer scientist"));
    assert!(prompt.contains("US Navy; Eckert-Mauchly"));
    assert!(prompt.contains("Compilers; Teaching"));
    assert!(prompt.contains("First compiler"));
    assert!(prompt.contains("Tone: Warm."));
}

#[test]
fn minimal_profile_without_knowledge_base() {
    let profile = ProfileFields {
        name: "A".to_owned(),
        roles: "Lead".to_owned(),
        tone: Tone::Warm,
        ..ProfileFields::default()
    };

    let prompt = PromptCompiler::default().compile(&profile, None);

    assert!(prompt.contains("\"name\": \"A\""));
    assert!(prompt.contains("\"roles\": \"Lead\""));
    assert!(prompt.contains("Tone: Warm."));
    assert!(!prompt.contains(KNOWLEDGE_BASE_HEADER));
}

#[test]
fn missing_or_blank_knowledge_base_adds_no_section() {
    let compiler = PromptCompiler::default();
    assert!(!compiler.compile(&profile(), None).contains(KNOWLEDGE_BASE_HEADER));
    assert!(!compiler
        .compile(&profile(), Some("  \n "))
        .contains(KNOWLEDGE_BASE_HEADER));
}

#[test]
fn knowledge_base_is_truncated_to_the_ceiling() {
    let compiler = PromptCompiler::new(Persona::Concierge, 5);
    let prompt = compiler.compile(&profile(), Some("abcdefghij"));

    assert!(prompt.ends_with(&format!("{KNOWLEDGE_BASE_HEADER}\nabcde")));
    assert!(!prompt.contains("abcdef"));
}

#[test]
fn knowledge_base_at_the_ceiling_is_kept_whole() {
    let compiler = PromptCompiler::new(Persona::Concierge, 10);
    let prompt = compiler.compile(&profile(), Some("abcdefghij"));
    assert!(prompt.ends_with("abcdefghij"));
}

#[test]
fn record_section_appears_only_when_non_empty() {
    let compiler = PromptCompiler::default();

    let mut with_record = profile();
    with_record.record = Some(record(json!({ "education": ["BA Vassar", "PhD Yale"] })));
    let prompt = compiler.compile(&with_record, None);
    assert!(prompt.contains(RECORD_HEADER));
    assert!(prompt.contains("PhD Yale"));

    let mut empty_record = profile();
    empty_record.record = Some(Map::new());
    assert!(!compiler.compile(&empty_record, None).contains(RECORD_HEADER));
}

#[test]
fn sections_follow_a_fixed_order() {
    let mut with_record = profile();
    with_record.record = Some(record(json!({ "location": "Arlington" })));
    let prompt = PromptCompiler::default().compile(&with_record, Some("kb text"));

    let profile_at = prompt.find(PROFILE_HEADER);
    let record_at = prompt.find(RECORD_HEADER);
    let kb_at = prompt.find(KNOWLEDGE_BASE_HEADER);
    assert!(profile_at < record_at);
    assert!(record_at < kb_at);
    assert!(kb_at.is_some());
}

#[test]
fn personas_share_the_data_blocks_but_not_the_preamble() {
    let concierge = PromptCompiler::new(Persona::Concierge, 100).compile(&profile(), None);
    let avatar = PromptCompiler::new(Persona::Avatar, 100).compile(&profile(), None);
    let grounded = PromptCompiler::new(Persona::Grounded, 100).compile(&profile(), None);

    assert!(concierge.contains("concierge about Grace Hopper"));
    assert!(avatar.starts_with("You are Grace Hopper"));
    assert!(avatar.contains("Do not use bullet points"));
    assert!(grounded.contains("don't have that information"));

    let tail = |prompt: &str| prompt.split_once(PROFILE_HEADER).map(|(_, t)| t.to_owned());
    assert_eq!(tail(&concierge), tail(&avatar));
    assert_eq!(tail(&avatar), tail(&grounded));
}

#[test]
fn persona_deserializes_from_lowercase() {
    let parsed: Result<Persona, _> = serde_json::from_str("\"grounded\"");
    assert!(matches!(parsed, Ok(Persona::Grounded)));
    assert_eq!(Persona::default(), Persona::Concierge);
}
