//! Conversation log ordering and system-slot tests.

use aboutme::conversation::{ConversationLog, Role, Turn};

#[test]
fn system_turn_is_inserted_only_into_an_empty_log() {
    let mut log = ConversationLog::new();
    assert!(log.ensure_system_turn("v1"));
    assert!(!log.ensure_system_turn("v2"));
    assert_eq!(log.turns(), &[Turn::system("v1")]);
}

#[test]
fn refresh_rewrites_slot_zero_in_place() {
    let mut log = ConversationLog::with_system("v1");
    log.append(Turn::user("Hi"));
    log.append(Turn::assistant("Hello!"));

    log.refresh_system_turn("v2");

    assert_eq!(log.len(), 3);
    assert_eq!(log.system_turn(), Some(&Turn::system("v2")));
    let history: Vec<&Turn> = log.history().collect();
    assert_eq!(history, vec![&Turn::user("Hi"), &Turn::assistant("Hello!")]);
}

#[test]
fn refresh_never_touches_a_non_system_first_turn() {
    let mut log = ConversationLog::new();
    log.append(Turn::user("Hi"));
    log.refresh_system_turn("prompt");
    assert_eq!(log.turns(), &[Turn::user("Hi")]);
    assert!(log.system_turn().is_none());
}

#[test]
fn with_pending_leaves_the_log_untouched() {
    let log = ConversationLog::with_system("prompt");
    let outbound = log.with_pending(&Turn::user("Hi"));

    assert_eq!(outbound.len(), 2);
    assert_eq!(outbound[1].role, Role::User);
    assert_eq!(log.len(), 1);
}

#[test]
fn reset_empties_everything() {
    let mut log = ConversationLog::with_system("prompt");
    log.append(Turn::user("Hi"));
    log.reset();
    assert!(log.is_empty());
    assert_eq!(log.history().count(), 0);
}

#[test]
fn turns_serialize_with_lowercase_roles() {
    let encoded = serde_json::to_value(Turn::assistant("Hello!"));
    match encoded {
        Ok(value) => {
            assert_eq!(value["role"], "assistant");
            assert_eq!(value["content"], "Hello!");
        }
        Err(err) => panic!("turn should serialize: {err}"),
    }
}
