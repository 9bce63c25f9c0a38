//! Prompt compiler: renders the profile into the system turn.
//!
//! One template family, three personas. Every profile attribute is
//! interpolated as a pretty-printed JSON block so identical inputs always
//! produce identical prompts.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::document::{truncate_chars, DEFAULT_KNOWLEDGE_BASE_MAX_CHARS};
use crate::profile::ProfileFields;

/// Section header marking the knowledge-base block.
pub const KNOWLEDGE_BASE_HEADER: &str = "[KNOWLEDGE BASE]";
/// Section header marking the editable profile block.
pub const PROFILE_HEADER: &str = "[USER PROFILE JSON]";
/// Section header marking the structured profile record block.
pub const RECORD_HEADER: &str = "[STRUCTURED PROFILE JSON]";

/// Which voice the assistant answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Third-person concierge that personalises answers about the user.
    #[default]
    Concierge,
    /// First-person avatar in interview mode, prose only.
    Avatar,
    /// Strictly profile-grounded; declines anything the profile lacks.
    Grounded,
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concierge" => Ok(Self::Concierge),
            "avatar" | "first-person" => Ok(Self::Avatar),
            "grounded" | "strict" => Ok(Self::Grounded),
            other => Err(format!(
                "unknown persona '{other}' (expected concierge, avatar or grounded)"
            )),
        }
    }
}

/// Compiles profile and knowledge base into the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptCompiler {
    persona: Persona,
    knowledge_base_max_chars: usize,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(Persona::default(), DEFAULT_KNOWLEDGE_BASE_MAX_CHARS)
    }
}

impl PromptCompiler {
    /// Create a compiler for a persona and knowledge-base ceiling.
    pub fn new(persona: Persona, knowledge_base_max_chars: usize) -> Self {
        Self {
            persona,
            knowledge_base_max_chars,
        }
    }

    /// Persona in use.
    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Render the system prompt. Pure; never empty.
    ///
    /// A knowledge base longer than the ceiling is silently truncated. An
    /// empty or absent knowledge base yields no knowledge-base section.
    pub fn compile(&self, profile: &ProfileFields, knowledge_base: Option<&str>) -> String {
        let mut prompt = String::with_capacity(2048);
        prompt.push_str(&persona_preamble(self.persona, profile));

        prompt.push_str(&format!(
            "\n\n{PROFILE_HEADER}\n{}",
            pretty_json(&profile.to_json())
        ));

        if let Some(record) = profile.record.as_ref().filter(|r| !r.is_empty()) {
            prompt.push_str(&format!(
                "\n\n{RECORD_HEADER}\n{}",
                pretty_json(&Value::Object(record.clone()))
            ));
        }

        if let Some(kb) = knowledge_base.filter(|kb| !kb.trim().is_empty()) {
            let kb = truncate_chars(kb, self.knowledge_base_max_chars);
            prompt.push_str(&format!("\n\n{KNOWLEDGE_BASE_HEADER}\n{kb}"));
        }

        prompt
    }
}

fn persona_preamble(persona: Persona, profile: &ProfileFields) -> String {
    let name = profile.name.trim();
    let who = if name.is_empty() { "the user" } else { name };
    let tone = profile.tone.label();

    match persona {
        Persona::Concierge => format!(
            "You are a helpful assistant that answers as a concierge about {who}, using the profile below.\n\
             Use it to personalise answers (examples, wording, industries). If asked about {who}, summarise from this profile.\n\
             If a question is outside the profile, answer normally but anchor to {who}'s context when helpful.\n\
             Keep responses clear and structured. Do not invent facts that are not in the profile or knowledge base.\n\
             Tone: {tone}."
        ),
        Persona::Avatar => format!(
            "You are {who}, answering questions about yourself in the first person, as in an interview.\n\
             Answer only from the facts in the profile and knowledge base below. \
             If they do not cover a question, say so plainly or hedge; never invent details.\n\
             Write in flowing prose. Do not use bullet points or numbered lists.\n\
             Tone: {tone}."
        ),
        Persona::Grounded => format!(
            "You are an assistant that only answers questions about {who}'s public profile below.\n\
             If a question is outside the profile, say you don't have that information.\n\
             Share contact details only when they appear in the profile.\n\
             Be truthful and do not invent facts. If uncertain, say so.\n\
             Tone: {tone}."
        ),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
