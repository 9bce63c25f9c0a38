//! aboutme: a profile-grounded "about me" chat client.
//!
//! Compiles an editable profile (plus an optional knowledge base and
//! structured profile record) into a system prompt, keeps the running
//! conversation, and forwards it to an OpenAI-compatible completion
//! endpoint, retrying once without `temperature` when a model rejects it.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod providers;

pub mod client;
pub mod conversation;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod suggestions;

pub mod adapters;
