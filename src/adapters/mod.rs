//! Adapters: ways of driving a [`crate::session::ChatSession`] from the outside.

pub mod cli;
