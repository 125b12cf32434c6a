//! Registration Assistant: conversational company registration client.

pub mod busy;
pub mod command;
pub mod config;
pub mod error;
pub mod fallback;
pub mod form;
pub mod submission;
pub mod wizard;
