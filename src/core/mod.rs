//! Core engine logic — types, parsing, resolution, settings, execution.

pub mod error;
pub mod executor;
pub mod parser;
pub mod resolver;
pub mod settings;
pub mod types;
