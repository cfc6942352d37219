//! Faena — declarative task automation.
//!
//! Ordered instruction sets of file, HTTP and prompt operations with step
//! references, path aliases and best-effort rollback on failure.

pub mod cli;
pub mod core;
pub mod extensions;
pub mod ops;
