//! Application layer orchestrating the intake dialogue.
//!
//! `workflow` owns the per-user sessions and is the single entry point for
//! inbound events; `pricing` and `registry` are the shared state it relies on.

pub mod pricing;
pub mod registry;
pub mod workflow;
