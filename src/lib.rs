//! chartvault: pattern detection over price bars with a two-tier datastore.
//!
//! Hexagonal layout: pure logic in [`domain`], port traits in [`ports`], concrete
//! implementations in [`adapters`]. [`orchestrator`] wires them together per run and
//! [`cli`] is the command-line entry point.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod orchestrator;
pub mod ports;
