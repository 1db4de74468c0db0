//! Scenario Compiler
//!
//! This crate turns an authored [`Scenario`](sl_core::Scenario) into a flat
//! [`CompiledProgram`]: every `use` step is replaced by the steps of its
//! block, top-level labels are resolved to absolute positions, and the
//! result is statically validated.
//!
//! # Passes
//!
//! 1. Flatten: depth-first block expansion, step shape checks, label
//!    uniqueness across the whole tree
//! 2. References: value targets, callback names and jump labels exist
//! 3. Balance: `ifThen`/`ifElse`/`ifEnd` nest properly
//!
//! Errors from every pass are collected, never short-circuited.
//!
//! # Key Types
//!
//! - [`compile`] - Entry point
//! - [`CompileOptions`] - Blocks and reference tables
//! - [`CompiledProgram`] - Flat steps plus label table
//! - [`CompileError`] - One validation failure

mod compiler;
mod error;
mod options;
mod program;
mod validate;

pub use compiler::{compile, Compilation};
pub use error::{CompileError, CompileFailure, CompileResult, Location};
pub use options::CompileOptions;
pub use program::{CompiledProgram, CompiledStep};
