//! Step-Machine Interpreter
//!
//! This crate executes a [`CompiledProgram`](sl_compiler::CompiledProgram)
//! one step at a time. The interpreter is single-threaded in the sense that
//! matters: steps never overlap, and the driving loop is the only place the
//! next step is chosen.
//!
//! # Control flow
//!
//! - `goto`/`resume` through a single-slot return-address register
//! - `ifJump`, and `ifThen`/`ifElse`/`ifEnd` bracket skipping
//! - `hold`, released only by [`StepMachine::next_step`]
//! - `parallel` fan-out joined before the next step
//!
//! # Key Types
//!
//! - [`StepMachine`] - The interpreter
//! - [`MachineConfig`] - Looping, vibration and run mode
//! - [`ExecutionState`] - Cursor and registers of one machine
//! - [`StepPosition`] - Timeline display updates

mod config;
mod error;
mod haptics;
mod machine;
mod resolve;
mod state;

pub use config::{MachineConfig, RunMode, VibrationMode};
pub use error::{MachineError, MachineResult};
pub use haptics::{Haptics, NoHaptics};
pub use machine::{StepMachine, StepPosition};
pub use state::{ExecutionState, Flow};
