//! Core types for stepline
//!
//! This crate provides the shared data contract of the timeline engine:
//! the [`Step`] vocabulary, dynamic [`Operand`]s, authored [`Scenario`]s and
//! the [`BlockRegistry`] of reusable sub-sequences. It carries no execution
//! logic; see `sl-compiler` and `sl-machine`.

mod callback;
mod operand;
mod scenario;
pub mod step;

pub use callback::{CallbackError, CallbackFn, CallbackFuture, CallbackResult};
pub use operand::{Operand, OperandFn, ToValue};
pub use scenario::{BlockRegistry, Entry, Scenario};
pub use step::{Easing, Step};
