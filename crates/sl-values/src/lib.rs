//! Value driver for stepline
//!
//! The interpreter never interpolates values itself. It delegates to a
//! [`ValueDriver`], which owns one animatable number per named target. This
//! crate defines the capability and ships [`MemoryDriver`], an in-process
//! implementation that tweens on the tokio timer.

mod driver;
pub mod easing;
mod memory;

pub use driver::{Animation, DriverError, DriverResult, ValueDriver};
pub use memory::{MemoryDriver, SharedMemoryDriver, ValueChanged};
