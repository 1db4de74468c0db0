//! The value driver capability

use async_trait::async_trait;
use futures::future::try_join_all;
use sl_core::Easing;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a value driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("unknown value target: {0}")]
    UnknownTarget(String),

    #[error("animation failed: {0}")]
    Failed(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Parameters of one animation request
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Destination value
    pub to: f64,
    /// Time to reach it
    pub duration: Duration,
    /// Interpolation curve
    pub easing: Easing,
    /// Hint that the animation may run off the main loop
    pub native: bool,
}

impl Animation {
    pub fn new(to: f64, duration: Duration) -> Self {
        Self {
            to,
            duration,
            easing: Easing::Linear,
            native: false,
        }
    }
}

/// Owner of the animatable values
///
/// `animate` must resolve exactly once per call, including when a later
/// `animate` or `set` on the same target supersedes it.
#[async_trait]
pub trait ValueDriver: Send + Sync {
    /// Current value of a target
    fn get(&self, target: &str) -> Option<f64>;

    /// Write a value immediately
    fn set(&self, target: &str, value: f64) -> DriverResult<()>;

    /// Animate a target, resolving when the animation finishes
    async fn animate(&self, target: &str, animation: Animation) -> DriverResult<()>;

    /// Animate several targets together, resolving when all have finished
    async fn animate_batch(&self, batch: Vec<(String, Animation)>) -> DriverResult<()> {
        let animations = batch
            .into_iter()
            .map(|(target, animation)| async move { self.animate(&target, animation).await });
        try_join_all(animations).await?;
        Ok(())
    }

    /// Names of all known targets
    fn targets(&self) -> Vec<String>;
}
