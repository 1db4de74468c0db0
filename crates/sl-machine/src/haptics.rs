//! Haptic feedback capability

use async_trait::async_trait;
use tracing::trace;

/// Fires haptic feedback for `vibrate` steps
#[async_trait]
pub trait Haptics: Send + Sync {
    /// Resolves once the feedback has been issued
    async fn vibrate(&self);
}

/// Haptics for platforms without a vibration motor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

#[async_trait]
impl Haptics for NoHaptics {
    async fn vibrate(&self) {
        trace!("No haptics available, skipping vibration");
    }
}
