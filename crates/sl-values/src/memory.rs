//! In-memory value driver
//!
//! Values live in a concurrent map. Animations are stepped once per frame on
//! the tokio timer; each write bumps a per-target generation so that a newer
//! `animate` or `set` supersedes any animation already running.

use crate::driver::{Animation, DriverError, DriverResult, ValueDriver};
use crate::easing::{ease, lerp};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace};

/// Default frame period (~60 Hz)
const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// Default channel capacity for change subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Notification sent whenever a value is written
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged {
    pub target: String,
    pub value: f64,
}

struct Slot {
    value: f64,
    generation: u64,
}

/// A value driver backed by a concurrent map
pub struct MemoryDriver {
    values: DashMap<String, Slot>,
    changes: broadcast::Sender<ValueChanged>,
    frame: Duration,
}

impl MemoryDriver {
    /// Create a driver owning the given targets
    pub fn new<I, K>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let (changes, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let values = initial
            .into_iter()
            .map(|(k, value)| (k.into(), Slot { value, generation: 0 }))
            .collect();

        Self {
            values,
            changes,
            frame: DEFAULT_FRAME,
        }
    }

    /// Override the frame period
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }

    /// Subscribe to value writes
    pub fn subscribe(&self) -> broadcast::Receiver<ValueChanged> {
        self.changes.subscribe()
    }

    /// Claim a target for a new write, superseding running animations
    fn claim(&self, target: &str) -> DriverResult<(f64, u64)> {
        let mut slot = self
            .values
            .get_mut(target)
            .ok_or_else(|| DriverError::UnknownTarget(target.to_string()))?;
        slot.generation += 1;
        Ok((slot.value, slot.generation))
    }

    /// Write a frame value; returns false once the animation was superseded
    fn write(&self, target: &str, value: f64, generation: u64) -> DriverResult<bool> {
        {
            let mut slot = self
                .values
                .get_mut(target)
                .ok_or_else(|| DriverError::UnknownTarget(target.to_string()))?;
            if slot.generation != generation {
                return Ok(false);
            }
            slot.value = value;
        }

        // Ignore send errors - they just mean no active receivers
        let _ = self.changes.send(ValueChanged {
            target: target.to_string(),
            value,
        });
        Ok(true)
    }
}

#[async_trait]
impl ValueDriver for MemoryDriver {
    fn get(&self, target: &str) -> Option<f64> {
        self.values.get(target).map(|s| s.value)
    }

    #[instrument(skip(self))]
    fn set(&self, target: &str, value: f64) -> DriverResult<()> {
        let (_, generation) = self.claim(target)?;
        debug!("Setting value");
        self.write(target, value, generation)?;
        Ok(())
    }

    #[instrument(skip(self, animation), fields(to = animation.to))]
    async fn animate(&self, target: &str, animation: Animation) -> DriverResult<()> {
        let (from, generation) = self.claim(target)?;
        debug!(from, duration = ?animation.duration, "Animating value");

        if animation.duration.is_zero() {
            self.write(target, animation.to, generation)?;
            return Ok(());
        }

        let start = Instant::now();
        let total = animation.duration.as_secs_f64();
        let mut ticker = tokio::time::interval(self.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let t = (start.elapsed().as_secs_f64() / total).min(1.0);
            let value = lerp(from, animation.to, ease(animation.easing, t));

            if !self.write(target, value, generation)? {
                trace!("Animation superseded");
                return Ok(());
            }
            if t >= 1.0 {
                return Ok(());
            }
        }
    }

    fn targets(&self) -> Vec<String> {
        let mut targets: Vec<_> = self.values.iter().map(|r| r.key().clone()).collect();
        targets.sort();
        targets
    }
}

/// Thread-safe wrapper for MemoryDriver
pub type SharedMemoryDriver = Arc<MemoryDriver>;
