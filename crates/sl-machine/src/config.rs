//! Interpreter configuration

use serde::{Deserialize, Serialize};

/// When `vibrate` steps fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VibrationMode {
    /// First `vibrate` of each run only
    #[default]
    Once,
    /// Every `vibrate`
    Always,
}

/// How the program is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// `start()` runs steps back to back
    #[default]
    Auto,
    /// Each `next_step()` runs one step
    Manual,
}

/// Run-mode configuration of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MachineConfig {
    /// Restart from the first step when a run completes
    #[serde(default, rename = "loop")]
    pub looping: bool,

    #[serde(default, alias = "vibrationMode")]
    pub vibration_mode: VibrationMode,

    #[serde(default)]
    pub mode: RunMode,
}

impl MachineConfig {
    pub fn manual() -> Self {
        Self {
            mode: RunMode::Manual,
            ..Self::default()
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_vibration(mut self, mode: VibrationMode) -> Self {
        self.vibration_mode = mode;
        self
    }
}
