//! The scenario document model

use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::Deserialize;
use sl_callbacks::CallbackRegistry;
use sl_compiler::{compile, Compilation, CompileOptions, CompileResult};
use sl_core::{BlockRegistry, Scenario};
use sl_machine::MachineConfig;

/// Everything needed to compile and run one timeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioDocument {
    /// Run-mode configuration for the machine
    pub config: MachineConfig,

    /// Starting value of every target, restored on reset
    #[serde(alias = "initialValues")]
    pub initial_values: IndexMap<String, f64>,

    /// Blocks available to `use` steps
    pub blocks: BlockRegistry,

    /// Top-level steps
    pub scenario: Scenario,
}

impl ScenarioDocument {
    /// Check values the deserializer cannot reject on its own
    pub fn validate(&self) -> ConfigResult<()> {
        for (target, value) in &self.initial_values {
            if !value.is_finite() {
                return Err(ConfigError::InvalidInitialValue {
                    target: target.clone(),
                    value: *value,
                });
            }
        }
        Ok(())
    }

    /// Compiler options for this document's blocks and values
    pub fn compile_options(&self, callbacks: &CallbackRegistry) -> CompileOptions {
        CompileOptions::new()
            .with_blocks(self.blocks.clone())
            .with_callback_registry(callbacks)
            .with_initial_values(self.initial_values.iter().map(|(k, v)| (k.clone(), *v)))
    }

    /// Compile the scenario against `callbacks`
    pub fn compile(&self, callbacks: &CallbackRegistry) -> CompileResult<Compilation> {
        compile(&self.scenario, &self.compile_options(callbacks))
    }
}
