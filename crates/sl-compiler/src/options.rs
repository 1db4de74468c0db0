//! Compiler inputs

use indexmap::IndexMap;
use sl_callbacks::CallbackRegistry;
use sl_core::BlockRegistry;
use std::collections::BTreeSet;

/// Blocks and reference tables a scenario is compiled against
///
/// `callbacks` and `initial_values` are only consulted for reference
/// validation; nothing is called or read at compile time.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Blocks available to `use` steps
    pub blocks: BlockRegistry,

    /// Names of the side-effect functions
    pub callbacks: BTreeSet<String>,

    /// Initial value of every target
    pub initial_values: IndexMap<String, f64>,

    /// Fail with one aggregate error instead of returning errors as data
    pub raise_errors: bool,
}

impl CompileOptions {
    /// Options with no blocks, callbacks or targets, raising on error
    pub fn new() -> Self {
        Self {
            blocks: BlockRegistry::new(),
            callbacks: BTreeSet::new(),
            initial_values: IndexMap::new(),
            raise_errors: true,
        }
    }

    pub fn with_blocks(mut self, blocks: BlockRegistry) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_callbacks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callbacks.extend(names.into_iter().map(Into::into));
        self
    }

    /// Accept every name registered in `registry`
    pub fn with_callback_registry(self, registry: &CallbackRegistry) -> Self {
        self.with_callbacks(registry.names())
    }

    pub fn with_initial_values<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.initial_values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Return errors alongside the partial program instead of failing
    pub fn collect_errors(mut self) -> Self {
        self.raise_errors = false;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}
