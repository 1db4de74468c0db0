//! Compiled program

use indexmap::IndexMap;
use sl_core::Step;

/// A step of the flat program
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub step: Step,
    /// Innermost block the step was inlined from
    pub block: Option<String>,
}

/// Flat, linear instruction list plus the addressable label table
///
/// Immutable once compiled; any number of interpreters may share one
/// program behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CompiledProgram {
    steps: Vec<CompiledStep>,
    labels: IndexMap<String, usize>,
}

impl CompiledProgram {
    pub(crate) fn new(steps: Vec<CompiledStep>, labels: IndexMap<String, usize>) -> Self {
        Self { steps, labels }
    }

    pub fn steps(&self) -> &[CompiledStep] {
        &self.steps
    }

    /// Top-level labels mapped to absolute step positions
    pub fn labels(&self) -> &IndexMap<String, usize> {
        &self.labels
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index).map(|s| &s.step)
    }

    /// Position of an addressable label
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// Timeline label for the step at `index`
    pub fn display_label(&self, index: usize) -> Option<String> {
        self.get(index).map(|step| step.display_label(index))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
