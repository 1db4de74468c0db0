//! Block flattening and the compile entry point

use crate::error::{CompileError, CompileFailure, CompileResult, Location};
use crate::options::CompileOptions;
use crate::program::{CompiledProgram, CompiledStep};
use crate::validate::{check_balance, check_references};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::Value;
use sl_core::{BlockRegistry, Entry, Scenario, Step};
use std::collections::HashSet;
use tracing::{debug, instrument, trace, warn};

/// Output of a compilation
///
/// In collecting mode `errors` may be non-empty; `program` is then the
/// best-effort flattening with malformed steps left out.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub program: CompiledProgram,
    pub errors: Vec<CompileError>,
}

impl Compilation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compile a scenario against the given blocks and reference tables
#[instrument(skip_all, fields(entries = scenario.len()))]
pub fn compile(scenario: &Scenario, options: &CompileOptions) -> CompileResult<Compilation> {
    let mut flattener = Flattener::new(&options.blocks);
    flattener.walk(scenario);
    let (program, mut errors) = flattener.finish();

    errors.extend(check_references(&program, options));
    errors.extend(check_balance(program.steps()));

    let errors: Vec<_> = errors
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();

    if !errors.is_empty() {
        warn!(count = errors.len(), "Scenario has compile errors");
        if options.raise_errors {
            return Err(CompileFailure { errors });
        }
    }

    debug!(
        steps = program.len(),
        labels = program.labels().len(),
        "Compiled scenario"
    );
    Ok(Compilation { program, errors })
}

/// Depth-first block expansion
struct Flattener<'a> {
    blocks: &'a BlockRegistry,
    steps: Vec<CompiledStep>,
    labels: IndexMap<String, usize>,
    seen_labels: HashSet<String>,
    errors: Vec<CompileError>,
    /// Blocks currently being expanded, outermost first
    path: Vec<String>,
}

impl<'a> Flattener<'a> {
    fn new(blocks: &'a BlockRegistry) -> Self {
        Self {
            blocks,
            steps: Vec::new(),
            labels: IndexMap::new(),
            seen_labels: HashSet::new(),
            errors: Vec::new(),
            path: Vec::new(),
        }
    }

    fn finish(self) -> (CompiledProgram, Vec<CompileError>) {
        (CompiledProgram::new(self.steps, self.labels), self.errors)
    }

    fn location(&self, entry: usize) -> Location {
        Location {
            index: self.steps.len(),
            block: self.path.last().cloned(),
            entry: Some(entry),
        }
    }

    fn walk(&mut self, scenario: &Scenario) {
        for (position, entry) in scenario.iter().enumerate() {
            let at = self.location(position);

            let Some(step) = self.parse(entry, &at) else {
                continue;
            };

            let shape_errors = check_shape(&step, &at);
            if !shape_errors.is_empty() {
                self.errors.extend(shape_errors);
                continue;
            }

            match step {
                Step::Use(use_step) => self.expand(&use_step.block, at),
                Step::Label(label_step) => {
                    let name = label_step.label.clone();
                    if !self.seen_labels.insert(name.clone()) {
                        self.errors.push(CompileError::DuplicateLabel { at, label: name });
                    } else if self.path.is_empty() {
                        self.labels.insert(name, self.steps.len());
                    }
                    self.push(Step::Label(label_step));
                }
                step => self.push(step),
            }
        }
    }

    fn expand(&mut self, name: &str, at: Location) {
        if self.path.iter().any(|b| b == name) {
            self.errors.push(CompileError::CircularBlock {
                at,
                block: name.to_string(),
            });
            return;
        }

        let Some(block) = self.blocks.get(name) else {
            self.errors.push(CompileError::BlockNotFound {
                at,
                block: name.to_string(),
            });
            return;
        };

        trace!(block = %name, "Expanding block");
        self.path.push(name.to_string());
        self.walk(block);
        self.path.pop();
    }

    fn push(&mut self, step: Step) {
        self.steps.push(CompiledStep {
            step,
            block: self.path.last().cloned(),
        });
    }

    /// Turn an entry into a typed step, recording why it is not one
    fn parse(&mut self, entry: &Entry, at: &Location) -> Option<Step> {
        let value = match entry {
            Entry::Step(step) => return Some(step.clone()),
            Entry::Raw(value) => value,
        };

        if !value.is_object() {
            self.errors.push(CompileError::InvalidStep {
                at: at.clone(),
                reason: format!("expected an object, found {}", json_kind(value)),
            });
            return None;
        }

        match Step::deserialize(value) {
            Ok(step) => Some(step),
            Err(e) => {
                let at = at.clone();
                let reason = e.to_string();
                self.errors
                    .push(match value.get("type").and_then(Value::as_str) {
                        Some("label") => CompileError::MissingLabel { at },
                        Some("ifJump") => CompileError::InvalidIfJump { at, reason },
                        Some("parallel") => CompileError::InvalidParallel { at, reason },
                        _ => CompileError::InvalidStep { at, reason },
                    });
                None
            }
        }
    }
}

/// Payload checks the type system cannot express
fn check_shape(step: &Step, at: &Location) -> Vec<CompileError> {
    let mut errors = Vec::new();

    match step {
        Step::Label(s) if s.label.is_empty() => {
            errors.push(CompileError::MissingLabel { at: at.clone() });
        }
        Step::IfJump(s) => {
            if s.condition.is_literal() {
                errors.push(CompileError::InvalidIfJump {
                    at: at.clone(),
                    reason: "condition must be a function or a named reference".to_string(),
                });
            }
            if s.label_true.is_empty() {
                errors.push(CompileError::InvalidIfJump {
                    at: at.clone(),
                    reason: "labelTrue must be a non-empty string".to_string(),
                });
            }
        }
        Step::Parallel(s) => {
            if s.targets.is_empty() {
                errors.push(CompileError::InvalidParallel {
                    at: at.clone(),
                    reason: "targets must not be empty".to_string(),
                });
            }
            for (i, tween) in s.targets.iter().enumerate() {
                if tween.target.is_empty() {
                    errors.push(CompileError::InvalidParallel {
                        at: at.clone(),
                        reason: format!("entry {} has an empty target", i),
                    });
                }
            }
        }
        _ => {}
    }

    errors
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sl_core::step::Tween;

    fn options() -> CompileOptions {
        CompileOptions::new()
            .with_initial_values([("x", 0.0), ("opacity", 0.0), ("scale", 1.0)])
            .collect_errors()
    }

    #[test]
    fn test_flat_scenario_labels() {
        let scenario = Scenario::from(vec![
            Step::label("start"),
            Step::comment("fade in"),
            Step::move_to("opacity", 1.0, 500),
            Step::label("end"),
        ]);

        let compiled = compile(&scenario, &options()).unwrap();
        assert!(compiled.is_valid());
        assert_eq!(compiled.program.len(), 4);
        assert_eq!(compiled.program.label_index("start"), Some(0));
        assert_eq!(compiled.program.label_index("end"), Some(3));
    }

    #[test]
    fn test_non_object_entry() {
        let scenario = Scenario::from_values([json!({"type": "vibrate"}), json!("oops"), json!(3)]);
        let compiled = compile(&scenario, &options()).unwrap();

        assert_eq!(compiled.program.len(), 1);
        assert_eq!(compiled.errors.len(), 2);
        assert!(compiled
            .errors
            .iter()
            .all(|e| matches!(e, CompileError::InvalidStep { .. })));
    }

    #[test]
    fn test_raw_label_must_be_string() {
        let scenario = Scenario::from_values([
            json!({"type": "label", "label": 5}),
            json!({"type": "label"}),
            json!({"type": "label", "label": ""}),
        ]);
        let compiled = compile(&scenario, &options()).unwrap();

        assert_eq!(compiled.program.len(), 0);
        assert_eq!(compiled.errors.len(), 3);
        assert!(compiled
            .errors
            .iter()
            .all(|e| matches!(e, CompileError::MissingLabel { .. })));
    }

    #[test]
    fn test_rejected_entries_reported_separately() {
        let scenario = Scenario::from_values([
            json!({"type": "warp"}),
            json!({"type": "warp"}),
            json!(7),
            json!(7),
        ]);
        let compiled = compile(&scenario, &options()).unwrap();

        assert_eq!(compiled.program.len(), 0);
        assert_eq!(compiled.errors.len(), 4);
        let entries: Vec<_> = compiled
            .errors
            .iter()
            .map(|e| e.location().entry)
            .collect();
        assert_eq!(entries, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_if_jump_shape() {
        let scenario = Scenario::from(vec![
            Step::label("a"),
            Step::if_jump(true, "a", None),
            Step::if_jump("ready", "", None),
        ]);
        let compiled = compile(&scenario, &options()).unwrap();

        let shape_errors: Vec<_> = compiled
            .errors
            .iter()
            .filter(|e| matches!(e, CompileError::InvalidIfJump { .. }))
            .collect();
        assert_eq!(shape_errors.len(), 2);
    }

    #[test]
    fn test_raw_if_jump_label_false_must_be_string() {
        let scenario = Scenario::from_values([json!({
            "type": "ifJump",
            "condition": "ready",
            "labelTrue": "a",
            "labelFalse": 7
        })]);
        let compiled = compile(&scenario, &options()).unwrap();
        assert!(matches!(
            compiled.errors[0],
            CompileError::InvalidIfJump { .. }
        ));
    }

    #[test]
    fn test_parallel_shape() {
        let scenario = Scenario::from(vec![
            Step::parallel(vec![]),
            Step::parallel(vec![Tween::new("", 1.0, 100)]),
        ]);
        let compiled = compile(&scenario, &options()).unwrap();
        assert_eq!(compiled.errors.len(), 2);
        assert!(compiled
            .errors
            .iter()
            .all(|e| matches!(e, CompileError::InvalidParallel { .. })));

        let raw = Scenario::from_values([json!({"type": "parallel", "targets": [{"to": 1}]})]);
        let compiled = compile(&raw, &options()).unwrap();
        assert!(matches!(
            compiled.errors[0],
            CompileError::InvalidParallel { .. }
        ));
    }

    #[test]
    fn test_circular_blocks() {
        let blocks = BlockRegistry::new()
            .with_block("a", vec![Step::use_block("b")])
            .with_block("b", vec![Step::vibrate(), Step::use_block("a")]);
        let scenario = Scenario::from(vec![Step::use_block("a")]);

        let compiled = compile(&scenario, &options().with_blocks(blocks)).unwrap();
        assert_eq!(compiled.program.len(), 1);
        assert!(matches!(
            &compiled.errors[0],
            CompileError::CircularBlock { block, .. } if block == "a"
        ));
    }

    #[test]
    fn test_nested_blocks_tag_innermost() {
        let blocks = BlockRegistry::new()
            .with_block("outer", vec![Step::vibrate(), Step::use_block("inner")])
            .with_block("inner", vec![Step::hold()]);
        let scenario = Scenario::from(vec![Step::use_block("outer"), Step::stop()]);

        let compiled = compile(&scenario, &options().with_blocks(blocks)).unwrap();
        let origins: Vec<_> = compiled
            .program
            .steps()
            .iter()
            .map(|s| s.block.as_deref())
            .collect();
        assert_eq!(origins, vec![Some("outer"), Some("inner"), None]);
    }

    #[test]
    fn test_raise_mode_fails() {
        let scenario = Scenario::from(vec![Step::use_block("missing")]);
        let options = CompileOptions::new();

        let failure = compile(&scenario, &options).unwrap_err();
        assert_eq!(failure.errors.len(), 1);
        assert!(failure.to_string().contains("block not found: missing"));
    }
}
