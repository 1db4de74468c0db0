//! Validation passes over the flat program

use crate::error::{CompileError, Location};
use crate::options::CompileOptions;
use crate::program::{CompiledProgram, CompiledStep};
use sl_core::Step;

fn location(index: usize, step: &CompiledStep) -> Location {
    Location::step(index, step.block.clone())
}

/// Every target, callback and jump label must exist
pub(crate) fn check_references(
    program: &CompiledProgram,
    options: &CompileOptions,
) -> Vec<CompileError> {
    let mut errors = Vec::new();

    for (index, compiled) in program.steps().iter().enumerate() {
        let step = &compiled.step;

        for target in step.targets() {
            if !options.initial_values.contains_key(target) {
                errors.push(CompileError::MissingInitialValue {
                    at: location(index, compiled),
                    target: target.to_string(),
                });
            }
        }

        if let Step::Callback(callback) = step {
            if !options.callbacks.contains(&callback.name) {
                errors.push(CompileError::MissingCallback {
                    at: location(index, compiled),
                    name: callback.name.clone(),
                });
            }
        }

        for label in step.label_refs() {
            if program.label_index(label).is_none() {
                errors.push(CompileError::UnresolvedLabel {
                    at: location(index, compiled),
                    label: label.to_string(),
                });
            }
        }
    }

    errors
}

struct OpenIf {
    index: usize,
    has_else: bool,
}

/// `ifThen`/`ifElse`/`ifEnd` must form a balanced bracket sequence
pub(crate) fn check_balance(steps: &[CompiledStep]) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let mut open: Vec<OpenIf> = Vec::new();

    for (index, compiled) in steps.iter().enumerate() {
        match &compiled.step {
            Step::IfThen(_) => open.push(OpenIf {
                index,
                has_else: false,
            }),
            Step::IfElse(_) => match open.last_mut() {
                None => errors.push(CompileError::UnmatchedElse {
                    at: location(index, compiled),
                }),
                Some(frame) if frame.has_else => errors.push(CompileError::DuplicateElse {
                    at: location(index, compiled),
                }),
                Some(frame) => frame.has_else = true,
            },
            Step::IfEnd(_) => {
                if open.pop().is_none() {
                    errors.push(CompileError::UnmatchedEnd {
                        at: location(index, compiled),
                    });
                }
            }
            _ => {}
        }
    }

    for frame in open {
        errors.push(CompileError::UnclosedIf {
            at: location(frame.index, &steps[frame.index]),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(steps: Vec<Step>) -> Vec<CompiledStep> {
        steps
            .into_iter()
            .map(|step| CompiledStep { step, block: None })
            .collect()
    }

    #[test]
    fn test_balanced() {
        let steps = flat(vec![
            Step::if_then(true),
            Step::if_then(false),
            Step::if_else(),
            Step::if_end(),
            Step::if_else(),
            Step::if_end(),
        ]);
        assert!(check_balance(&steps).is_empty());
    }

    #[test]
    fn test_unmatched_else_and_end() {
        let steps = flat(vec![Step::if_else(), Step::if_end()]);
        let errors = check_balance(&steps);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], CompileError::UnmatchedElse { .. }));
        assert!(matches!(errors[1], CompileError::UnmatchedEnd { .. }));
    }

    #[test]
    fn test_else_reuse() {
        let steps = flat(vec![
            Step::if_then(true),
            Step::if_else(),
            Step::if_else(),
            Step::if_end(),
        ]);
        let errors = check_balance(&steps);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], CompileError::DuplicateElse { at } if at.index == 2));
    }

    #[test]
    fn test_unclosed_reported_at_opening() {
        let steps = flat(vec![Step::vibrate(), Step::if_then(true), Step::if_then(true), Step::if_end()]);
        let errors = check_balance(&steps);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], CompileError::UnclosedIf { at } if at.index == 1));
    }
}
