//! Step types
//!
//! Steps are the instructions of a scenario. Each step is a tagged record
//! with a `type` discriminant and a type-specific payload; every kind carries
//! an optional `label` tag used for display and diagnostics.

use crate::operand::{Operand, ToValue};
use serde::Deserialize;

/// Interpolation curve hint for animated steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
}

/// One animated value change: the payload of `move` and of each `parallel` entry
#[derive(Debug, Clone, Deserialize)]
pub struct Tween {
    /// Value target name
    pub target: String,

    /// Destination value (absolute or relative)
    pub to: ToValue,

    /// Duration in milliseconds
    pub duration: Operand,

    /// Interpolation curve
    #[serde(default)]
    pub easing: Option<Easing>,

    /// Hint that the driver may animate off the main loop
    #[serde(default)]
    pub native: bool,
}

impl Tween {
    pub fn new(target: impl Into<String>, to: impl Into<ToValue>, duration_ms: u64) -> Self {
        Self {
            target: target.into(),
            to: to.into(),
            duration: Operand::from(duration_ms),
            easing: None,
            native: false,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// A scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    /// Animate a target to a value
    Move(MoveStep),

    /// Wait for a duration
    Delay(DelayStep),

    /// Animate several targets at once and wait for all of them
    Parallel(ParallelStep),

    /// Fire haptic feedback
    Vibrate(VibrateStep),

    /// Invoke a side-effect function
    Callback(CallbackStep),

    /// Suspend until resumed from outside
    Hold(HoldStep),

    /// Addressable position
    Label(LabelStep),

    /// Author note
    Comment(CommentStep),

    /// Inline a named block (compile time only)
    Use(UseStep),

    /// Jump to a label, remembering the return address
    Goto(GotoStep),

    /// Write a value without animation
    Set(SetStep),

    /// Return to the step after the last `goto`
    Resume(ResumeStep),

    /// Halt the driving loop after this step
    Stop(StopStep),

    /// Conditional jump
    IfJump(IfJumpStep),

    /// Open a conditional block
    IfThen(IfThenStep),

    /// Else branch of the enclosing conditional block
    IfElse(IfElseStep),

    /// Close a conditional block
    IfEnd(IfEndStep),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveStep {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(flatten)]
    pub tween: Tween,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelayStep {
    #[serde(default)]
    pub label: Option<String>,

    /// Milliseconds
    pub duration: Operand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParallelStep {
    #[serde(default)]
    pub label: Option<String>,

    pub targets: Vec<Tween>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VibrateStep {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackStep {
    #[serde(default)]
    pub label: Option<String>,

    /// Side-effect function name
    pub name: String,

    /// Argument passed to the function
    #[serde(default)]
    pub value: Option<Operand>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldStep {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelStep {
    /// Label name
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentStep {
    #[serde(default)]
    pub label: Option<String>,

    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UseStep {
    #[serde(default)]
    pub label: Option<String>,

    /// Block name
    pub block: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GotoStep {
    /// Target label
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetStep {
    #[serde(default)]
    pub label: Option<String>,

    pub target: String,

    pub value: Operand,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeStep {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopStep {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfJumpStep {
    #[serde(default)]
    pub label: Option<String>,

    pub condition: Operand,

    /// Jump target when the condition holds
    pub label_true: String,

    /// Jump target otherwise; falls through when absent
    #[serde(default)]
    pub label_false: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IfThenStep {
    #[serde(default)]
    pub label: Option<String>,

    pub condition: Operand,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IfElseStep {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IfEndStep {
    #[serde(default)]
    pub label: Option<String>,
}

impl Step {
    pub fn move_to(target: impl Into<String>, to: impl Into<ToValue>, duration_ms: u64) -> Self {
        Step::Move(MoveStep {
            label: None,
            tween: Tween::new(target, to, duration_ms),
        })
    }

    pub fn delay(duration: impl Into<Operand>) -> Self {
        Step::Delay(DelayStep {
            label: None,
            duration: duration.into(),
        })
    }

    pub fn parallel(targets: Vec<Tween>) -> Self {
        Step::Parallel(ParallelStep {
            label: None,
            targets,
        })
    }

    pub fn vibrate() -> Self {
        Step::Vibrate(VibrateStep::default())
    }

    pub fn callback(name: impl Into<String>) -> Self {
        Step::Callback(CallbackStep {
            label: None,
            name: name.into(),
            value: None,
        })
    }

    pub fn callback_with(name: impl Into<String>, value: impl Into<Operand>) -> Self {
        Step::Callback(CallbackStep {
            label: None,
            name: name.into(),
            value: Some(value.into()),
        })
    }

    pub fn hold() -> Self {
        Step::Hold(HoldStep::default())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Step::Label(LabelStep { label: name.into() })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Step::Comment(CommentStep {
            label: None,
            comment: text.into(),
        })
    }

    pub fn use_block(block: impl Into<String>) -> Self {
        Step::Use(UseStep {
            label: None,
            block: block.into(),
        })
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Step::Goto(GotoStep {
            label: label.into(),
        })
    }

    pub fn set(target: impl Into<String>, value: impl Into<Operand>) -> Self {
        Step::Set(SetStep {
            label: None,
            target: target.into(),
            value: value.into(),
        })
    }

    pub fn resume() -> Self {
        Step::Resume(ResumeStep::default())
    }

    pub fn stop() -> Self {
        Step::Stop(StopStep::default())
    }

    pub fn if_jump(
        condition: impl Into<Operand>,
        label_true: impl Into<String>,
        label_false: Option<&str>,
    ) -> Self {
        Step::IfJump(IfJumpStep {
            label: None,
            condition: condition.into(),
            label_true: label_true.into(),
            label_false: label_false.map(str::to_string),
        })
    }

    pub fn if_then(condition: impl Into<Operand>) -> Self {
        Step::IfThen(IfThenStep {
            label: None,
            condition: condition.into(),
        })
    }

    pub fn if_else() -> Self {
        Step::IfElse(IfElseStep::default())
    }

    pub fn if_end() -> Self {
        Step::IfEnd(IfEndStep::default())
    }

    /// Attach a display tag
    ///
    /// `label` and `goto` steps use their `label` field as a name, so the
    /// tag is ignored for them.
    pub fn with_label(mut self, tag: impl Into<String>) -> Self {
        let tag = Some(tag.into());
        match &mut self {
            Step::Move(s) => s.label = tag,
            Step::Delay(s) => s.label = tag,
            Step::Parallel(s) => s.label = tag,
            Step::Vibrate(s) => s.label = tag,
            Step::Callback(s) => s.label = tag,
            Step::Hold(s) => s.label = tag,
            Step::Comment(s) => s.label = tag,
            Step::Use(s) => s.label = tag,
            Step::Set(s) => s.label = tag,
            Step::Resume(s) => s.label = tag,
            Step::Stop(s) => s.label = tag,
            Step::IfJump(s) => s.label = tag,
            Step::IfThen(s) => s.label = tag,
            Step::IfElse(s) => s.label = tag,
            Step::IfEnd(s) => s.label = tag,
            Step::Label(_) | Step::Goto(_) => {}
        }
        self
    }

    /// The `type` discriminant as authored
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Move(_) => "move",
            Step::Delay(_) => "delay",
            Step::Parallel(_) => "parallel",
            Step::Vibrate(_) => "vibrate",
            Step::Callback(_) => "callback",
            Step::Hold(_) => "hold",
            Step::Label(_) => "label",
            Step::Comment(_) => "comment",
            Step::Use(_) => "use",
            Step::Goto(_) => "goto",
            Step::Set(_) => "set",
            Step::Resume(_) => "resume",
            Step::Stop(_) => "stop",
            Step::IfJump(_) => "ifJump",
            Step::IfThen(_) => "ifThen",
            Step::IfElse(_) => "ifElse",
            Step::IfEnd(_) => "ifEnd",
        }
    }

    /// The step's `label` field, whatever its role
    pub fn tag(&self) -> Option<&str> {
        match self {
            Step::Label(s) => Some(&s.label),
            Step::Goto(s) => Some(&s.label),
            Step::Move(s) => s.label.as_deref(),
            Step::Delay(s) => s.label.as_deref(),
            Step::Parallel(s) => s.label.as_deref(),
            Step::Vibrate(s) => s.label.as_deref(),
            Step::Callback(s) => s.label.as_deref(),
            Step::Hold(s) => s.label.as_deref(),
            Step::Comment(s) => s.label.as_deref(),
            Step::Use(s) => s.label.as_deref(),
            Step::Set(s) => s.label.as_deref(),
            Step::Resume(s) => s.label.as_deref(),
            Step::Stop(s) => s.label.as_deref(),
            Step::IfJump(s) => s.label.as_deref(),
            Step::IfThen(s) => s.label.as_deref(),
            Step::IfElse(s) => s.label.as_deref(),
            Step::IfEnd(s) => s.label.as_deref(),
        }
    }

    /// Label shown on the timeline for this step at `index`
    pub fn display_label(&self, index: usize) -> String {
        if let Some(tag) = self.tag().filter(|t| !t.is_empty()) {
            return tag.to_string();
        }
        if let Step::Callback(s) = self {
            return s.name.clone();
        }
        format!("{}-{}", self.kind(), index)
    }

    /// Name defined by a `label` step
    pub fn label_name(&self) -> Option<&str> {
        match self {
            Step::Label(s) => Some(&s.label),
            _ => None,
        }
    }

    /// Value targets this step writes to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Step::Move(s) => vec![s.tween.target.as_str()],
            Step::Set(s) => vec![s.target.as_str()],
            Step::Parallel(s) => s.targets.iter().map(|t| t.target.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Labels this step may jump to
    pub fn label_refs(&self) -> Vec<&str> {
        match self {
            Step::Goto(s) => vec![s.label.as_str()],
            Step::IfJump(s) => {
                let mut refs = vec![s.label_true.as_str()];
                if let Some(label_false) = &s.label_false {
                    refs.push(label_false.as_str());
                }
                refs
            }
            _ => Vec::new(),
        }
    }
}
