//! Execution registers

/// Cursor and registers owned by one machine
///
/// The pending hold continuation is kept next to this state rather than in
/// it, so that `next_step` can release a hold while the held step still owns
/// the state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionState {
    /// Index of the step to execute next
    pub cursor: usize,

    /// Resume point of the most recent `goto`; a later `goto` overwrites it
    pub return_address: Option<usize>,

    /// Whether a `vibrate` already fired during this run
    pub vibrated: bool,

    /// Raised by a `stop` step, checked between steps
    pub stopped: bool,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for another pass over the program
    pub(crate) fn restart(&mut self) {
        self.cursor = 0;
        self.return_address = None;
        self.vibrated = false;
    }
}

/// How the cursor moves after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the following step
    Advance,
    /// Continue at the given index
    Jump(usize),
}
