//! The step machine
//!
//! One machine executes one compiled program. Steps run strictly in
//! sequence: the execution state is locked for the whole of a step, so an
//! auto run, a manual `next_step` and `reset` never interleave mid-step.
//! Hold continuations live outside that lock so they can be released while
//! the held step still owns the state.

use crate::config::{MachineConfig, RunMode, VibrationMode};
use crate::error::{MachineError, MachineResult};
use crate::haptics::{Haptics, NoHaptics};
use crate::resolve::{resolve, resolve_condition, resolve_duration, resolve_number, resolve_to};
use crate::state::{ExecutionState, Flow};
use futures::future::try_join_all;
use indexmap::IndexMap;
use sl_callbacks::CallbackRegistry;
use sl_compiler::{CompiledProgram, CompiledStep};
use sl_core::step::Tween;
use sl_core::Step;
use sl_values::{Animation, ValueDriver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch, Mutex, Notify};
use tracing::{debug, info, info_span, instrument, trace, warn, Instrument};
use ulid::Ulid;

/// Position update published whenever a step begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPosition {
    pub index: usize,
    /// Display label of the step at `index`
    pub label: String,
}

/// Message releasing a pending hold
#[derive(Debug)]
struct Resume {
    /// Continue at this index instead of after the hold
    seek: Option<usize>,
}

/// How a call to `run` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    /// Cursor ran past the last step
    Completed,
    /// A `stop` step raised the stop flag
    Stopped,
    /// `stop()` or `reset()` superseded this run
    Cancelled,
}

/// Clears the running flag when a run ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Interpreter for a compiled program
pub struct StepMachine {
    program: Arc<CompiledProgram>,
    driver: Arc<dyn ValueDriver>,
    callbacks: Arc<CallbackRegistry>,
    haptics: Arc<dyn Haptics>,
    config: MachineConfig,

    /// Values restored by `reset()`
    initial_values: IndexMap<String, f64>,

    state: Mutex<ExecutionState>,
    hold: std::sync::Mutex<Option<oneshot::Sender<Resume>>>,
    /// Signalled whenever a hold registers its sender
    held: Notify,

    /// Bumped by `stop()` to cancel the active run
    epoch: AtomicU64,
    running: AtomicBool,

    position: watch::Sender<StepPosition>,
}

impl StepMachine {
    /// Create a machine over `program`
    ///
    /// The values the driver holds now become the initial values restored
    /// by `reset()`.
    pub fn new(
        program: Arc<CompiledProgram>,
        driver: Arc<dyn ValueDriver>,
        callbacks: Arc<CallbackRegistry>,
        config: MachineConfig,
    ) -> Self {
        let initial_values = driver
            .targets()
            .into_iter()
            .filter_map(|target| driver.get(&target).map(|value| (target, value)))
            .collect();

        let (position, _) = watch::channel(StepPosition {
            index: 0,
            label: program.display_label(0).unwrap_or_default(),
        });

        Self {
            program,
            driver,
            callbacks,
            haptics: Arc::new(NoHaptics),
            config,
            initial_values,
            state: Mutex::new(ExecutionState::new()),
            hold: std::sync::Mutex::new(None),
            held: Notify::new(),
            epoch: AtomicU64::new(0),
            running: AtomicBool::new(false),
            position,
        }
    }

    /// Override the values restored by `reset()`
    pub fn with_initial_values<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.initial_values = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn with_haptics(mut self, haptics: Arc<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn initial_values(&self) -> &IndexMap<String, f64> {
        &self.initial_values
    }

    /// Subscribe to position updates
    pub fn subscribe(&self) -> watch::Receiver<StepPosition> {
        self.position.subscribe()
    }

    /// Index of the step most recently begun
    pub fn current_index(&self) -> usize {
        self.position.borrow().index
    }

    /// Check if a `hold` step is waiting for `next_step`
    pub fn is_holding(&self) -> bool {
        self.hold_slot().is_some()
    }

    /// Check if an auto run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Copy of the registers, taken between steps
    pub async fn snapshot(&self) -> ExecutionState {
        self.state.lock().await.clone()
    }

    /// Run the program from the cursor
    ///
    /// Resolves when the run completes, hits a `stop` step, or is cancelled
    /// by `stop()`. With looping enabled, completion restarts the program
    /// instead. Does nothing in manual mode.
    pub async fn start(&self) -> MachineResult<()> {
        if self.config.mode == RunMode::Manual {
            debug!("Manual mode, start ignored");
            return Ok(());
        }

        // Any stop() after this point cancels the run
        let epoch = self.epoch.load(Ordering::SeqCst);
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Machine already running");
            return Ok(());
        }
        let _running = RunningGuard(&self.running);

        let run_id = Ulid::new();
        let span = info_span!("run", run_id = %run_id, steps = self.program.len());
        self.drive(epoch).instrument(span).await
    }

    async fn drive(&self, epoch: u64) -> MachineResult<()> {
        self.state.lock().await.stopped = false;
        info!("Starting run");

        loop {
            let outcome = self.run(epoch).await?;

            if outcome == RunOutcome::Completed && self.config.looping && !self.program.is_empty() {
                let mut state = self.state.lock().await;
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("Run cancelled before loop restart");
                    return Ok(());
                }
                state.restart();
                drop(state);

                debug!("Looping to first step");
                tokio::task::yield_now().await;
                continue;
            }

            info!(?outcome, "Run finished");
            return Ok(());
        }
    }

    async fn run(&self, epoch: u64) -> MachineResult<RunOutcome> {
        loop {
            let mut state = self.state.lock().await;

            if self.epoch.load(Ordering::SeqCst) != epoch {
                return Ok(RunOutcome::Cancelled);
            }
            if state.stopped {
                return Ok(RunOutcome::Stopped);
            }
            if state.cursor >= self.program.len() {
                return Ok(RunOutcome::Completed);
            }

            self.execute(&mut state).await?;
        }
    }

    /// Stop the machine and restore the initial values
    ///
    /// A step already in flight finishes first; a pending hold is released.
    pub async fn stop(&self) {
        info!("Stopping machine");
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.reset().await;
    }

    /// Rewind to the first step and restore the initial values
    ///
    /// An active auto run continues from the first step.
    pub async fn reset(&self) {
        let mut state = self.lock_releasing_hold().await;
        *state = ExecutionState::new();

        for (target, value) in &self.initial_values {
            if let Err(e) = self.driver.set(target, *value) {
                warn!(target = %target, error = %e, "Failed to restore initial value");
            }
        }

        self.publish(0);
        debug!("Machine reset");
    }

    /// Advance by one step
    ///
    /// If a `hold` is pending it is released, continuing at `label` when one
    /// is given. Otherwise the step at the cursor (or at `label`) is executed;
    /// in manual mode the cursor wraps to the first step past the end.
    #[instrument(skip(self))]
    pub async fn next_step(&self, label: Option<&str>) -> MachineResult<()> {
        let seek = label.map(|l| self.label_index(l)).transpose()?;

        if self.program.is_empty() {
            return Ok(());
        }

        // A hold parking while we wait for the state is released instead
        let mut state = loop {
            let pending = self.hold_slot().take();
            if let Some(tx) = pending {
                debug!("Releasing hold");
                // Ignore send errors - the held run was already cancelled
                let _ = tx.send(Resume { seek });
                return Ok(());
            }

            tokio::select! {
                biased;
                state = self.state.lock() => break state,
                _ = self.held.notified() => {}
            }
        };
        if let Some(index) = seek {
            state.cursor = index;
        }
        if state.cursor >= self.program.len() {
            state.cursor = 0;
        }

        self.execute(&mut state).await?;

        if self.config.mode == RunMode::Manual && state.cursor >= self.program.len() {
            state.cursor = 0;
        }
        Ok(())
    }

    /// Execute the step at the cursor and move the cursor
    async fn execute(&self, state: &mut ExecutionState) -> MachineResult<()> {
        let index = state.cursor;
        let Some(compiled) = self.program.steps().get(index) else {
            return Ok(());
        };

        self.publish(index);
        trace!(index, kind = compiled.step.kind(), "Executing step");

        let flow = self.execute_step(&compiled.step, state).await?;
        state.cursor = match flow {
            Flow::Advance => index + 1,
            Flow::Jump(target) => target,
        };
        Ok(())
    }

    async fn execute_step(&self, step: &Step, state: &mut ExecutionState) -> MachineResult<Flow> {
        match step {
            Step::Move(s) => {
                let animation = self.animation(&s.tween).await?;
                self.driver.animate(&s.tween.target, animation).await?;
            }

            Step::Parallel(s) => {
                let batch = try_join_all(s.targets.iter().map(|tween| async move {
                    let animation = self.animation(tween).await?;
                    Ok::<_, MachineError>((tween.target.clone(), animation))
                }))
                .await?;

                debug!(count = batch.len(), "Running parallel animations");
                self.driver.animate_batch(batch).await?;
            }

            Step::Delay(s) => {
                let duration = resolve_duration(&self.callbacks, &s.duration).await?;
                debug!("Delaying for {:?}", duration);
                tokio::time::sleep(duration).await;
            }

            Step::Vibrate(_) => {
                if self.config.vibration_mode == VibrationMode::Always || !state.vibrated {
                    state.vibrated = true;
                    self.haptics.vibrate().await;
                } else {
                    trace!("Vibration already fired this run");
                }
            }

            Step::Callback(s) => {
                let arg = match &s.value {
                    Some(value) => Some(resolve(&self.callbacks, value).await?),
                    None => None,
                };
                self.callbacks.call(&s.name, arg).await?;
            }

            Step::Hold(_) => return Ok(self.hold().await),

            Step::Label(_) | Step::Comment(_) | Step::IfEnd(_) => {}

            Step::Use(s) => {
                warn!(block = %s.block, "Unexpanded use step, skipping");
            }

            Step::Goto(s) => {
                let target = self.label_index(&s.label)?;
                state.return_address = Some(state.cursor + 1);
                return Ok(Flow::Jump(target));
            }

            Step::Resume(_) => match state.return_address.take() {
                Some(address) => return Ok(Flow::Jump(address)),
                None => warn!("Resume without a pending goto"),
            },

            Step::Set(s) => {
                let value = resolve_number(&self.callbacks, &s.value, "value").await?;
                self.driver.set(&s.target, value)?;
            }

            Step::Stop(_) => {
                debug!("Stop step reached");
                state.stopped = true;
            }

            Step::IfJump(s) => {
                if resolve_condition(&self.callbacks, &s.condition).await? {
                    return Ok(Flow::Jump(self.label_index(&s.label_true)?));
                }
                if let Some(label_false) = &s.label_false {
                    return Ok(Flow::Jump(self.label_index(label_false)?));
                }
            }

            Step::IfThen(s) => {
                if !resolve_condition(&self.callbacks, &s.condition).await? {
                    let target = skip_branch(self.program.steps(), state.cursor, true);
                    return Ok(Flow::Jump(target));
                }
            }

            Step::IfElse(_) => {
                let target = skip_branch(self.program.steps(), state.cursor, false);
                return Ok(Flow::Jump(target));
            }
        }

        Ok(Flow::Advance)
    }

    async fn animation(&self, tween: &Tween) -> MachineResult<Animation> {
        let to = resolve_to(&self.callbacks, self.driver.as_ref(), &tween.target, &tween.to).await?;
        let duration = resolve_duration(&self.callbacks, &tween.duration).await?;

        Ok(Animation {
            to,
            duration,
            easing: tween.easing.unwrap_or_default(),
            native: tween.native,
        })
    }

    /// Lock the state, releasing any hold that parks while we wait
    ///
    /// A held step owns the state lock, so a hold registered after the first
    /// release would otherwise never let go.
    async fn lock_releasing_hold(&self) -> tokio::sync::MutexGuard<'_, ExecutionState> {
        loop {
            // Dropping the sender wakes the held step
            drop(self.hold_slot().take());

            tokio::select! {
                biased;
                state = self.state.lock() => return state,
                _ = self.held.notified() => trace!("Hold registered during reset"),
            }
        }
    }

    /// Park until `next_step` releases the hold
    async fn hold(&self) -> Flow {
        let (tx, rx) = oneshot::channel();
        if self.hold_slot().replace(tx).is_some() {
            debug!("Replacing pending hold");
        }
        self.held.notify_one();
        debug!("Holding");

        match rx.await {
            Ok(Resume { seek: Some(index) }) => Flow::Jump(index),
            Ok(Resume { seek: None }) => Flow::Advance,
            Err(_) => {
                debug!("Hold released without resume");
                Flow::Advance
            }
        }
    }

    fn hold_slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<Resume>>> {
        self.hold.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label_index(&self, label: &str) -> MachineResult<usize> {
        self.program
            .label_index(label)
            .ok_or_else(|| MachineError::UnknownLabel(label.to_string()))
    }

    fn publish(&self, index: usize) {
        let label = self.program.display_label(index).unwrap_or_default();
        self.position.send_replace(StepPosition { index, label });
    }
}

/// Index just past the construct closing the branch opened at `from`
///
/// Nested `ifThen` blocks are skipped whole. With `stop_at_else`, an `ifElse`
/// at the same depth also closes the branch. Unmatched branches run to the
/// end of the program.
pub(crate) fn skip_branch(steps: &[CompiledStep], from: usize, stop_at_else: bool) -> usize {
    let mut depth = 0usize;

    for (i, compiled) in steps.iter().enumerate().skip(from + 1) {
        match compiled.step {
            Step::IfThen(_) => depth += 1,
            Step::IfElse(_) if depth == 0 && stop_at_else => return i + 1,
            Step::IfEnd(_) if depth == 0 => return i + 1,
            Step::IfEnd(_) => depth -= 1,
            _ => {}
        }
    }

    steps.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_compiler::{compile, CompileOptions};
    use sl_core::Scenario;

    fn program(steps: Vec<Step>) -> CompiledProgram {
        let options = CompileOptions::default().collect_errors();
        compile(&Scenario::from(steps), &options).unwrap().program
    }

    #[test]
    fn test_skip_to_else() {
        let p = program(vec![
            Step::if_then(false),
            Step::comment("then"),
            Step::if_else(),
            Step::comment("else"),
            Step::if_end(),
        ]);
        assert_eq!(skip_branch(p.steps(), 0, true), 3);
        assert_eq!(skip_branch(p.steps(), 2, false), 5);
    }

    #[test]
    fn test_skip_nested() {
        let p = program(vec![
            Step::if_then(false),
            Step::if_then(true),
            Step::if_else(),
            Step::if_end(),
            Step::comment("after inner"),
            Step::if_end(),
            Step::comment("after outer"),
        ]);
        assert_eq!(skip_branch(p.steps(), 0, true), 6);
        assert_eq!(skip_branch(p.steps(), 1, true), 3);
    }

    #[test]
    fn test_skip_unmatched() {
        let p = program(vec![Step::if_then(false), Step::comment("dangling")]);
        assert_eq!(skip_branch(p.steps(), 0, true), 2);
    }
}
