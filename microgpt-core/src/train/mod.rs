//! Training: one optimizer step at a time, or a whole run with progress events.
//!
//! [`train_step`] builds the loss graph for one sequence, back-propagates, applies an
//! [`Optimizer`] update with the linearly decayed learning rate, zeroes every gradient
//! and drops the step's graph. [`train`] loops that over the corpus and reports each
//! step (and periodic evaluations) to a callback that can stop the run.
//!
//! A diverging loss is reported as-is in [`StepInfo::loss`]; there is no clipping or
//! rollback, so reacting to NaN is up to the caller.

mod error;
mod eval;
mod gradcheck;
mod optimizer;
mod schedule;

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{forward, StateDict};

pub use error::TrainError;
pub use eval::{evaluate, evaluate_snapshot};
pub use gradcheck::check_gradients;
pub use optimizer::{Adam, AdamState, Optimizer, Sgd};
pub use schedule::{eval_interval, learning_rate_at, Ema};

/// Diagnostics of one training step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// 0-based step index.
    pub step: usize,
    pub num_steps: usize,
    /// Mean next-token loss of this step's sequence, before the update.
    pub loss: f64,
    /// Smoothed loss. [`train_step`] sets it to `loss`; [`train`] fills in the running average.
    pub smooth_loss: f64,
    /// Learning rate the update used.
    pub lr: f64,
}

/// Loss on the evaluation documents after a step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalInfo {
    pub step: usize,
    pub loss: f64,
    pub smooth_loss: f64,
}

/// Progress reported by [`train`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrainEvent {
    Step(StepInfo),
    Eval(EvalInfo),
}

/// How a [`train`] run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub steps_completed: usize,
    pub last_loss: Option<f64>,
    pub smooth_loss: Option<f64>,
    /// `true` when the run was stopped before `num_steps` by the abort flag or the callback.
    pub aborted: bool,
}

/// Shared stop request, checked between steps.
///
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the run to stop before its next step.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Settings of a [`train`] run besides the model, optimizer and corpus.
#[derive(Clone, Debug, Default)]
pub struct TrainOptions<'a> {
    pub num_steps: usize,
    /// Held-out sequences; evaluation is skipped when empty.
    pub eval_docs: &'a [Vec<usize>],
    pub abort: Option<AbortFlag>,
}

/// One step on `tokens`: forward, backward, update, zero gradients, drop the graph.
///
/// Either all of that happens or, on panic, the step should be treated as not having
/// happened.
///
/// # Panics
///
/// When `tokens` is shorter than two ids or holds an id outside the vocabulary (see
/// [`forward`]), or when `optimizer` was sized for a different model.
pub fn train_step<O>(
    state: &mut StateDict,
    optimizer: &mut O,
    tokens: &[usize],
    step: usize,
    num_steps: usize,
) -> StepInfo
where
    O: Optimizer + ?Sized,
{
    let loss = forward(state, tokens);
    let loss_value = state.graph().data(loss);
    state.graph_mut().backward(loss);

    let lr = learning_rate_at(optimizer.base_learning_rate(), step, num_steps);
    let (graph, params) = state.graph_and_params();
    optimizer.step(graph, params, step, lr);
    state.clear_graph();

    if !loss_value.is_finite() {
        warn!(step, loss = loss_value, "non-finite training loss");
    }
    debug!(step, num_steps, loss = loss_value, lr, "train step");
    StepInfo {
        step,
        num_steps,
        loss: loss_value,
        smooth_loss: loss_value,
        lr,
    }
}

fn check_docs(docs: &[Vec<usize>], vocab_size: usize) -> Result<(), TrainError> {
    for (index, tokens) in docs.iter().enumerate() {
        if tokens.len() < 2 {
            return Err(TrainError::SequenceTooShort {
                index,
                len: tokens.len(),
            });
        }
        if let Some(&token) = tokens.iter().find(|&&t| t >= vocab_size) {
            return Err(TrainError::InvalidToken {
                index,
                token,
                vocab_size,
            });
        }
    }
    Ok(())
}

/// Runs `options.num_steps` steps, taking sequence `step % docs.len()` at each step.
///
/// After every step `on_event` receives [`TrainEvent::Step`] with the running average
/// of the loss. When `options.eval_docs` is non-empty, it also receives
/// [`TrainEvent::Eval`] after step 0, at the end of every [`eval_interval`] steps and after the last
/// step. Returning [`ControlFlow::Break`] from `on_event`, or tripping
/// `options.abort`, stops the run between steps.
///
/// # Errors
///
/// Checked before the first step:
/// - [`TrainError::NoDocuments`] when `docs` is empty.
/// - [`TrainError::SequenceTooShort`] / [`TrainError::InvalidToken`] for an unusable sequence
///   (in `docs` or `options.eval_docs`).
/// - [`TrainError::StateMismatch`] when `optimizer` keeps state for a different parameter count.
pub fn train<O, F>(
    state: &mut StateDict,
    optimizer: &mut O,
    docs: &[Vec<usize>],
    options: &TrainOptions<'_>,
    mut on_event: F,
) -> Result<TrainSummary, TrainError>
where
    O: Optimizer + ?Sized,
    F: FnMut(TrainEvent) -> ControlFlow<()>,
{
    if docs.is_empty() {
        return Err(TrainError::NoDocuments);
    }
    check_docs(docs, state.vocab_size())?;
    check_docs(options.eval_docs, state.vocab_size())?;
    if let Some(actual) = optimizer.state_len() {
        if actual != state.num_params() {
            return Err(TrainError::StateMismatch {
                expected: state.num_params(),
                actual,
            });
        }
    }

    let num_steps = options.num_steps;
    let interval = eval_interval(num_steps);
    info!(
        num_steps,
        num_docs = docs.len(),
        num_eval_docs = options.eval_docs.len(),
        num_params = state.num_params(),
        "training started"
    );

    let mut loss_ema = Ema::new();
    let mut eval_ema = Ema::new();
    let mut summary = TrainSummary::default();
    for step in 0..num_steps {
        if options.abort.as_ref().is_some_and(AbortFlag::is_aborted) {
            info!(step, "training aborted");
            summary.aborted = true;
            break;
        }

        let tokens = &docs[step % docs.len()];
        let mut step_info = train_step(state, optimizer, tokens, step, num_steps);
        step_info.smooth_loss = loss_ema.update(step_info.loss);
        summary.steps_completed = step + 1;
        summary.last_loss = Some(step_info.loss);
        summary.smooth_loss = Some(step_info.smooth_loss);
        if on_event(TrainEvent::Step(step_info)).is_break() {
            summary.aborted = step + 1 < num_steps;
            break;
        }

        let last = step + 1 == num_steps;
        let eval_due = step == 0 || (step + 1) % interval == 0 || last;
        if !options.eval_docs.is_empty() && eval_due {
            let loss = evaluate(state, options.eval_docs);
            let eval_info = EvalInfo {
                step,
                loss,
                smooth_loss: eval_ema.update(loss),
            };
            info!(step, loss, smooth_loss = eval_info.smooth_loss, "evaluation");
            if on_event(TrainEvent::Eval(eval_info)).is_break() {
                summary.aborted = !last;
                break;
            }
        }
    }

    info!(
        steps_completed = summary.steps_completed,
        smooth_loss = summary.smooth_loss,
        aborted = summary.aborted,
        "training finished"
    );
    Ok(summary)
}
