use thiserror::Error;

use crate::flows::states::{LoopAction, LoopContext, LoopEvent, LoopState, TransitionOutcome};

pub trait LoopDefinition {
    fn initial_state(&self) -> LoopState;
    fn transition(
        &self,
        current: &LoopState,
        event: &LoopEvent,
        context: &LoopContext,
    ) -> Result<TransitionOutcome, LoopTransitionError>;
}

/// Reasoning and dispatching alternate until the model stops requesting tools.
#[derive(Clone, Debug, Default)]
pub struct ToolCallingLoop;

impl LoopDefinition for ToolCallingLoop {
    fn initial_state(&self) -> LoopState {
        LoopState::Reasoning
    }

    fn transition(
        &self,
        current: &LoopState,
        event: &LoopEvent,
        context: &LoopContext,
    ) -> Result<TransitionOutcome, LoopTransitionError> {
        transition_tool_calling(current, event, context)
    }
}

pub struct LoopEngine<F> {
    definition: F,
}

impl<F> LoopEngine<F>
where
    F: LoopDefinition,
{
    pub fn new(definition: F) -> Self {
        Self { definition }
    }

    pub fn initial_state(&self) -> LoopState {
        self.definition.initial_state()
    }

    pub fn apply(
        &self,
        current: &LoopState,
        event: &LoopEvent,
        context: &LoopContext,
    ) -> Result<TransitionOutcome, LoopTransitionError> {
        self.definition.transition(current, event, context)
    }
}

impl Default for LoopEngine<ToolCallingLoop> {
    fn default() -> Self {
        Self::new(ToolCallingLoop)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoopTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: LoopState, event: LoopEvent },
    #[error("cycle limit of {max_cycles} reached; another reasoning step is not allowed")]
    CycleLimitExceeded { max_cycles: u32 },
    #[error("cycle limit not reached ({cycles_completed} of {max_cycles} cycles completed)")]
    CycleLimitNotReached { cycles_completed: u32, max_cycles: u32 },
}

fn transition_tool_calling(
    current: &LoopState,
    event: &LoopEvent,
    context: &LoopContext,
) -> Result<TransitionOutcome, LoopTransitionError> {
    use LoopAction::{AppendDegradedAnswer, CallModel, DispatchTools, ReturnAnswer};
    use LoopEvent::{CycleLimitReached, FinalAnswerEmitted, ToolRequestsEmitted, ToolResultsAppended};
    use LoopState::{Dispatching, Done, Reasoning};

    let (to, actions) = match (current, event) {
        (Reasoning, ToolRequestsEmitted) => (Dispatching, vec![DispatchTools]),
        (Reasoning, FinalAnswerEmitted) => (Done, vec![ReturnAnswer]),
        (Dispatching, ToolResultsAppended) => {
            if context.cycle_limit_reached() {
                return Err(LoopTransitionError::CycleLimitExceeded {
                    max_cycles: context.max_cycles,
                });
            }
            (Reasoning, vec![CallModel])
        }
        (Dispatching, CycleLimitReached) => {
            if !context.cycle_limit_reached() {
                return Err(LoopTransitionError::CycleLimitNotReached {
                    cycles_completed: context.cycles_completed,
                    max_cycles: context.max_cycles,
                });
            }
            (Done, vec![AppendDegradedAnswer, ReturnAnswer])
        }
        _ => {
            return Err(LoopTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}
