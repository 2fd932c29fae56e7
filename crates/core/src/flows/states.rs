use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Reasoning,
    Dispatching,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopEvent {
    ToolRequestsEmitted,
    FinalAnswerEmitted,
    ToolResultsAppended,
    CycleLimitReached,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopContext {
    pub cycles_completed: u32,
    pub max_cycles: u32,
}

impl LoopContext {
    pub fn new(max_cycles: u32) -> Self {
        Self { cycles_completed: 0, max_cycles }
    }

    pub fn cycle_limit_reached(&self) -> bool {
        self.cycles_completed >= self.max_cycles
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopAction {
    CallModel,
    DispatchTools,
    ReturnAnswer,
    AppendDegradedAnswer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: LoopState,
    pub to: LoopState,
    pub event: LoopEvent,
    pub actions: Vec<LoopAction>,
}
