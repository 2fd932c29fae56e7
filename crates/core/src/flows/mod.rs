pub mod engine;
pub mod states;

pub use engine::{LoopDefinition, LoopEngine, LoopTransitionError, ToolCallingLoop};
pub use states::{LoopAction, LoopContext, LoopEvent, LoopState, TransitionOutcome};
