//! Agent runtime: the tool-calling loop behind the troubleshooting assistant.
//!
//! A turn alternates between two steps until the model answers in plain text:
//! 1. **Reasoning** (`runtime`) sends the stored conversation and the tool projections
//!    to the model (`llm`) and appends its reply.
//! 2. **Dispatching** (`dispatcher`) runs every requested tool from the registry
//!    (`tools`, populated by `catalog`) and appends one result per request.
//!
//! # Key Types
//!
//! - `AgentRuntime` - turn driver, one serialized turn per session at a time
//! - `LlmClient` - pluggable model client (OpenAI-compatible, Anthropic, scripted)
//! - `ToolRegistry` - immutable name to handler table
//! - `MemoryStore` - append-only conversation persistence
//!
//! # Safety Principle
//!
//! Tools are read-only inventory lookups. A failing tool becomes an error-tagged result
//! for the model to reason about; it never aborts the turn.

pub mod catalog;
pub mod dispatcher;
pub mod llm;
pub mod memory;
pub mod runtime;
pub mod tools;
pub mod validation;

pub use dispatcher::{DispatchBatch, ToolDispatcher};
pub use llm::{LlmClient, LlmError, ScriptedLlm};
pub use memory::{Conversation, InMemoryStore, MemoryError, MemoryStore};
pub use runtime::{AgentRuntime, TurnError, TurnOutcome};
pub use tools::{RegistryError, ToolHandler, ToolRegistry};
