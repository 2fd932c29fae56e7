use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use netscout_core::flows::LoopAction;
use netscout_core::{
    ApplicationError, DomainError, LoopContext, LoopEngine, LoopEvent, LoopState,
    LoopTransitionError, Message, SessionId, SystemDirective, ToolCallingLoop, ToolDefinition,
    ToolRequest, ToolRequestId,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::ToolDispatcher;
use crate::llm::{LlmClient, LlmError};
use crate::memory::{MemoryError, MemoryStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub answer: String,
    /// True when the cycle limit ended the turn instead of the model.
    pub degraded: bool,
    pub cycles: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("input is empty")]
    EmptyInput,
    #[error("reasoning step failed: {0}")]
    Reasoning(#[from] LlmError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("turn cancelled")]
    Cancelled,
}

impl From<LoopTransitionError> for TurnError {
    fn from(error: LoopTransitionError) -> Self {
        Self::Domain(DomainError::LoopTransition(error))
    }
}

impl From<TurnError> for ApplicationError {
    fn from(error: TurnError) -> Self {
        match error {
            TurnError::EmptyInput => {
                Self::Domain(DomainError::InvariantViolation("turn input is empty".to_string()))
            }
            TurnError::Reasoning(error) => Self::Reasoning(error.to_string()),
            TurnError::Memory(error) => Self::Storage(error.to_string()),
            TurnError::Domain(error) => Self::Domain(error),
            TurnError::Cancelled => Self::Cancelled,
        }
    }
}

/// Drives one session turn through the reasoning/dispatching loop.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    memory: Arc<dyn MemoryStore>,
    directive: SystemDirective,
    engine: LoopEngine<ToolCallingLoop>,
    max_cycles: u32,
    tools: Vec<ToolDefinition>,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        dispatcher: ToolDispatcher,
        memory: Arc<dyn MemoryStore>,
        directive: SystemDirective,
        max_cycles: u32,
    ) -> Self {
        let tools = dispatcher.registry().definitions();
        Self {
            llm,
            dispatcher,
            memory,
            directive,
            engine: LoopEngine::default(),
            max_cycles: max_cycles.max(1),
            tools,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn memory(&self) -> &Arc<dyn MemoryStore> {
        &self.memory
    }

    /// Appends `input` as a human message and runs until the model answers without tool
    /// requests, the cycle limit is reached, or `cancel` fires. Turns on the same session
    /// are serialized.
    pub async fn run_turn(
        &self,
        session: &SessionId,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let lock = self.session_lock(session).await;
        let guard = lock.lock().await;

        tracing::info!(
            event_name = "agent.turn.started",
            session_id = %session,
            max_cycles = self.max_cycles,
            "turn started"
        );

        let result = self.drive(session, input, cancel).await;
        match &result {
            Ok(outcome) => tracing::info!(
                event_name = "agent.turn.completed",
                session_id = %session,
                cycles = outcome.cycles,
                degraded = outcome.degraded,
                "turn completed"
            ),
            Err(error) => tracing::warn!(
                event_name = "agent.turn.failed",
                session_id = %session,
                error = %error,
                "turn failed"
            ),
        }

        drop(guard);
        self.release_session_lock(session, lock).await;
        result
    }

    async fn drive(
        &self,
        session: &SessionId,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let history = self.memory.read(session).await?;
        if history.is_empty() {
            self.memory.append(session, Message::system(self.directive.text())).await?;
        }
        self.memory.append(session, Message::human(input)).await?;

        let mut context = LoopContext::new(self.max_cycles);
        let mut state = self.engine.initial_state();
        let mut pending: Vec<ToolRequest> = Vec::new();
        let mut outcome: Option<TurnOutcome> = None;

        while state != LoopState::Done {
            match state {
                LoopState::Reasoning => {
                    let reply = self.reason(session, cancel).await?;
                    pending = reply.tool_requests().to_vec();
                    let event = if pending.is_empty() {
                        LoopEvent::FinalAnswerEmitted
                    } else {
                        LoopEvent::ToolRequestsEmitted
                    };
                    let answer = reply.text().unwrap_or_default().to_string();
                    self.memory.append(session, reply).await?;

                    let transition = self.engine.apply(&state, &event, &context)?;
                    if transition.actions.contains(&LoopAction::ReturnAnswer) {
                        outcome = Some(TurnOutcome {
                            answer,
                            degraded: false,
                            cycles: context.cycles_completed,
                        });
                    }
                    state = transition.to;
                }
                LoopState::Dispatching => {
                    tracing::debug!(
                        event_name = "agent.dispatch.started",
                        session_id = %session,
                        requests = pending.len(),
                        cycle = context.cycles_completed + 1,
                        "dispatching tool requests"
                    );
                    let batch = self.dispatcher.dispatch(&pending, cancel).await;
                    self.memory.append_all(session, batch.results).await?;
                    context.cycles_completed += 1;
                    if batch.cancelled {
                        return Err(TurnError::Cancelled);
                    }

                    let event = if context.cycle_limit_reached() {
                        LoopEvent::CycleLimitReached
                    } else {
                        LoopEvent::ToolResultsAppended
                    };
                    let transition = self.engine.apply(&state, &event, &context)?;
                    if transition.actions.contains(&LoopAction::AppendDegradedAnswer) {
                        let answer = self.degraded_answer();
                        tracing::warn!(
                            event_name = "agent.turn.degraded",
                            session_id = %session,
                            max_cycles = self.max_cycles,
                            "cycle limit reached before a final answer"
                        );
                        self.memory.append(session, Message::assistant_text(answer.clone())).await?;
                        outcome = Some(TurnOutcome {
                            answer,
                            degraded: true,
                            cycles: context.cycles_completed,
                        });
                    }
                    state = transition.to;
                }
                LoopState::Done => {}
            }
        }

        outcome.ok_or_else(|| {
            TurnError::Domain(DomainError::InvariantViolation(
                "loop finished without an answer".to_string(),
            ))
        })
    }

    /// One model call over the stored conversation. Nothing is appended on failure.
    async fn reason(&self, session: &SessionId, cancel: &CancellationToken) -> Result<Message, TurnError> {
        let conversation = self.memory.read(session).await?;
        let mut input = Vec::with_capacity(conversation.len() + 1);
        if !conversation.starts_with_system() {
            input.push(Message::system(self.directive.text()));
        }
        input.extend(conversation);

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            reply = self.llm.complete(&input, &self.tools) => reply?,
        };
        let blank = reply.text().map_or(true, |text| text.trim().is_empty());
        if blank && reply.tool_requests().is_empty() {
            let detail = "reply carried neither text nor tool requests".to_string();
            return Err(LlmError::Malformed(detail).into());
        }

        let reply = with_unique_request_ids(reply);
        tracing::debug!(
            event_name = "agent.reasoning.completed",
            session_id = %session,
            tool_requests = reply.tool_requests().len(),
            "model replied"
        );
        Ok(reply)
    }

    fn degraded_answer(&self) -> String {
        format!(
            "I stopped after {} rounds of tool calls without reaching a conclusion. The data \
             gathered so far is in this conversation; ask a narrower question or tell me to \
             continue.",
            self.max_cycles
        )
    }

    async fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        Arc::clone(locks.entry(session.clone()).or_default())
    }

    /// Drops the map entry once no other turn holds or waits on it.
    async fn release_session_lock(&self, session: &SessionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.session_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(session);
        }
    }
}

/// Replaces missing or repeated request ids with fresh ones.
fn with_unique_request_ids(message: Message) -> Message {
    match message {
        Message::Assistant { content, tool_requests } => {
            let mut seen = HashSet::new();
            let tool_requests = tool_requests
                .into_iter()
                .map(|mut request| {
                    if request.id.0.trim().is_empty() || !seen.insert(request.id.clone()) {
                        request.id = ToolRequestId::generate();
                        seen.insert(request.id.clone());
                    }
                    request
                })
                .collect();
            Message::Assistant { content, tool_requests }
        }
        other => other,
    }
}
