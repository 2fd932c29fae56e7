use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netscout_agent::catalog::build_registry;
use netscout_agent::{
    AgentRuntime, InMemoryStore, LlmError, MemoryStore, ScriptedLlm, ToolDispatcher, TurnError,
};
use netscout_collectors::{CloudInventory, CollectorError, FirewallInventory};
use netscout_core::{Message, Record, SessionId, SystemDirective, ToolErrorKind, ToolPayload, ToolRequest};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

#[derive(Default)]
struct StubCloud {
    slow_vpcs: Option<Duration>,
}

#[async_trait]
impl CloudInventory for StubCloud {
    async fn list_vpcs(&self) -> Result<Vec<Record>, CollectorError> {
        if let Some(delay) = self.slow_vpcs {
            tokio::time::sleep(delay).await;
        }
        Ok(vec![record(json!({"vpcId": "vpc-0a1", "cidrBlock": "10.0.0.0/16"}))])
    }

    async fn list_subnets(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(vec![record(json!({"subnetId": "subnet-1", "vpcId": "vpc-0a1"}))])
    }

    async fn list_route_tables(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(vec![record(json!({
            "routeTableId": "rtb-0123",
            "vpcId": "vpc-0a1",
            "routeSet": [
                {"destinationCidrBlock": "10.0.0.0/16", "gatewayId": "local", "state": "active"},
                {"destinationCidrBlock": "0.0.0.0/0", "transitGatewayId": "tgw-0abc", "state": "active"}
            ]
        }))])
    }

    async fn list_network_interfaces(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_instances(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_security_groups(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_transit_gateway_route_tables(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_transit_gateway_vpc_attachments(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_transit_gateway_attachments(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn get_transit_gateway_routes(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<Record>, CollectorError> {
        assert_eq!(route_table_id, "tgw-rtb-0123");
        Ok(vec![
            record(json!({"destinationCidrBlock": "10.0.0.0/16", "state": "active"})),
            record(json!({"destinationCidrBlock": "10.9.0.0/16", "state": "blackhole"})),
            record(json!({"destinationCidrBlock": "10.8.0.0/16", "state": "pending"})),
        ])
    }

    async fn list_load_balancers(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_target_groups(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn get_target_group_health(
        &self,
        target_group_arn: &str,
    ) -> Result<Vec<Record>, CollectorError> {
        Err(CollectorError::Service {
            code: "TargetGroupNotFound".to_string(),
            message: format!("Target groups '{target_group_arn}' not found"),
        })
    }
}

struct StubFirewall;

#[async_trait]
impl FirewallInventory for StubFirewall {
    async fn list_policies(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(vec![record(json!({"name": "allow-web", "action": "allow"}))])
    }

    async fn list_zones(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_interfaces(&self) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }

    async fn list_routes(&self, _virtual_router: Option<&str>) -> Result<Vec<Record>, CollectorError> {
        Ok(Vec::new())
    }
}

struct Harness {
    runtime: Arc<AgentRuntime>,
    llm: Arc<ScriptedLlm>,
    memory: Arc<InMemoryStore>,
}

fn harness(llm: ScriptedLlm, cloud: StubCloud, max_cycles: u32) -> Harness {
    let registry = build_registry(Arc::new(cloud), Arc::new(StubFirewall)).expect("registry");
    let dispatcher = ToolDispatcher::new(Arc::new(registry), Duration::from_secs(5), 4);
    let llm = Arc::new(llm);
    let memory = Arc::new(InMemoryStore::new());

    let runtime = AgentRuntime::new(
        Arc::clone(&llm) as Arc<dyn netscout_agent::LlmClient>,
        dispatcher,
        Arc::clone(&memory) as Arc<dyn MemoryStore>,
        SystemDirective::default(),
        max_cycles,
    );
    Harness { runtime: Arc::new(runtime), llm, memory }
}

fn tool_call(id: &str, name: &str, arguments: Value) -> Message {
    Message::assistant(None, vec![ToolRequest::new(id, name, arguments)])
}

fn tool_payloads(conversation: &[Message]) -> Vec<(String, ToolPayload)> {
    conversation
        .iter()
        .filter_map(|message| match message {
            Message::ToolResult { request_id, payload, .. } => Some((request_id.0.clone(), payload.clone())),
            _ => None,
        })
        .collect()
}

fn assert_every_request_resolved(conversation: &[Message]) {
    let requested = conversation
        .iter()
        .flat_map(|message| message.tool_requests().iter().map(|request| request.id.0.clone()))
        .collect::<Vec<_>>();
    let resolved = tool_payloads(conversation).into_iter().map(|(id, _)| id).collect::<Vec<_>>();
    assert_eq!(requested, resolved, "each request id must have exactly one result");
}

fn assert_directive_only_at_start(conversation: &[Message]) {
    let positions = conversation
        .iter()
        .enumerate()
        .filter(|(_, message)| message.is_system())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    assert_eq!(positions, vec![0]);
}

#[tokio::test]
async fn route_question_runs_one_tool_round_then_answers() {
    let h = harness(
        ScriptedLlm::from_messages([
            tool_call("call_1", "list-route-tables", json!({})),
            Message::assistant_text("rtb-0123 sends 0.0.0.0/0 to tgw-0abc."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("route-question");

    let outcome = h
        .runtime
        .run_turn(&session, "Show me the routes for vpc-0a1", &CancellationToken::new())
        .await
        .expect("turn succeeds");

    assert_eq!(outcome.answer, "rtb-0123 sends 0.0.0.0/0 to tgw-0abc.");
    assert!(!outcome.degraded);
    assert_eq!(outcome.cycles, 1);

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    let roles = conversation.iter().map(Message::role).collect::<Vec<_>>();
    assert_eq!(roles, vec!["system", "human", "assistant", "tool_result", "assistant"]);
    assert_directive_only_at_start(&conversation);
    assert_every_request_resolved(&conversation);

    let payloads = tool_payloads(&conversation);
    match &payloads[0].1 {
        ToolPayload::Records { records } => assert_eq!(records[0]["routeTableId"], "rtb-0123"),
        other => panic!("expected records, got {other:?}"),
    }

    let seen = h.llm.conversations();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].len(), 2);
    assert_eq!(seen[1].len(), 4, "second reasoning step reads the appended results");
    for input in &seen {
        assert_directive_only_at_start(input);
    }
}

#[tokio::test]
async fn directive_is_not_repeated_on_later_turns() {
    let h = harness(
        ScriptedLlm::from_messages([
            Message::assistant_text("Hello."),
            Message::assistant_text("Still here."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("two-turns");
    let cancel = CancellationToken::new();

    h.runtime.run_turn(&session, "hi", &cancel).await.expect("first turn");
    h.runtime.run_turn(&session, "are you there?", &cancel).await.expect("second turn");

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    assert_eq!(conversation.len(), 5);
    assert_directive_only_at_start(&conversation);
    assert_directive_only_at_start(&h.llm.conversations()[1]);
}

#[tokio::test]
async fn transit_gateway_routes_keep_active_and_blackhole_only() {
    let h = harness(
        ScriptedLlm::from_messages([
            tool_call(
                "call_tgw",
                "get-transit-gateway-routes",
                json!({"transit_gateway_route_table_id": "tgw-rtb-0123"}),
            ),
            Message::assistant_text("10.9.0.0/16 is blackholed."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("tgw");

    h.runtime
        .run_turn(&session, "Why can't 10.0.1.5 reach 10.9.0.10?", &CancellationToken::new())
        .await
        .expect("turn succeeds");

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    match &tool_payloads(&conversation)[0].1 {
        ToolPayload::Records { records } => {
            let states = records.iter().map(|route| route["state"].clone()).collect::<Vec<_>>();
            assert_eq!(states, vec![json!("active"), json!("blackhole")]);
        }
        other => panic!("expected records, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_target_group_becomes_error_result_and_loop_continues() {
    let h = harness(
        ScriptedLlm::from_messages([
            tool_call("call_h", "get-target-group-health", json!({"target_group_arn": "arn:aws:bogus"})),
            Message::assistant_text("That target group does not exist."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("bad-arn");

    let outcome = h
        .runtime
        .run_turn(&session, "Is the firewall target group healthy?", &CancellationToken::new())
        .await
        .expect("tool errors do not fail the turn");

    assert_eq!(outcome.answer, "That target group does not exist.");
    assert_eq!(h.llm.call_count(), 2);

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    let payloads = tool_payloads(&conversation);
    assert_eq!(payloads[0].1.error_kind(), Some(ToolErrorKind::CollectorFailure));
}

#[tokio::test]
async fn unknown_tools_and_bad_arguments_are_reported_to_the_model() {
    let h = harness(
        ScriptedLlm::from_messages([
            Message::assistant(
                None,
                vec![
                    ToolRequest::new("call_a", "delete-vpc", json!({})),
                    ToolRequest::new("call_b", "get-transit-gateway-routes", json!({"id": "tgw-rtb-0123"})),
                    ToolRequest::new("call_c", "list-vpcs", json!({})),
                ],
            ),
            Message::assistant_text("One VPC found."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("bad-requests");

    h.runtime.run_turn(&session, "list vpcs", &CancellationToken::new()).await.expect("turn");

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    assert_every_request_resolved(&conversation);
    let kinds = tool_payloads(&conversation)
        .into_iter()
        .map(|(_, payload)| payload.error_kind())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![Some(ToolErrorKind::ToolNotFound), Some(ToolErrorKind::InvalidArguments), None]
    );
}

#[tokio::test]
async fn cycle_limit_produces_degraded_answer() {
    let h = harness(
        ScriptedLlm::from_messages((0..5).map(|index| {
            tool_call(&format!("call_{index}"), "list-subnets", json!({}))
        })),
        StubCloud::default(),
        2,
    );
    let session = SessionId::from("looping");

    let outcome = h
        .runtime
        .run_turn(&session, "keep looking", &CancellationToken::new())
        .await
        .expect("degraded turn still succeeds");

    assert!(outcome.degraded);
    assert_eq!(outcome.cycles, 2);
    assert_eq!(h.llm.call_count(), 2, "no model call after the limit");

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    assert_every_request_resolved(&conversation);
    let last = conversation.last().expect("final message");
    assert_eq!(last.role(), "assistant");
    assert!(last.tool_requests().is_empty());
    assert_eq!(last.text(), Some(outcome.answer.as_str()));
}

#[tokio::test]
async fn reasoning_failure_appends_nothing_for_the_call() {
    let h = harness(
        ScriptedLlm::new([Err(LlmError::Network("connection refused".to_string()))]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("llm-down");

    let error = h
        .runtime
        .run_turn(&session, "list vpcs", &CancellationToken::new())
        .await
        .expect_err("reasoning failure aborts the turn");

    assert!(matches!(error, TurnError::Reasoning(LlmError::Network(_))));
    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    let roles = conversation.iter().map(Message::role).collect::<Vec<_>>();
    assert_eq!(roles, vec!["system", "human"]);
}

#[tokio::test]
async fn empty_reply_is_a_reasoning_failure_and_session_stays_usable() {
    let h = harness(
        ScriptedLlm::from_messages([
            Message::assistant(Some("  ".to_string()), vec![]),
            Message::assistant_text("Recovered."),
        ]),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("empty-reply");
    let cancel = CancellationToken::new();

    let error = h.runtime.run_turn(&session, "list vpcs", &cancel).await.expect_err("empty reply");
    assert!(matches!(error, TurnError::Reasoning(LlmError::Malformed(_))));

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    let roles = conversation.iter().map(Message::role).collect::<Vec<_>>();
    assert_eq!(roles, vec!["system", "human"]);

    let outcome = h.runtime.run_turn(&session, "try again", &cancel).await.expect("next turn");
    assert_eq!(outcome.answer, "Recovered.");
    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    assert!(conversation
        .iter()
        .filter(|message| message.role() == "assistant")
        .all(|message| message.text().is_some() || !message.tool_requests().is_empty()));
}

#[tokio::test]
async fn cancellation_during_dispatch_resolves_every_request() {
    let h = harness(
        ScriptedLlm::from_messages([Message::assistant(
            None,
            vec![
                ToolRequest::new("call_fast", "list-subnets", json!({})),
                ToolRequest::new("call_slow", "list-vpcs", json!({})),
            ],
        )]),
        StubCloud { slow_vpcs: Some(Duration::from_secs(10)) },
        10,
    );
    let session = SessionId::from("cancelled");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let error = h.runtime.run_turn(&session, "list everything", &cancel).await.expect_err("cancelled");
    assert_eq!(error, TurnError::Cancelled);

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    assert_every_request_resolved(&conversation);
    let kinds = tool_payloads(&conversation)
        .into_iter()
        .map(|(_, payload)| payload.error_kind())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec![None, Some(ToolErrorKind::Cancelled)]);
}

#[tokio::test]
async fn turns_on_one_session_are_serialized() {
    let h = harness(
        ScriptedLlm::from_messages([
            Message::assistant_text("first answer"),
            Message::assistant_text("second answer"),
        ])
        .with_delay(Duration::from_millis(30)),
        StubCloud::default(),
        10,
    );
    let session = SessionId::from("shared");

    let first = {
        let runtime = Arc::clone(&h.runtime);
        let session = session.clone();
        tokio::spawn(async move { runtime.run_turn(&session, "one", &CancellationToken::new()).await })
    };
    let second = {
        let runtime = Arc::clone(&h.runtime);
        let session = session.clone();
        tokio::spawn(async move { runtime.run_turn(&session, "two", &CancellationToken::new()).await })
    };

    first.await.expect("join").expect("first turn");
    second.await.expect("join").expect("second turn");

    let conversation = h.memory.read(&session).await.expect("read").messages().to_vec();
    let roles = conversation.iter().map(Message::role).collect::<Vec<_>>();
    assert_eq!(roles, vec!["system", "human", "assistant", "human", "assistant"]);
}

#[tokio::test]
async fn read_only_tools_are_idempotent() {
    let h = harness(ScriptedLlm::default(), StubCloud::default(), 10);
    let request = ToolRequest::new("call_1", "list-firewall-policies", json!({}));

    let first = h.runtime.dispatcher().invoke(&request).await;
    let second = h.runtime.dispatcher().invoke(&request).await;

    assert!(!first.is_error());
    assert_eq!(first, second);
}
