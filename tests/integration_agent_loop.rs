//! Agent loop integration tests
//!
//! Drives the full loop with a scripted model, a scripted registry, and a
//! scripted console.

use std::sync::Arc;

use dynloop::domain::{RunState, Session};
use dynloop::error::Result;
use dynloop::llm::{CompletionResponse, Message, MockLlmClient, Role, ToolCall, Usage};
use dynloop::registry::MockRegistry;
use dynloop::runner::{AgentRunner, RunEvent, RunnerConfig};
use dynloop::tools::{DEFAULT_BUILTINS, Dispatcher, ScriptedConsole, ToolContext, ToolKind};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct Harness {
    llm: Arc<MockLlmClient>,
    registry: Arc<MockRegistry>,
    console: Arc<ScriptedConsole>,
    session: Session,
    runner: AgentRunner<MockLlmClient>,
}

fn harness(turns: Vec<CompletionResponse>, registry: MockRegistry, max_iterations: u32) -> Harness {
    harness_with(MockLlmClient::new(turns), registry, ScriptedConsole::default(), max_iterations)
}

fn harness_with(llm: MockLlmClient, registry: MockRegistry, console: ScriptedConsole, max_iterations: u32) -> Harness {
    let llm = Arc::new(llm);
    let registry = Arc::new(registry);
    let console = Arc::new(console);

    let ctx = ToolContext::new(console.clone(), reqwest::Client::new());
    let dispatcher = Arc::new(Dispatcher::standard(registry.clone(), ctx));
    let session = Session::new("You call tools.", "help me", dispatcher.catalog_for(DEFAULT_BUILTINS));
    let config = RunnerConfig {
        max_iterations,
        ..Default::default()
    };
    let runner = AgentRunner::with_config(llm.clone(), dispatcher, config);

    Harness {
        llm,
        registry,
        console,
        session,
        runner,
    }
}

fn call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall::with_json(id, name, &args)
}

fn turn(calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse::tool_calls(calls)
}

fn search_body(tools: &[(&str, &str)]) -> String {
    let endpoints: Vec<Value> = tools
        .iter()
        .map(|(name, cuid)| {
            let tool = json!({
                "type": "function",
                "function": {
                    "name": name,
                    "description": format!("{} tool", name),
                    "parameters": {"type": "object", "properties": {}, "required": []}
                }
            });
            json!({"name": name, "cuid": cuid, "toolString": tool.to_string()})
        })
        .collect();
    json!([{ "endpoints": endpoints }]).to_string()
}

fn reservation_body() -> String {
    let tool = json!({
        "type": "function",
        "function": {
            "name": "reserve_restaurant",
            "description": "Reserve a table at a restaurant",
            "parameters": {
                "type": "object",
                "properties": {
                    "restaurant": {"type": "string"},
                    "date": {"type": "string"}
                },
                "required": ["restaurant", "date"]
            }
        }
    });
    json!([{"endpoints": [{"name": "reserve_restaurant", "cuid": "abc123", "toolString": tool.to_string()}]}])
        .to_string()
}

fn tool_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.role == Role::Tool).collect()
}

#[tokio::test]
async fn test_restaurant_reservation_flow() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![call(
                "s1",
                "search_tools",
                json!({"query": "book a restaurant reservation"}),
            )]),
            turn(vec![call(
                "r1",
                "reserve_restaurant",
                json!({"restaurant": "X", "date": "2024-08-24"}),
            )]),
            turn(vec![call("f1", "finish", json!({"answer": "Your reservation is booked."}))]),
        ],
        MockRegistry::new()
            .with_search(reservation_body())
            .with_execute(r#"{"confirmation": "R-42"}"#),
        20,
    );

    let outcome = h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(outcome.answer.as_deref(), Some("Your reservation is booked."));
    assert_eq!(outcome.iterations, 3);

    assert_eq!(h.registry.queries(), vec!["book a restaurant reservation"]);
    assert_eq!(
        h.registry.executed(),
        vec![("abc123".to_string(), json!({"restaurant": "X", "date": "2024-08-24"}))]
    );

    // The model saw the discovered tool on the turn after the search
    let requests = h.llm.requests();
    assert!(!requests[0].tools.iter().any(|t| t.name == "reserve_restaurant"));
    assert!(requests[1].tools.iter().any(|t| t.name == "reserve_restaurant"));

    let messages = h.session.transcript.messages();
    let observations = tool_messages(messages);
    assert_eq!(observations[0].content.as_deref(), Some(reservation_body().as_str()));
    assert_eq!(observations[1].content.as_deref(), Some(r#"{"confirmation": "R-42"}"#));
    assert_eq!(observations[2].content.as_deref(), Some("Your reservation is booked."));
    Ok(())
}

#[tokio::test]
async fn test_one_observation_per_call_in_order() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![
                call("a", "calculate", json!({"formula": "2+2"})),
                call("b", "teleport", json!({})),
                call("c", "calculate", json!({"formula": "3*3"})),
            ]),
            turn(vec![call("d", "finish", json!({"answer": "ok"}))]),
        ],
        MockRegistry::new(),
        20,
    );

    h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    let messages = h.session.transcript.messages();
    // system, user, assistant, 3 tools, assistant, 1 tool
    assert_eq!(messages.len(), 8);

    let ids: Vec<&str> = tool_messages(messages)
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);

    assert_eq!(messages[3].content.as_deref(), Some("4"));
    assert_eq!(messages[4].content.as_deref(), Some("Invalid function name: 'teleport'"));
    assert_eq!(messages[5].content.as_deref(), Some("9"));
    assert_eq!(messages[5].name.as_deref(), Some("calculate"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_tool_does_not_stop_loop() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![call("x", "book_flight", json!({"to": "BOS"}))]),
            turn(vec![call("y", "finish", json!({"answer": "could not book"}))]),
        ],
        MockRegistry::new(),
        20,
    );

    let outcome = h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(h.llm.call_count(), 2);
    let observations = tool_messages(h.session.transcript.messages());
    assert!(observations[0].content_str().contains("Invalid function name"));
    assert!(observations[0].content_str().contains("book_flight"));
    Ok(())
}

#[tokio::test]
async fn test_finish_abandons_remaining_calls() -> Result<()> {
    let mut h = harness(
        vec![turn(vec![
            call("f", "finish", json!({"answer": "done early"})),
            call("s", "search_tools", json!({"query": "anything"})),
        ])],
        MockRegistry::new().with_search(search_body(&[("late", "id-late")])),
        20,
    );

    let outcome = h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(h.llm.call_count(), 1);
    assert!(h.registry.queries().is_empty());
    assert_eq!(tool_messages(h.session.transcript.messages()).len(), 1);
    assert!(h.session.catalog.dynamic().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_budget_exhausted_after_exact_turns() -> Result<()> {
    let llm = MockLlmClient::repeating(turn(vec![call("c", "calculate", json!({"formula": "1 + 1"}))]));
    let mut h = harness_with(llm, MockRegistry::new(), ScriptedConsole::default(), 4);

    let outcome = h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert_eq!(outcome.state, RunState::BudgetExhausted);
    assert_eq!(outcome.iterations, 4);
    assert!(outcome.answer.is_none());
    assert_eq!(h.llm.call_count(), 4);
    assert_eq!(tool_messages(h.session.transcript.messages()).len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_second_search_replaces_dynamic_portion() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![call("s1", "search_tools", json!({"query": "weather"}))]),
            turn(vec![call("s2", "search_tools", json!({"query": "email"}))]),
            // weather_now is no longer offered but stays executable
            turn(vec![call("w", "weather_now", json!({"city": "Boston"}))]),
            turn(vec![call("f", "finish", json!({"answer": "sunny"}))]),
        ],
        MockRegistry::new()
            .with_search(search_body(&[("weather_now", "id-weather"), ("forecast", "id-forecast")]))
            .with_search(search_body(&[("send_email", "id-email")]))
            .with_execute("sunny"),
        20,
    );

    h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    let dynamic: Vec<&str> = h.session.catalog.dynamic().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(dynamic, vec!["send_email"]);
    assert!(h.session.catalog.dynamic().iter().all(|d| d.kind == ToolKind::Dynamic));
    assert_eq!(h.session.catalog.identifier_for("forecast"), Some("id-forecast"));

    assert_eq!(
        h.registry.executed(),
        vec![("id-weather".to_string(), json!({"city": "Boston"}))]
    );

    let requests = h.llm.requests();
    let offered: Vec<&str> = requests[2].tools.iter().map(|t| t.name.as_str()).collect();
    assert!(offered.contains(&"send_email"));
    assert!(!offered.contains(&"weather_now"));
    Ok(())
}

#[tokio::test]
async fn test_failed_search_keeps_previous_catalog() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![call("s1", "search_tools", json!({"query": "weather"}))]),
            turn(vec![call("s2", "search_tools", json!({"query": "email"}))]),
            turn(vec![call("f", "finish", json!({"answer": "ok"}))]),
        ],
        MockRegistry::new()
            .with_search(search_body(&[("weather_now", "id-weather")]))
            .with_search_failure(503),
        20,
    );

    h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    let dynamic: Vec<&str> = h.session.catalog.dynamic().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(dynamic, vec!["weather_now"]);

    let observations = tool_messages(h.session.transcript.messages());
    assert!(observations[1].content_str().contains("503"));

    let requests = h.llm.requests();
    assert_eq!(requests[1].tools, requests[2].tools);
    Ok(())
}

#[tokio::test]
async fn test_discovered_tool_cannot_shadow_builtin() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![call("s1", "search_tools", json!({"query": "math"}))]),
            turn(vec![call("c", "calculate", json!({"formula": "6 * 7"}))]),
            turn(vec![call("f", "finish", json!({"answer": "42"}))]),
        ],
        MockRegistry::new().with_search(search_body(&[("calculate", "remote-calc"), ("integrate", "id-int")])),
        20,
    );

    h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert!(h.registry.executed().is_empty());
    let observations = tool_messages(h.session.transcript.messages());
    assert_eq!(observations[1].content.as_deref(), Some("42"));
    assert_eq!(h.session.catalog.dynamic().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_bad_arguments_become_observation() -> Result<()> {
    let mut h = harness(
        vec![
            turn(vec![ToolCall::new("c1", "calculate", "{\"formula\": ")]),
            turn(vec![call("c2", "calculate", json!({"expression": "1+1"}))]),
            turn(vec![call("f", "finish", json!({"answer": "gave up"}))]),
        ],
        MockRegistry::new(),
        20,
    );

    let outcome = h.runner.run(&mut h.session, &CancellationToken::new()).await?;
    assert_eq!(outcome.state, RunState::Finished);

    let observations = tool_messages(h.session.transcript.messages());
    assert!(observations[0].content_str().starts_with("Error decoding function call `calculate`"));
    assert!(observations[1].content_str().contains("formula"));
    Ok(())
}

#[tokio::test]
async fn test_ask_human_reply_is_observation() -> Result<()> {
    let llm = MockLlmClient::new(vec![
        turn(vec![call("q", "ask_human", json!({"question": "For how many people?"}))]),
        turn(vec![call("f", "finish", json!({"answer": "table for 4"}))]),
    ]);
    let mut h = harness_with(llm, MockRegistry::new(), ScriptedConsole::new(["4"]), 20);

    h.runner.run(&mut h.session, &CancellationToken::new()).await?;

    assert_eq!(h.console.questions(), vec!["For how many people?"]);
    let observations = tool_messages(h.session.transcript.messages());
    assert_eq!(observations[0].content.as_deref(), Some("4"));
    Ok(())
}

#[tokio::test]
async fn test_events_and_usage() -> Result<()> {
    let mut first = turn(vec![call("c", "calculate", json!({"formula": "2**10"}))]);
    first.usage = Usage::new(100, 10);
    let mut second = turn(vec![call("f", "finish", json!({"answer": "1024"}))]);
    second.usage = Usage::new(120, 8);

    let llm = Arc::new(MockLlmClient::new(vec![first, second]));
    let dispatcher = Arc::new(Dispatcher::standard(
        Arc::new(MockRegistry::new()),
        ToolContext::new(Arc::new(ScriptedConsole::default()), reqwest::Client::new()),
    ));
    let mut session = Session::new("sys", "2^10?", dispatcher.catalog_for(DEFAULT_BUILTINS));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let runner = AgentRunner::new(llm, dispatcher).with_events(tx);

    let outcome = runner.run(&mut session, &CancellationToken::new()).await?;
    assert_eq!(outcome.usage, Usage::new(220, 18));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            RunEvent::TurnStarted { iteration: 1 },
            RunEvent::ToolSelected {
                call_id: "c".to_string(),
                name: "calculate".to_string(),
                arguments: json!({"formula": "2**10"}).to_string(),
            },
            RunEvent::Observation {
                call_id: "c".to_string(),
                name: "calculate".to_string(),
                content: "1024".to_string(),
                failed: false,
            },
            RunEvent::TurnStarted { iteration: 2 },
            RunEvent::ToolSelected {
                call_id: "f".to_string(),
                name: "finish".to_string(),
                arguments: json!({"answer": "1024"}).to_string(),
            },
            RunEvent::Observation {
                call_id: "f".to_string(),
                name: "finish".to_string(),
                content: "1024".to_string(),
                failed: false,
            },
            RunEvent::Finished {
                answer: "1024".to_string()
            },
        ]
    );
    Ok(())
}
