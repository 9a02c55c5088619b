//! Planning: prompt admission, plan proposals and plan failures

use super::common::*;
use prophet_web::{Admission, MessageKind, RunPhase};
use prophet_web_sdk::{ClientError, PlanResponse};

fn success(title: &str, outcomes: &[&str]) -> PlanResponse {
    PlanResponse {
        status: "success".to_string(),
        title: Some(title.to_string()),
        outcomes: Some(outcomes.iter().map(|o| o.to_string()).collect()),
        message: None,
    }
}

fn failure(message: Option<&str>) -> PlanResponse {
    PlanResponse {
        status: "error".to_string(),
        message: message.map(str::to_string),
        ..Default::default()
    }
}

fn last_error(orch: &prophet_web::RunOrchestrator) -> String {
    match &orch.transcript().last().unwrap().kind {
        MessageKind::Error { content } => content.clone(),
        other => panic!("expected error message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plan_success_appends_user_and_plan() {
    let (backend, mut orch) = orchestrator(ScriptedBackend::new().with_plan(Ok(success(
        "Will it rain tomorrow in City X?",
        &["Yes", "No"],
    ))));

    let admission = orch.plan("Will it rain tomorrow?", &settings()).await;

    assert_eq!(admission, Admission::Accepted);
    assert_eq!(orch.transcript().len(), 2);
    assert_eq!(
        orch.transcript()[0].kind,
        MessageKind::User {
            content: "Will it rain tomorrow?".to_string()
        }
    );
    assert_eq!(
        orch.transcript()[1].kind,
        MessageKind::Plan {
            title: "Will it rain tomorrow in City X?".to_string(),
            outcomes: vec!["Yes".to_string(), "No".to_string()],
        }
    );
    assert_eq!(orch.phase(), RunPhase::PlanReady);
    assert!(!orch.is_busy());

    let requests = backend.plan_requests.lock().unwrap();
    assert_eq!(requests[0].settings, settings());
}

#[tokio::test]
async fn test_prompt_is_trimmed() {
    let (backend, mut orch) =
        orchestrator(ScriptedBackend::new().with_plan(Ok(success("Q?", &["A", "B"]))));

    orch.plan("  Will it snow?\n", &settings()).await;

    assert_eq!(backend.plan_requests.lock().unwrap()[0].prompt, "Will it snow?");
}

#[tokio::test]
async fn test_error_status_uses_server_message() {
    let (_, mut orch) = orchestrator(
        ScriptedBackend::new().with_plan(Ok(failure(Some("That is not a forecastable question.")))),
    );

    orch.plan("hello", &settings()).await;

    assert_eq!(last_error(&orch), "That is not a forecastable question.");
    assert_eq!(orch.phase(), RunPhase::Idle);
    assert_eq!(orch.transcript().len(), 2);
}

#[tokio::test]
async fn test_error_status_without_message_uses_default() {
    let (_, mut orch) = orchestrator(ScriptedBackend::new().with_plan(Ok(failure(None))));

    orch.plan("hello", &settings()).await;

    assert_eq!(last_error(&orch), PlanResponse::DEFAULT_FAILURE);
    assert_eq!(orch.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn test_success_without_outcomes_is_a_failure() {
    let (_, mut orch) = orchestrator(ScriptedBackend::new().with_plan(Ok(success("Q?", &[]))));

    orch.plan("hello", &settings()).await;

    assert_eq!(last_error(&orch), PlanResponse::DEFAULT_FAILURE);
    assert_eq!(orch.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn test_network_failure_reports_cause() {
    let (_, mut orch) = orchestrator(ScriptedBackend::new().with_plan(Err(
        ClientError::Network("connection refused".to_string()),
    )));

    orch.plan("hello", &settings()).await;

    assert_eq!(last_error(&orch), "Network error: connection refused");
    assert_eq!(orch.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn test_http_failure_reports_status() {
    let (_, mut orch) = orchestrator(ScriptedBackend::new().with_plan(Err(ClientError::Http {
        status: 500,
        body: "boom".to_string(),
    })));

    orch.plan("hello", &settings()).await;

    assert_eq!(
        last_error(&orch),
        "Failed to generate a forecasting plan: HTTP 500: boom"
    );
    assert_eq!(orch.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn test_new_prompt_allowed_after_plan_ready() {
    let (_, mut orch) = orchestrator(
        ScriptedBackend::new()
            .with_plan(Ok(success("First?", &["Yes", "No"])))
            .with_plan(Ok(success("Second?", &["Yes", "No"]))),
    );

    orch.plan("first", &settings()).await;
    let admission = orch.plan("second", &settings()).await;

    assert_eq!(admission, Admission::Accepted);
    assert_eq!(orch.transcript().len(), 4);
    assert_eq!(orch.phase(), RunPhase::PlanReady);
}

#[tokio::test]
async fn test_plan_rejected_while_running() {
    let (backend, mut orch) = orchestrator(
        ScriptedBackend::new().with_run("run-1", vec![step_start(0), step_start(1)]),
    );
    orch.start_run("Q?", &outcomes(), &settings()).await;
    assert_eq!(orch.phase(), RunPhase::Running);
    let before = orch.transcript().len();

    let admission = orch.plan("another question", &settings()).await;

    assert_eq!(admission, Admission::Rejected);
    assert_eq!(orch.transcript().len(), before);
    assert!(backend.plan_requests.lock().unwrap().is_empty());
}
