//! Serialization tests for the protocol types.
//!
//! The web client depends on the exact JSON shapes, so these tests pin the
//! field names and enum tags.

use ac_protocol::*;
use uuid::Uuid;

#[test]
fn test_generate_request_camel_case() {
    let json = r#"{"projectName":"todo","projectDescription":"A todo app"}"#;
    let request: GenerateRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.project_name, "todo");
    assert_eq!(request.project_description, "A todo app");
}

#[test]
fn test_generate_request_missing_fields_default_to_empty() {
    let request: GenerateRequest = serde_json::from_str("{}").unwrap();
    assert!(request.project_name.is_empty());
    assert!(request.project_description.is_empty());
}

#[test]
fn test_step_serialization_shape() {
    let mut step = GenerationStep::pending(Role::Devops);
    step.status = StepStatus::InProgress;
    step.started_at = Some(1_700_000_000_000);

    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value["role"], "devops");
    assert_eq!(value["status"], "in_progress");
    assert_eq!(value["startedAt"], 1_700_000_000_000i64);
    assert!(value["tokensUsed"].is_null());
    assert!(value.get("tokens_used").is_none());
}

#[test]
fn test_generate_response_from_run() {
    let mut run = GenerationRun::new("demo", "demo project", 30);
    run.total_tokens_used = 120;
    run.generated_code = Some("// Project: demo".to_string());
    run.is_generating = false;

    let response = GenerateResponse::from(&run);
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["totalTokens"], 120);
    assert_eq!(value["generatedCode"], "// Project: demo");
    assert_eq!(value["runId"], run.id.to_string());
    assert!(value["steps"].as_array().unwrap().is_empty());
}

#[test]
fn test_run_event_tagging() {
    let run_id = Uuid::new_v4();
    let event = RunEvent::StepUpdated {
        run_id,
        step_id: Uuid::new_v4(),
        role: Role::Frontend,
        status: StepStatus::Failed,
    };

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "stepUpdated");
    assert_eq!(value["payload"]["role"], "frontend");
    assert_eq!(value["payload"]["status"], "failed");

    let back: RunEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
    assert_eq!(back.run_id(), Some(run_id));
}

#[test]
fn test_run_reset_event_has_no_run() {
    let value = serde_json::to_value(RunEvent::RunReset).unwrap();
    assert_eq!(value["type"], "runReset");
    assert_eq!(RunEvent::RunReset.run_id(), None);
}

#[test]
fn test_service_config_defaults_from_empty_toml() {
    let config: ServiceConfig = toml::from_str("").unwrap();
    assert_eq!(config.generation.estimate_multiplier, 10);
    assert!(config.agent.is_none());
    assert!(config.coder.is_none());
    assert_eq!(config.routing.role_weight, 2);
    assert!(!config.routing.agent_keywords.is_empty());
}

#[test]
fn test_service_config_backend_tables() {
    let toml_src = r#"
[generation]
token_allowance = 5000

[agent]
base_url = "https://api.example.com/latest"
agent_id = "agent-42"
max_poll_attempts = 60

[coder]
endpoint = "https://inference.example.com/models/coder"
temperature = 0.5
"#;
    let config: ServiceConfig = toml::from_str(toml_src).unwrap();
    assert_eq!(config.generation.token_allowance, Some(5000));

    let agent = config.agent.unwrap();
    assert_eq!(agent.agent_id, "agent-42");
    assert_eq!(agent.max_poll_attempts, 60);
    assert_eq!(agent.poll_interval_ms, 1000);
    assert_eq!(agent.api_key_env, "AUTOCREA_AGENT_API_KEY");

    let coder = config.coder.unwrap();
    assert_eq!(coder.max_new_tokens, 2048);
    assert!((coder.temperature - 0.5).abs() < f32::EPSILON);
}
