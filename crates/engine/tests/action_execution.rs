mod support;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use actionkit_engine::{
    Action, ActionDefinition, CachedFieldDefinition, ExecuteInput, PerformOutput, StepStatus, compile, decompile,
};
use actionkit_types::{AutocompleteItem, AutocompletePagination, AutocompleteResponse, FieldDefinitions, HttpMethod};
use actionkit_util::http::{HttpError, RequestClient, ResponseEvent, build_path};
use futures_util::future::join_all;
use serde_json::{Value, json};
use support::{FakeTransport, runtime};

fn fields(value: Value) -> FieldDefinitions {
    serde_json::from_value(value).expect("field definitions")
}

fn echo_action(transport: &Arc<FakeTransport>) -> Action {
    let definition = ActionDefinition::new("Echo")
        .fields(fields(json!({ "id": { "label": "Id", "type": "string", "required": true } })))
        .perform(|_request: RequestClient, input: ExecuteInput| async move {
            Ok::<_, anyhow::Error>(PerformOutput::Json(input.payload))
        });
    Action::new(definition, runtime(transport))
}

#[tokio::test]
async fn echo_returns_payload_as_last_value() {
    let action = echo_action(&FakeTransport::new());
    let mut input = ExecuteInput::new(json!({}), json!({ "id": "x" }));

    let results = action.execute(&mut input).await.expect("execute");

    let outputs: Vec<_> = results.iter().map(|result| result.output.as_deref()).collect();
    assert_eq!(outputs, [Some("MapInput completed"), Some("Validate completed"), Some("Request completed")]);
    assert_eq!(results.last().map(|result| &result.value), Some(&json!({ "id": "x" })));
}

#[tokio::test]
async fn missing_required_field_raises_aggregated_error() {
    let action = echo_action(&FakeTransport::new());
    let mut input = ExecuteInput::new(json!({}), json!({}));

    let error = action.execute(&mut input).await.expect_err("missing id");

    let errors = error.error.as_validation().expect("validation error");
    assert_eq!(errors.fields(), vec!["id"]);
    assert!(errors.to_string().contains("'id'"));
}

#[tokio::test]
async fn validation_failure_never_calls_perform() {
    let performed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&performed);
    let definition = ActionDefinition::new("Strict")
        .fields(fields(json!({ "a": { "type": "string", "required": true } })))
        .perform(move |_request: RequestClient, _input: ExecuteInput| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>(PerformOutput::None) }
        });
    let action = Action::new(definition, runtime(&FakeTransport::new()));
    let mut input = ExecuteInput::new(json!({}), json!({ "a": null, "b": 5 }));

    let error = action.execute(&mut input).await.expect_err("invalid payload");

    assert_eq!(performed.load(Ordering::SeqCst), 0);
    assert_eq!(error.results.len(), 2);
    assert_eq!(error.results[1].status, StepStatus::Failed);
    assert_eq!(error.error.as_validation().map(|errors| errors.len()), Some(2));
}

#[tokio::test]
async fn mapping_runs_before_validation() {
    let action = echo_action(&FakeTransport::new());
    let mut input = ExecuteInput::new(json!({}), json!({ "userId": "u-1", "traits": {} }))
        .with_mapping(json!({ "id": { "@path": "$.userId" } }));

    let results = action.execute(&mut input).await.expect("execute");

    assert_eq!(results.last().map(|result| &result.value), Some(&json!({ "id": "u-1" })));
}

#[tokio::test]
async fn numeric_strings_are_coerced_before_perform() {
    let definition = ActionDefinition::new("Count")
        .fields(fields(json!({ "count": { "type": "number", "required": true } })))
        .perform(|_request: RequestClient, input: ExecuteInput| async move {
            Ok::<_, anyhow::Error>(PerformOutput::Json(input.payload))
        });
    let action = Action::new(definition, runtime(&FakeTransport::new()));
    let mut input = ExecuteInput::new(json!({}), json!({ "count": "42" }));

    let results = action.execute(&mut input).await.expect("execute");

    assert_eq!(results[2].value, json!({ "count": 42 }));
}

#[tokio::test]
async fn unregistered_autocomplete_field_is_empty() {
    let action = echo_action(&FakeTransport::new());

    for input in [ExecuteInput::default(), ExecuteInput::new(json!({ "apiKey": "k" }), json!({ "id": 1 }))] {
        let response = action.execute_autocomplete("listId", &input).await.expect("autocomplete");
        assert_eq!(serde_json::to_value(&response).expect("serialize"), json!({ "data": [], "pagination": {} }));
    }
}

#[tokio::test]
async fn autocomplete_runs_registered_resolver_outside_pipeline() {
    let transport = FakeTransport::new();
    transport.route(
        HttpMethod::Get,
        "https://api.example.com/accounts/acme%20inc/lists",
        200,
        json!([{ "id": 7, "name": "Newsletter" }]),
    );
    let definition = ActionDefinition::new("Subscribe").autocomplete(
        "listId",
        |request: RequestClient, input: ExecuteInput| async move {
            let variables = json!({ "account": input.settings["account"] });
            let path = build_path("accounts/{account}/lists", variables.as_object().expect("variables object"));
            let response = request.get(format!("https://api.example.com/{path}")).send().await?;
            let data = response
                .body
                .as_array()
                .into_iter()
                .flatten()
                .map(|list| AutocompleteItem {
                    label: list["name"].as_str().unwrap_or_default().to_string(),
                    value: list["id"].clone(),
                })
                .collect();
            Ok::<_, anyhow::Error>(AutocompleteResponse {
                data,
                pagination: AutocompletePagination { next_page: input.page },
            })
        },
    );
    let action = Action::new(definition, runtime(&transport));

    let response = action
        .execute_autocomplete("listId", &ExecuteInput::new(json!({ "account": "acme inc" }), Value::Null).with_page("2"))
        .await
        .expect("autocomplete");

    assert_eq!(response.data[0].label, "Newsletter");
    assert_eq!(response.pagination.next_page.as_deref(), Some("2"));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn response_events_are_republished_on_the_action() {
    let transport = FakeTransport::new();
    transport.route(HttpMethod::Post, "https://api.example.com/people", 201, json!({ "id": 9 }));
    transport.route(HttpMethod::Get, "https://api.example.com/orgs", 200, json!({ "id": 3 }));
    let definition = ActionDefinition::new("Create person")
        .cached_field(
            "organizationId",
            CachedFieldDefinition::new(
                |_: &ExecuteInput| "org".to_string(),
                Duration::from_secs(60),
                |request: RequestClient, _input: ExecuteInput| async move {
                    let response = request.get("https://api.example.com/orgs").send().await?;
                    Ok::<_, anyhow::Error>(Some(response.body["id"].clone()))
                },
            ),
        )
        .perform(|request: RequestClient, input: ExecuteInput| async move {
            let organization = input.cached_field("organizationId").cloned().unwrap_or(Value::Null);
            let response = request
                .post("https://api.example.com/people")
                .bearer_auth("secret-token")
                .json(&json!({ "org": organization }))
                .send()
                .await?;
            Ok::<_, anyhow::Error>(PerformOutput::Response(response))
        });
    let action = Action::new(definition, runtime(&transport));
    let events: Arc<Mutex<Vec<ResponseEvent>>> = Arc::default();
    let sink = Arc::clone(&events);
    action.subscribe(Arc::new(move |event: &ResponseEvent| {
        sink.lock().expect("events lock").push(event.clone());
    }));

    let results = action.execute(&mut ExecuteInput::default()).await.expect("execute");

    let events = events.lock().expect("events lock");
    let statuses: Vec<_> = events.iter().map(|event| event.response.status).collect();
    assert_eq!(statuses, [200, 201]);
    assert_eq!(events[1].request.method, HttpMethod::Post);
    assert_eq!(events[1].request.headers.get("authorization").map(String::as_str), Some("<redacted>"));
    assert_eq!(results.last().map(|result| &result.value), Some(&json!({ "id": 9 })));
    assert_eq!(transport.requests()[1].body, Some(json!({ "org": 3 })));
}

#[tokio::test]
async fn error_status_fails_the_run_after_publishing() {
    let transport = FakeTransport::new();
    transport.route(HttpMethod::Post, "https://api.example.com/track", 500, json!({ "error": "down" }));
    let definition = ActionDefinition::new("Track").perform(|request: RequestClient, _input: ExecuteInput| async move {
        let response = request.post("https://api.example.com/track").send().await?;
        Ok::<_, anyhow::Error>(PerformOutput::Response(response))
    });
    let action = Action::new(definition, runtime(&transport));
    let published = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&published);
    action.subscribe(Arc::new(move |_: &ResponseEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let error = action.execute(&mut ExecuteInput::default()).await.expect_err("500");

    assert_eq!(published.load(Ordering::SeqCst), 1);
    assert_eq!(error.error.http_error().and_then(HttpError::status), Some(500));
    assert_eq!(error.to_string(), "perform step failed");
}

#[tokio::test]
async fn concurrent_runs_share_one_action() {
    let action = Arc::new(echo_action(&FakeTransport::new()));

    let runs = (0..16).map(|index| {
        let action = Arc::clone(&action);
        async move {
            let mut input = ExecuteInput::new(json!({}), json!({ "id": format!("user-{index}") }));
            action.execute(&mut input).await.map(|results| results[2].value.clone())
        }
    });
    let outcomes = join_all(runs).await;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        assert_eq!(outcome.expect("run"), json!({ "id": format!("user-{index}") }));
    }
}

#[test]
fn compiled_action_schema_round_trips() {
    let declared = fields(json!({
        "email": { "type": "string", "required": true },
        "tags": { "type": "string", "multiple": true, "allowNull": true },
        "createdAt": { "type": "datetime" },
        "address": {
            "type": "object",
            "properties": { "city": { "type": "string", "required": true } }
        }
    }));

    let decompiled = decompile(&compile(&declared));

    for (name, field) in &declared {
        let restored = &decompiled[name];
        assert_eq!(restored.field_type, field.field_type, "{name} type");
        assert_eq!(restored.required, field.required, "{name} required");
        assert_eq!(restored.allow_null, field.allow_null, "{name} allowNull");
        assert_eq!(restored.multiple, field.multiple, "{name} multiple");
    }
}
