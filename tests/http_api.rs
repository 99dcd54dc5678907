//! End-to-end tests for the HTTP API: auth, task CRUD, user isolation,
//! chat turns with a scripted model, rate limiting, and session tokens.
//!
//! Everything runs against the real router with an in-memory database;
//! only the LLM is replaced by a scripted mock.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use taskpilot::agent::ChatService;
use taskpilot::config::{
    AgentConfig, AuthConfig, Config, DatabaseConfig, HttpConfig, LlmConfig, RateLimitConfig,
};
use taskpilot::db::connect_from_config;
use taskpilot::error::LlmError;
use taskpilot::history::Store;
use taskpilot::llm::{
    FinishReason, LlmProvider, ToolCall, ToolCompletionRequest, ToolCompletionResponse,
};
use taskpilot::server::auth::Claims;
use taskpilot::server::{AppState, build_router};
use taskpilot::tools::build_registry;

const SECRET: &str = "integration-test-secret";

// ---------------------------------------------------------------------------
// Scripted LLM
// ---------------------------------------------------------------------------

/// Returns canned responses in order; answers with plain text once the
/// script runs out.
struct ScriptedLlm {
    responses: Mutex<VecDeque<ToolCompletionResponse>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<ToolCompletionResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete_with_tools(
        &self,
        _req: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| text_response("All done.")))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

fn text_response(content: &str) -> ToolCompletionResponse {
    ToolCompletionResponse {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Stop,
        input_tokens: 10,
        output_tokens: 5,
    }
}

fn tool_call_response(name: &str, arguments: Value) -> ToolCompletionResponse {
    ToolCompletionResponse {
        content: None,
        tool_calls: vec![ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        }],
        finish_reason: FinishReason::ToolUse,
        input_tokens: 10,
        output_tokens: 5,
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn test_config(requests_per_minute: u32) -> Config {
    Config {
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        http: HttpConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        auth: AuthConfig {
            jwt_secret: SECRET.to_string().into(),
            session_ttl: Duration::from_secs(3600),
        },
        rate_limit: RateLimitConfig {
            requests_per_minute,
            requests_per_hour: 1000,
        },
        llm: LlmConfig {
            api_key: "unused".to_string().into(),
            base_url: "http://localhost:9".to_string(),
            model: "scripted-model".to_string(),
            request_timeout: Duration::from_secs(5),
            max_retries: 0,
        },
        agent: AgentConfig {
            max_tool_iterations: 8,
            history_limit: 50,
        },
    }
}

async fn test_router_with(llm: Arc<dyn LlmProvider>, config: Config) -> Router {
    let db = connect_from_config(&config.database).await.unwrap();
    let store = Store::new(db);
    let registry = Arc::new(build_registry(&store).unwrap());
    let chat = ChatService::new(store.clone(), llm, registry, &config.agent);
    build_router(AppState::new(store, chat, &config))
}

async fn test_router() -> Router {
    test_router_with(ScriptedLlm::new(Vec::new()), test_config(100)).await
}

fn bearer(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ---------------------------------------------------------------------------
// Health and auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_open_and_reports_database() {
    let router = test_router().await;

    for uri in ["/health", "/api/health"] {
        let (status, body) = send(&router, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }
}

#[tokio::test]
async fn api_rejects_missing_and_invalid_tokens() {
    let router = test_router().await;

    let (status, _) = send(&router, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&router, "GET", "/api/tasks", Some("Bearer junk"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_key = {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some other secret"),
        )
        .unwrap()
    };
    let (status, _) = send(
        &router,
        "GET",
        "/api/tasks",
        Some(&format!("Bearer {wrong_key}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Task CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn task_crud_flow() {
    let router = test_router().await;
    let auth = bearer("alice");

    let (status, created) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&auth),
        Some(json!({ "title": "  Buy milk  ", "description": "2 liters" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Buy milk");
    assert_eq!(created["description"], "2 liters");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&router, "GET", &format!("/api/tasks/{id}"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, updated) = send(
        &router,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&auth),
        Some(json!({ "title": "Buy oat milk" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Buy oat milk");
    assert_eq!(updated["description"], "2 liters");

    let (status, completed) = send(
        &router,
        "POST",
        &format!("/api/tasks/{id}/complete"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["completed"], true);

    let (status, list) = send(&router, "GET", "/api/tasks?status=completed", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);

    let (status, _) = send(&router, "DELETE", &format!("/api/tasks/{id}"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, "GET", &format!("/api/tasks/{id}"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_validation_errors_are_bad_requests() {
    let router = test_router().await;
    let auth = bearer("alice");

    let (status, body) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&auth),
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&auth),
        Some(json!({ "title": "t".repeat(201) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "GET", "/api/tasks?status=bogus", Some(&auth), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Patching nothing is an error, not a no-op.
    let (status, created) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&auth),
        Some(json!({ "title": "real task" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();
    let (status, _) = send(
        &router,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&auth),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tasks_are_isolated_per_user() {
    let router = test_router().await;
    let alice = bearer("alice");
    let bob = bearer("bob");

    let (_, created) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&alice),
        Some(json!({ "title": "alice's task" })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&router, "GET", &format!("/api/tasks/{id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/tasks/{id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&router, "GET", "/api/tasks", Some(&bob), None).await;
    assert_eq!(list["count"], 0);

    // Alice's task is untouched.
    let (status, _) = send(&router, "GET", &format!("/api/tasks/{id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_turn_with_tool_call_creates_task_and_conversation() {
    let llm = ScriptedLlm::new(vec![
        tool_call_response("add_task", json!({ "title": "Walk the dog" })),
        text_response("Added \"Walk the dog\" to your list."),
    ]);
    let router = test_router_with(llm, test_config(100)).await;
    let auth = bearer("alice");

    let (status, reply) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&auth),
        Some(json!({ "message": "remind me to walk the dog" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "Added \"Walk the dog\" to your list.");
    assert_eq!(reply["model"], "scripted-model");
    assert_eq!(reply["tool_calls"].as_array().unwrap().len(), 1);
    assert_eq!(reply["tool_calls"][0]["name"], "add_task");
    let conversation_id = reply["conversation_id"].as_str().unwrap().to_string();

    // The tool really persisted the task for this user.
    let (_, list) = send(&router, "GET", "/api/tasks", Some(&auth), None).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["tasks"][0]["title"], "Walk the dog");

    // Both sides of the exchange were recorded.
    let (status, messages) = send(
        &router,
        "GET",
        &format!("/api/conversations/{conversation_id}/messages"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    // And the conversation shows up, titled from the first message.
    let (_, conversations) = send(&router, "GET", "/api/conversations", Some(&auth), None).await;
    let summaries = conversations.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["title"], "remind me to walk the dog");
    assert_eq!(summaries[0]["message_count"], 2);
}

#[tokio::test]
async fn chat_continues_an_existing_conversation() {
    let router = test_router().await;
    let auth = bearer("alice");

    let (_, first) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&auth),
        Some(json!({ "message": "hello" })),
    )
    .await;
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();

    let (status, second) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&auth),
        Some(json!({ "message": "still there?", "conversation_id": conversation_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversation_id"].as_str().unwrap(), conversation_id);

    let (_, messages) = send(
        &router,
        "GET",
        &format!("/api/conversations/{conversation_id}/messages"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(messages["messages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn chat_rejects_blank_messages_and_foreign_conversations() {
    let router = test_router().await;
    let alice = bearer("alice");
    let bob = bearer("bob");

    let (status, _) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&alice),
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, reply) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&alice),
        Some(json!({ "message": "hi" })),
    )
    .await;
    let conversation_id = reply["conversation_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&bob),
        Some(json!({ "message": "hi", "conversation_id": conversation_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_is_rate_limited_per_user() {
    let router = test_router_with(ScriptedLlm::new(Vec::new()), test_config(1)).await;
    let alice = bearer("alice");
    let bob = bearer("bob");

    let (status, _) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&alice),
        Some(json!({ "message": "one" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&alice),
        Some(json!({ "message": "two" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["retry_after_secs"].as_u64().unwrap() >= 1);

    // The limit is per user, not global.
    let (status, _) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&bob),
        Some(json!({ "message": "one" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Conversations and sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conversations_can_be_created_listed_and_deleted() {
    let router = test_router().await;
    let alice = bearer("alice");
    let bob = bearer("bob");

    let (status, created) = send(&router, "POST", "/api/conversations", Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["title"].is_null());

    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/conversations/{id}/messages"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/conversations/{id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/conversations/{id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, conversations) = send(&router, "GET", "/api/conversations", Some(&alice), None).await;
    assert_eq!(conversations.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn message_pagination_pages_backwards() {
    let router = test_router().await;
    let auth = bearer("alice");

    let (_, first) = send(
        &router,
        "POST",
        "/api/chat",
        Some(&auth),
        Some(json!({ "message": "one" })),
    )
    .await;
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();
    for message in ["two", "three"] {
        let (status, _) = send(
            &router,
            "POST",
            "/api/chat",
            Some(&auth),
            Some(json!({ "message": message, "conversation_id": conversation_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 6 messages total; a page of 4 leaves more behind.
    let (status, page) = send(
        &router,
        "GET",
        &format!("/api/conversations/{conversation_id}/messages?limit=4"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"].as_array().unwrap().len(), 4);
    assert_eq!(page["has_more"], true);

    let oldest = page["messages"][0]["created_at"].as_str().unwrap();
    let (status, rest) = send(
        &router,
        "GET",
        &format!("/api/conversations/{conversation_id}/messages?before={oldest}"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(rest["messages"].as_array().unwrap().len() <= 2);
    assert_eq!(rest["has_more"], false);
}

#[tokio::test]
async fn session_tokens_are_issued_per_user() {
    let router = test_router().await;
    let auth = bearer("alice");

    let (status, session) = send(&router, "POST", "/api/chat/session", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);

    let secret = session["client_secret"].as_str().unwrap();
    assert_eq!(secret.len(), 64);
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));

    let expires_at: chrono::DateTime<chrono::Utc> =
        session["expires_at"].as_str().unwrap().parse().unwrap();
    assert!(expires_at > chrono::Utc::now());

    let (_, other) = send(&router, "POST", "/api/chat/session", Some(&auth), None).await;
    assert_ne!(other["client_secret"].as_str().unwrap(), secret);
}
