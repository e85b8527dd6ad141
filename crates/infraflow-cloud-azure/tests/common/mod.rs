use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use infraflow_cloud::{PollConfig, RetryConfig};
use infraflow_cloud_azure::{AzureConfig, AzureControlPlane};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// One canned reply from the fake Resource Manager
pub struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(status)
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub body: String,
}

#[derive(Default)]
struct FakeState {
    replies: VecDeque<Reply>,
    requests: Vec<Recorded>,
    token_requests: usize,
    reject_credentials: bool,
}

/// In-process stand-in for the identity provider and Resource Manager
pub struct FakeArm {
    pub base_url: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeArm {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .route("/{tenant}/oauth2/v2.0/token", post(token))
            .fallback(resource_manager)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn push(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn reject_credentials(&self) {
        self.state.lock().unwrap().reject_credentials = true;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn token_requests(&self) -> usize {
        self.state.lock().unwrap().token_requests
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn config(&self) -> AzureConfig {
        AzureConfig {
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            subscription_id: SUBSCRIPTION.to_string(),
            authority_host: self.base_url.clone(),
            resource_manager: self.base_url.clone(),
        }
    }

    pub fn control_plane(&self) -> AzureControlPlane {
        AzureControlPlane::new(&self.config(), fast_retry(), fast_poll())
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
    }
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    }
}

async fn token(State(state): State<Arc<Mutex<FakeState>>>) -> Response {
    let mut state = state.lock().unwrap();
    state.token_requests += 1;
    if state.reject_credentials {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })),
        )
            .into_response();
    }
    Json(json!({
        "token_type": "Bearer",
        "access_token": "fake-token",
        "expires_in": 3600
    }))
    .into_response()
}

async fn resource_manager(
    State(state): State<Arc<Mutex<FakeState>>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(Recorded {
        method,
        uri: uri.to_string(),
        body,
    });

    let Some(reply) = state.replies.pop_front() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": "Unscripted", "message": "no reply queued" } })),
        )
            .into_response();
    };

    let status = StatusCode::from_u16(reply.status).unwrap();
    let mut response = match reply.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    };
    for (name, value) in reply.headers {
        response.headers_mut().insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(&value).unwrap(),
        );
    }
    response
}

pub fn resource_group_path(name: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{name}")
}

pub fn resource_group_body(name: &str, location: &str, state: &str) -> Value {
    json!({
        "id": resource_group_path(name),
        "name": name,
        "location": location,
        "properties": { "provisioningState": state }
    })
}
