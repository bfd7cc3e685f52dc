//! Mock notice board server for tests and demos.
//!
//! Serves `/signup`, `/signin` and `/notices` from memory. One account is
//! seeded: `demo@example.edu` / `password`.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{debug, info};

use crate::config::TOKEN_HEADER;

pub const DEMO_NAME: &str = "Demo User";
pub const DEMO_EMAIL: &str = "demo@example.edu";
pub const DEMO_PASSWORD: &str = "password";

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// How `/notices` should misbehave
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NoticesFailure {
    #[default]
    None,
    /// reply 200 with `success: false` and an optional message
    Reject(Option<String>),
    /// reply with http 500
    ServerError,
    /// reply 429 with `Retry-After: retry_after_secs` to the next `times`
    /// requests, then serve normally
    RateLimited { retry_after_secs: u64, times: u32 },
}

struct MockUser {
    name: String,
    password: String,
    token: String,
}

struct MockState {
    users: HashMap<String, MockUser>,
    notices: Vec<Value>,
    failure: NoticesFailure,
    notice_requests: u64,
    next_token: u64,
}

impl MockState {
    fn issue_token(&mut self) -> String {
        self.next_token += 1;
        format!("mock-token-{}", self.next_token)
    }

    fn token_valid(&self, token: &str) -> bool {
        !token.is_empty() && self.users.values().any(|user| user.token == token)
    }
}

/// Handle to a running mock server.
pub struct MockNoticeServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
    state: Arc<Mutex<MockState>>,
}

impl MockNoticeServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base url for a client, e.g. `http://127.0.0.1:40123`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }

    /// Replaces the notice list. Values are served as-is, so malformed records can be tested.
    pub fn set_notices(&self, notices: Vec<Value>) {
        self.state.lock().notices = notices;
    }

    pub fn set_failure(&self, failure: NoticesFailure) {
        self.state.lock().failure = failure;
    }

    /// Number of `/notices` requests received
    pub fn notice_requests(&self) -> u64 {
        self.state.lock().notice_requests
    }
}

#[derive(Clone)]
pub struct MockNoticeServer {
    state: Arc<Mutex<MockState>>,
}

impl MockNoticeServer {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            DEMO_EMAIL.to_string(),
            MockUser {
                name: DEMO_NAME.to_string(),
                password: DEMO_PASSWORD.to_string(),
                token: String::new(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(MockState {
                users,
                notices: sample_notices(),
                failure: NoticesFailure::None,
                notice_requests: 0,
                next_token: 0,
            })),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/signup", post(signup))
            .route("/signin", post(signin))
            .route("/notices", get(notices))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds `addr` and serves in a background task. Use port 0 to pick a free port.
    pub async fn start(addr: SocketAddr) -> Result<MockNoticeServerHandle, std::io::Error> {
        let server = Self::new();
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = server.router();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        info!(%addr, "mock notice server listening");
        Ok(MockNoticeServerHandle {
            addr,
            shutdown: shutdown_tx,
            task,
            state: server.state,
        })
    }
}

impl Default for MockNoticeServer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SignUpBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct SignInBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn reject(code: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (code, Json(json!({ "success": false, "message": message })))
}

async fn signup(State(state): State<Arc<Mutex<MockState>>>, Json(body): Json<SignUpBody>) -> ApiResult {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "All fields are required"));
    }
    let mut state = state.lock();
    if state.users.contains_key(&body.email) {
        return Err(reject(StatusCode::BAD_REQUEST, "User already exists"));
    }
    debug!(email = %body.email, "mock signup");
    state.users.insert(
        body.email.clone(),
        MockUser {
            name: body.name.clone(),
            password: body.password,
            token: String::new(),
        },
    );
    Ok(Json(json!({
        "success": true,
        "message": "User created successfully",
        "user": { "name": body.name, "email": body.email },
    })))
}

async fn signin(State(state): State<Arc<Mutex<MockState>>>, Json(body): Json<SignInBody>) -> ApiResult {
    let mut state = state.lock();
    let token = state.issue_token();
    let Some(user) = state
        .users
        .get_mut(&body.email)
        .filter(|user| user.password == body.password)
    else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    };
    user.token.clone_from(&token);
    debug!(email = %body.email, "mock signin");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": { "name": user.name, "email": body.email },
    })))
}

async fn notices(State(state): State<Arc<Mutex<MockState>>>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.notice_requests += 1;
    let authorized = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| state.token_valid(token));
    if !authorized {
        return reject(StatusCode::UNAUTHORIZED, "Not authorized").into_response();
    }
    if let NoticesFailure::RateLimited {
        retry_after_secs,
        times,
    } = &mut state.failure
        && *times > 0
    {
        *times -= 1;
        debug!(remaining = *times, "mock rate limit");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, retry_after_secs.to_string())],
            Json(json!({ "success": false, "message": "Too many requests" })),
        )
            .into_response();
    }
    match &state.failure {
        NoticesFailure::None | NoticesFailure::RateLimited { .. } => {
            Json(json!({ "success": true, "data": state.notices })).into_response()
        }
        NoticesFailure::Reject(Some(message)) => {
            Json(json!({ "success": false, "message": message })).into_response()
        }
        NoticesFailure::Reject(None) => Json(json!({ "success": false })).into_response(),
        NoticesFailure::ServerError => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Notices served by a fresh mock server
pub fn sample_notices() -> Vec<Value> {
    vec![
        json!({
            "_id": "n1",
            "title": "Mid-semester exam schedule",
            "content": "<p>Exams run from <b>March 10</b> to March 14.</p><p>Seating plans &amp; rooms are attached.</p>",
            "category": "Academic",
            "isImportant": true,
            "createdAt": "2026-03-01T09:30:00.000Z",
            "fileUrl": "https://cdn.example.edu/notices/exam-poster.png",
            "fileType": "image",
            "files": [
                { "url": "https://cdn.example.edu/notices/seating.pdf", "originalName": "seating.pdf",
                  "fileType": "pdf", "mimetype": "application/pdf" }
            ]
        }),
        json!({
            "_id": "n2",
            "title": "Spring cultural fair",
            "content": "<p>Stalls open at 10am on the main lawn.</p>",
            "category": "Events",
            "isImportant": false,
            "createdAt": "2026-03-03T14:00:00.000Z",
            "files": [
                { "url": "https://cdn.example.edu/notices/fair-1.jpg", "fileType": "image" },
                { "url": "https://cdn.example.edu/notices/fair-2.webp?w=800", "mimetype": "image/webp" },
                { "url": "https://cdn.example.edu/notices/fair-1.jpg", "fileType": "image" }
            ]
        }),
        json!({
            "_id": "n3",
            "title": "Library hours extended",
            "content": "The library stays open until midnight during exam week.",
            "category": "Academic",
            "createdAt": "2026-03-05T08:15:00.000Z"
        }),
        json!({
            "_id": "n4",
            "title": "Scholarship applications open",
            "content": "<p>Apply before <i>April 1</i>.</p>",
            "category": "Administrative",
            "isImportant": true,
            "createdAt": "2026-03-06T11:45:00.000Z",
            "files": [
                { "url": "https://cdn.example.edu/notices/form.docx", "originalName": "application-form.docx",
                  "mimetype": "application/vnd.openxmlformats-officedocument.wordprocessingml.document" },
                { "url": "https://cdn.example.edu/notices/guidelines.pdf" }
            ]
        }),
    ]
}
