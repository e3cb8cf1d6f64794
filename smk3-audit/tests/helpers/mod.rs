//! Test helpers for smk3-audit integration tests
//!
//! - TestApp: router over a temp database and evidence folder
//! - StubModel: canned model reply with a call counter
//! - request builders for JSON and multipart bodies
//! - ErrorCounter: tracing layer counting smk3 ERROR events

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use smk3_audit::services::blob_store::BlobStore;
use smk3_audit::services::llm::{AnalysisRequest, AuditModel, LlmError};
use smk3_audit::{build_router, AppState};
use smk3_common::db::init_database;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use tracing_subscriber::layer::{Context, Layer};

pub const DEFAULT_REPLY: &str = "Status: Belum Sesuai\n\
Skor: 85\n\
Alasan: Kebijakan K3 tersedia dan ditandatangani direksi.\n\
Feedback Positif: Dokumen rapi.\n\
Saran Perbaikan: Lengkapi notulen RTM.";

/// Model double returning a fixed reply
pub struct StubModel {
    reply: Mutex<Result<String, String>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<AnalysisRequest>>,
}

impl StubModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(reply.to_string())),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditModel for StubModel {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &*self.reply.lock().unwrap() {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(LlmError::Api(503, message.clone())),
        }
    }
}

/// Counts ERROR-level events emitted from smk3 crates (HTTP trace events excluded)
#[derive(Clone, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == tracing::Level::ERROR && meta.target().starts_with("smk3") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Router over a fresh database; the temp dir lives as long as the app
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub model: Arc<StubModel>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::with_model(StubModel::replying(DEFAULT_REPLY)).await
    }

    pub async fn with_model(model: StubModel) -> Self {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let pool = init_database(&dir.path().join("smk3.db"))
            .await
            .expect("Should create test database");
        let blobs = BlobStore::new(dir.path().join("evidence"));
        let model = Arc::new(model);

        let state = AppState::new(
            pool,
            blobs,
            model.clone(),
            "integration-test-secret".to_string(),
            chrono::Duration::hours(1),
        );

        Self {
            router: build_router(state.clone()),
            state,
            model,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec(), headers)
    }

    /// Send and parse the body as JSON (`Value::Null` for an empty body)
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes, _) = self.send(request).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, body)
    }

    /// Register a user with `role` and return its bearer token
    pub async fn register(&self, email: &str, role: &str) -> String {
        let (status, body) = self
            .call(json_request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "name": email.split('@').next().unwrap_or(email),
                    "password": "rahasia123",
                    "role": role,
                })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Admin, auditor and auditee tokens
    pub async fn users(&self) -> (String, String, String) {
        (
            self.register("admin@pltu.id", "admin").await,
            self.register("auditor@pltu.id", "auditor").await,
            self.register("auditee@pltu.id", "auditee").await,
        )
    }

    pub async fn create_criterion(&self, token: &str, name: &str, order: i64) -> Value {
        let (status, body) = self
            .call(json_request(
                "POST",
                "/api/criteria",
                Some(token),
                Some(json!({ "name": name, "description": "", "order": order })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "create criterion failed: {}", body);
        body
    }

    pub async fn create_clause(
        &self,
        token: &str,
        criteria_id: &str,
        number: &str,
        title: &str,
        knowledge_base: &str,
    ) -> Value {
        let (status, body) = self
            .call(json_request(
                "POST",
                "/api/clauses",
                Some(token),
                Some(json!({
                    "criteria_id": criteria_id,
                    "clause_number": number,
                    "title": title,
                    "description": "Deskripsi klausul",
                    "knowledge_base": knowledge_base,
                })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "create clause failed: {}", body);
        body
    }

    pub async fn upload(&self, token: &str, clause_id: &str, filename: &str, data: &[u8]) -> Value {
        let (status, body) = self
            .call(multipart_request(
                &format!("/api/clauses/{}/upload", clause_id),
                token,
                filename,
                "text/plain",
                data,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
        body
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn multipart_request(
    uri: &str,
    token: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "smk3-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}
