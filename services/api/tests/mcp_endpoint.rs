//! Drives the full router in-process: health, static files and the MCP
//! session lifecycle over `/mcp`.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use inkmatch_api::{config::Config, router::create_router, state::AppState};
use inkmatch_core::generation::ImageGenerator;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const IMAGE_URL: &str = "https://replicate.delivery/test/preview.png";
const WIDGET_HTML: &str = "<div id=\"root\"></div>";

struct FixedImage;

#[async_trait]
impl ImageGenerator for FixedImage {
    async fn generate(&self, _prompt: &str) -> Option<String> {
        Some(IMAGE_URL.to_string())
    }
}

struct TestApp {
    router: Router,
    _public: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let public = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("inkmatch-widget.html"), WIDGET_HTML).unwrap();
        std::fs::write(public.path().join("site.css"), "body {}").unwrap();

        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            replicate_api_token: None,
            inkmatch_url: "https://inkmatch.io".parse().unwrap(),
            public_dir: public.path().to_path_buf(),
            log_level: tracing::Level::INFO,
        };
        let state = AppState::with_generator(config, Arc::new(FixedImage)).unwrap();

        Self {
            router: create_router(Arc::new(state)),
            _public: public,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    async fn post(
        &self,
        session: Option<&str>,
        accept: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, accept);
        if let Some(id) = session {
            builder = builder.header("mcp-session-id", id);
        }
        self.send(builder.body(body.into()).unwrap()).await
    }

    async fn post_json(&self, session: Option<&str>, message: Value) -> (StatusCode, HeaderMap, Value) {
        let (status, headers, body) = self
            .post(session, "application/json", message.to_string())
            .await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, headers, value)
    }

    /// Initializes a session and completes the handshake.
    async fn open_session(&self) -> String {
        let (status, headers, body) = self.post_json(None, initialize_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["serverInfo"]["name"], "inkmatch");
        let id = headers
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .expect("session header")
            .to_string();

        let (status, _, _) = self
            .post_json(
                Some(&id),
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        id
    }

    async fn call(&self, session: &str, id: u64, method: &str, params: Value) -> Value {
        let (status, _, body) = self
            .post_json(
                Some(session),
                json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        body
    }
}

fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "0.1.0"}
        }
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_body(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn health_reports_app_and_version() {
    let app = TestApp::new();
    let (status, _, body) = app.send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"status": "ok", "app": "inkmatch", "version": "1.0.0"})
    );
}

#[tokio::test]
async fn preflight_answers_without_a_session() {
    let app = TestApp::new();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mcp")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = app.send(req).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "POST, GET, DELETE, OPTIONS"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, mcp-session-id"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_EXPOSE_HEADERS], "mcp-session-id");
}

#[tokio::test]
async fn static_files_are_served_from_the_public_dir() {
    let app = TestApp::new();

    let (status, headers, body) = app.send(get("/public/inkmatch-widget.html")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html");
    assert_eq!(body, WIDGET_HTML.as_bytes());

    let (status, headers, _) = app.send(get("/public/site.css")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/css");

    let (status, _, body) = app.send(get("/public/missing.js")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"message": "Not found"}));

    let (status, _, _) = app.send(get("/public/../Cargo.toml")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_and_methods_are_not_found() {
    let app = TestApp::new();

    let (status, _, body) = app.send(get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"message": "Not found"}));

    let req = Request::builder()
        .method(Method::PUT)
        .uri("/mcp")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.send(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn get_without_session_is_rejected() {
    let app = TestApp::new();
    let (status, headers, body) = app.send(get("/mcp")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({"message": "Missing or invalid session ID"})
    );
    assert_eq!(headers[header::ACCESS_CONTROL_EXPOSE_HEADERS], "mcp-session-id");
}

#[tokio::test]
async fn malformed_bodies_get_json_rpc_errors() {
    let app = TestApp::new();

    let (status, headers, body) = app.post(None, "application/json", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(&body),
        json!({"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}, "id": null})
    );

    let (status, _, body) = app.post_json(None, json!({"hello": "world"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let app = TestApp::new();
    let (status, headers, body) = app
        .post_json(None, json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers.get("mcp-session-id").is_none());
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["error"]["message"], "Bad Request: Server not initialized");

    // An unknown session id is treated the same way.
    let (status, _, body) = app
        .post_json(
            Some("inkmatch-0-zzzzzz"),
            json!({"jsonrpc": "2.0", "id": 8, "method": "tools/list"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32000);
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new();
    let session = app.open_session().await;
    assert!(session.starts_with("inkmatch-"));

    let tools = app.call(&session, 2, "tools/list", json!({})).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "generate_tattoo_preview",
            "explore_tattoo_styles",
            "recommend_tattoo_style"
        ]
    );

    let preview = app
        .call(
            &session,
            3,
            "tools/call",
            json!({
                "name": "generate_tattoo_preview",
                "arguments": {"style": "japanese", "meaning": "resilience", "placement": "forearm"}
            }),
        )
        .await;
    let structured = &preview["result"]["structuredContent"];
    assert_eq!(structured["style"], "Japanese / Irezumi");
    assert_eq!(structured["image_url"], IMAGE_URL);
    assert_eq!(structured["generated"], true);
    assert_eq!(structured["color_preference"], "black_and_gray");
    assert_eq!(
        preview["result"]["_meta"]["openai/outputTemplate"],
        "ui://widget/inkmatch.html"
    );

    let invalid = app
        .call(
            &session,
            4,
            "tools/call",
            json!({"name": "generate_tattoo_preview", "arguments": {"style": "pointillism"}}),
        )
        .await;
    assert_eq!(invalid["error"]["code"], -32602);

    let widget = app
        .call(
            &session,
            5,
            "resources/read",
            json!({"uri": "ui://widget/inkmatch.html"}),
        )
        .await;
    assert_eq!(widget["result"]["contents"][0]["text"], WIDGET_HTML);
    assert_eq!(
        widget["result"]["contents"][0]["mimeType"],
        "text/html+skybridge"
    );

    let (status, _, body) = app.post_json(Some(&session), initialize_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 1);

    let delete = || {
        Request::builder()
            .method(Method::DELETE)
            .uri("/mcp")
            .header("mcp-session-id", session.as_str())
            .body(Body::empty())
            .unwrap()
    };
    let (status, _, _) = app.send(delete()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"message": "Session not found"}));

    let (status, _, body) = app
        .post_json(
            Some(&session),
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/list"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32000);
}

#[tokio::test]
async fn sessions_are_independent() {
    let app = TestApp::new();
    let first = app.open_session().await;
    let second = app.open_session().await;
    assert_ne!(first, second);

    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/mcp")
        .header("mcp-session-id", first.as_str())
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let styles = app
        .call(
            &second,
            2,
            "tools/call",
            json!({"name": "explore_tattoo_styles"}),
        )
        .await;
    let text = styles["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("**Traditional / Old School**"));
}

#[tokio::test]
async fn initialize_streams_when_client_accepts_sse() {
    let app = TestApp::new();
    let (status, headers, body) = app
        .post(
            None,
            "application/json, text/event-stream",
            initialize_request().to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert!(headers.get("mcp-session-id").is_some());
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("data:"));
    assert!(text.contains("\"inkmatch\""));
}

fn session_request(method: Method, session: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/mcp")
        .header("mcp-session-id", session)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn get_with_live_session_opens_an_event_stream() {
    let app = TestApp::new();
    let session = app.open_session().await;

    // The standalone stream stays open, so only the head is inspected.
    let resp = app
        .router
        .clone()
        .oneshot(session_request(Method::GET, &session))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn malformed_body_on_live_session_is_a_parse_error() {
    let app = TestApp::new();
    let session = app.open_session().await;

    let (status, _, body) = app.post(Some(&session), "application/json", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);

    // The session survives the bad message.
    let tools = app.call(&session, 2, "tools/list", json!({})).await;
    assert!(tools["result"]["tools"].is_array());
}

#[tokio::test]
async fn get_after_delete_is_rejected() {
    let app = TestApp::new();
    let session = app.open_session().await;

    let (status, _, _) = app.send(session_request(Method::DELETE, &session)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(session_request(Method::GET, &session)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({"message": "Missing or invalid session ID"})
    );
}
