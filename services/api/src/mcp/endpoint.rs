//! The `/mcp` endpoint.
//!
//! Routes each HTTP request to the session named by its `mcp-session-id`
//! header. A POST without a live session may only carry an `initialize`
//! request, which creates the session.

use super::{
    registry::generate_session_id,
    transport::{McpTransport, TransportError, TransportState},
};
use crate::{handlers::ApiError, state::AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use inkmatch_core::InkMatchServer;
use rmcp::{
    model::{
        ClientJsonRpcMessage, ClientRequest, ErrorCode, JsonRpcMessage, RequestId,
        ServerJsonRpcMessage,
    },
    transport::common::server_side_http::ServerSseMessage,
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tracing::{debug, info, instrument, warn};

pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");
const LAST_EVENT_ID_HEADER: HeaderName = HeaderName::from_static("last-event-id");
const EVENT_STREAM: &str = "text/event-stream";
const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Not a standard JSON-RPC code; used for traffic that arrives before initialize.
const SERVER_NOT_INITIALIZED: ErrorCode = ErrorCode(-32000);

pub enum EndpointError {
    /// Rejected at the protocol level: a JSON-RPC error envelope.
    Rpc {
        status: StatusCode,
        code: ErrorCode,
        message: &'static str,
        id: Option<RequestId>,
    },
    Api(ApiError),
}

impl EndpointError {
    fn rpc(code: ErrorCode, message: &'static str, id: Option<RequestId>) -> Self {
        EndpointError::Rpc {
            status: StatusCode::BAD_REQUEST,
            code,
            message,
            id,
        }
    }

    fn session_not_found() -> Self {
        EndpointError::Api(ApiError::NotFound("Session not found".to_string()))
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        match self {
            EndpointError::Rpc {
                status,
                code,
                message,
                id,
            } => {
                let body = json!({
                    "jsonrpc": "2.0",
                    "error": { "code": code.0, "message": message },
                    "id": id,
                });
                (status, Json(body)).into_response()
            }
            EndpointError::Api(err) => err.into_response(),
        }
    }
}

impl From<ApiError> for EndpointError {
    fn from(err: ApiError) -> Self {
        EndpointError::Api(err)
    }
}

/// A live session resolved from the request headers.
struct Resolved {
    id: String,
    transport: Arc<McpTransport>,
}

/// Looks up the session named in the headers. A transport that already
/// closed is evicted and treated as unknown.
async fn resolve(state: &AppState, headers: &HeaderMap) -> Option<Resolved> {
    let id = headers.get(&SESSION_ID_HEADER)?.to_str().ok()?;
    let transport = state.sessions.get(id).await?;
    if transport.is_closed() {
        state.sessions.remove(id).await;
        return None;
    }
    Some(Resolved {
        id: id.to_string(),
        transport,
    })
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(EVENT_STREAM))
}

fn is_initialize(message: &ClientJsonRpcMessage) -> bool {
    matches!(
        message,
        JsonRpcMessage::Request(req) if matches!(req.request, ClientRequest::InitializeRequest(_))
    )
}

fn parse_message(body: &[u8]) -> Result<ClientJsonRpcMessage, EndpointError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| EndpointError::rpc(ErrorCode::PARSE_ERROR, "Parse error", None))?;
    serde_json::from_value(value).map_err(|_| {
        EndpointError::rpc(
            ErrorCode::INVALID_REQUEST,
            "Invalid Request: not a JSON-RPC message",
            None,
        )
    })
}

/// Maps a transport failure while forwarding. A closed transport is evicted.
async fn forwarding_failed(state: &AppState, id: &str, err: TransportError) -> EndpointError {
    match err {
        TransportError::Closed => {
            warn!(session_id = %id, "Transport closed while forwarding; evicting session");
            state.sessions.remove(id).await;
            EndpointError::session_not_found()
        }
        TransportError::InvalidEventId(event_id) => EndpointError::Api(ApiError::BadRequest(
            format!("Invalid Last-Event-Id '{}'", event_id),
        )),
        other => EndpointError::Api(ApiError::InternalServerError(other.into())),
    }
}

fn sse_response<S>(messages: S) -> Response
where
    S: Stream<Item = ServerSseMessage> + Send + 'static,
{
    let events = messages.map(|sse| {
        let event = Event::default().json_data(sse.message.as_ref())?;
        Ok::<_, axum::Error>(match sse.event_id {
            Some(event_id) => event.id(event_id),
            None => event,
        })
    });
    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
        .into_response()
}

/// Waits for the reply to a forwarded request and returns it as one JSON
/// body. Other messages on the same stream are dropped.
/// How long a reply-less request stream may wait for the transport to
/// report its shutdown.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

async fn json_reply(
    state: &AppState,
    session: &Resolved,
    mut messages: mpsc::Receiver<ServerSseMessage>,
) -> Result<Response, EndpointError> {
    while let Some(sse) = messages.recv().await {
        match sse.message.as_ref() {
            reply @ (JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_)) => {
                return Ok(Json(reply).into_response());
            }
            other => debug!(dropped = ?other, "Dropping server message in JSON response mode"),
        }
    }

    // The worker drops pending request streams when the session shuts down.
    let mut transport_state = session.transport.subscribe();
    let closed = tokio::time::timeout(
        CLOSE_GRACE,
        transport_state.wait_for(|s| *s == TransportState::Closed),
    )
    .await
    .is_ok();
    if closed {
        return Err(forwarding_failed(state, &session.id, TransportError::Closed).await);
    }
    Err(EndpointError::Api(ApiError::InternalServerError(
        anyhow::anyhow!("Request stream ended without a reply"),
    )))
}

fn single_reply(message: ServerJsonRpcMessage, as_event_stream: bool) -> Response {
    if as_event_stream {
        sse_response(tokio_stream::once(ServerSseMessage {
            event_id: None,
            message: Arc::new(message),
        }))
    } else {
        Json(message).into_response()
    }
}

/// `POST /mcp`
#[instrument(skip_all)]
pub async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EndpointError> {
    let message = parse_message(&body)?;
    let as_event_stream = accepts_event_stream(&headers);

    match resolve(&state, &headers).await {
        Some(session) => forward(&state, session, message, as_event_stream).await,
        None => bootstrap(&state, message, as_event_stream).await,
    }
}

async fn forward(
    state: &AppState,
    session: Resolved,
    message: ClientJsonRpcMessage,
    as_event_stream: bool,
) -> Result<Response, EndpointError> {
    let request_id = match &message {
        JsonRpcMessage::Request(req) => Some(req.id.clone()),
        _ => None,
    };

    if is_initialize(&message) {
        return Err(EndpointError::rpc(
            ErrorCode::INVALID_REQUEST,
            "Invalid Request: Server already initialized",
            request_id,
        ));
    }

    if request_id.is_none() {
        return match session.transport.accept(message).await {
            Ok(()) => Ok(StatusCode::ACCEPTED.into_response()),
            Err(e) => Err(forwarding_failed(state, &session.id, e).await),
        };
    }

    let messages = match session.transport.request(message).await {
        Ok(messages) => messages,
        Err(e) => return Err(forwarding_failed(state, &session.id, e).await),
    };
    if as_event_stream {
        Ok(sse_response(ReceiverStream::new(messages)))
    } else {
        json_reply(state, &session, messages).await
    }
}

/// Creates a session from an `initialize` request.
#[instrument(skip_all)]
async fn bootstrap(
    state: &AppState,
    message: ClientJsonRpcMessage,
    as_event_stream: bool,
) -> Result<Response, EndpointError> {
    if !is_initialize(&message) {
        return Err(EndpointError::rpc(
            SERVER_NOT_INITIALIZED,
            "Bad Request: Server not initialized",
            None,
        ));
    }

    let server = InkMatchServer::new(state.tools.clone(), state.widget.clone());
    let transport = Arc::new(McpTransport::open(generate_session_id(), server));

    let response = match transport.initialize(message).await {
        Ok(response) => response,
        Err(e) => {
            transport.close().await;
            return Err(ApiError::InternalServerError(e.into()).into());
        }
    };

    if transport.session_id().is_none() {
        // The server answered with an error; relay it without a session.
        transport.close().await;
        return Ok(single_reply(response, as_event_stream));
    }

    let session_id = match state.sessions.create(transport.clone()).await {
        Ok(id) => id,
        Err(e) => {
            transport.close().await;
            return Err(ApiError::InternalServerError(e.into()).into());
        }
    };
    let header_value = HeaderValue::from_str(&session_id).map_err(ApiError::from)?;

    info!(session_id = %session_id, "MCP session initialized");
    let mut reply = single_reply(response, as_event_stream);
    reply.headers_mut().insert(SESSION_ID_HEADER, header_value);
    Ok(reply)
}

/// `GET /mcp`: the server-push stream of an existing session.
#[instrument(skip_all)]
pub async fn handle_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, EndpointError> {
    let session = resolve(&state, &headers).await.ok_or_else(|| {
        EndpointError::Api(ApiError::BadRequest(
            "Missing or invalid session ID".to_string(),
        ))
    })?;

    let last_event_id = headers
        .get(&LAST_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let opened = match last_event_id {
        Some(event_id) => {
            debug!(session_id = %session.id, last_event_id = %event_id, "Resuming stream");
            session.transport.resume(event_id).await
        }
        None => session.transport.listen().await,
    };

    match opened {
        Ok(messages) => Ok(sse_response(ReceiverStream::new(messages))),
        Err(e) => Err(forwarding_failed(&state, &session.id, e).await),
    }
}

/// `DELETE /mcp`: terminates a session.
#[instrument(skip_all)]
pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, EndpointError> {
    let session = resolve(&state, &headers)
        .await
        .ok_or_else(EndpointError::session_not_found)?;

    session.transport.close().await;
    state.sessions.remove(&session.id).await;
    info!(session_id = %session.id, "MCP session terminated by client");
    Ok(StatusCode::OK.into_response())
}

/// `OPTIONS /mcp`: CORS preflight, answered without touching sessions.
pub async fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                "POST, GET, DELETE, OPTIONS",
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "Content-Type, mcp-session-id",
            ),
            (header::ACCESS_CONTROL_EXPOSE_HEADERS, "mcp-session-id"),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use inkmatch_core::generation::DisabledGenerator;

    fn app_state() -> AppState {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            replicate_api_token: None,
            inkmatch_url: "https://inkmatch.io".parse().unwrap(),
            public_dir: std::env::temp_dir(),
            log_level: tracing::Level::INFO,
        };
        AppState::with_generator(config, Arc::new(DisabledGenerator)).unwrap()
    }

    async fn live_session(state: &AppState) -> Resolved {
        let init = parse_message(
            br#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#,
        )
        .ok()
        .unwrap();
        let server = InkMatchServer::new(state.tools.clone(), state.widget.clone());
        let transport = Arc::new(McpTransport::open(generate_session_id(), server));
        transport.initialize(init).await.unwrap();
        let id = state.sessions.create(transport.clone()).await.unwrap();
        Resolved {
            id: id.to_string(),
            transport,
        }
    }

    #[tokio::test]
    async fn test_stream_cut_by_closed_transport_evicts_the_session() {
        let state = app_state();
        let session = live_session(&state).await;

        session.transport.close().await;
        let (tx, rx) = mpsc::channel::<ServerSseMessage>(1);
        drop(tx);

        let response = json_reply(&state, &session, rx)
            .await
            .unwrap_err()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.sessions.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_stream_without_reply_on_live_transport_is_internal_error() {
        let state = app_state();
        let session = live_session(&state).await;

        let (tx, rx) = mpsc::channel::<ServerSseMessage>(1);
        drop(tx);

        let response = json_reply(&state, &session, rx)
            .await
            .unwrap_err()
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.sessions.get(&session.id).await.is_some());
    }

    #[test]
    fn test_parse_errors_are_classified() {
        match parse_message(b"{not json").unwrap_err() {
            EndpointError::Rpc { code, id, .. } => {
                assert_eq!(code, ErrorCode::PARSE_ERROR);
                assert!(id.is_none());
            }
            EndpointError::Api(_) => panic!("expected a JSON-RPC error"),
        }

        match parse_message(br#"{"hello": "world"}"#).unwrap_err() {
            EndpointError::Rpc { code, .. } => assert_eq!(code, ErrorCode::INVALID_REQUEST),
            EndpointError::Api(_) => panic!("expected a JSON-RPC error"),
        }
    }

    #[test]
    fn test_initialize_detection() {
        let init = parse_message(
            br#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#,
        )
        .ok()
        .unwrap();
        assert!(is_initialize(&init));

        let list = parse_message(br#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .ok()
            .unwrap();
        assert!(!is_initialize(&list));
    }

    #[test]
    fn test_accept_header() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_event_stream(&headers));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        assert!(accepts_event_stream(&headers));
    }
}
