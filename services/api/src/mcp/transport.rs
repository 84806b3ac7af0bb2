//! Session transport.
//!
//! Each `McpTransport` owns one rmcp local session worker and the
//! `InkMatchServer` instance serving it. HTTP requests are turned into
//! session events through the worker's handle; server messages come back as
//! SSE-ready receivers.

use inkmatch_core::InkMatchServer;
use rmcp::{
    model::{ClientJsonRpcMessage, JsonRpcMessage, ServerJsonRpcMessage},
    serve_server,
    transport::{
        TransportAdapterIdentity, WorkerTransport,
        common::server_side_http::{ServerSseMessage, SessionId},
        streamable_http_server::session::local::{
            EventId, LocalSessionHandle, LocalSessionWorker, SessionConfig, SessionError,
            create_local_session,
        },
    },
};
use std::sync::OnceLock;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Lifecycle of the underlying service task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Session transport is closed")]
    Closed,
    #[error("Session transport is already initialized")]
    AlreadyInitialized,
    #[error("Invalid Last-Event-Id '{0}'")]
    InvalidEventId(String),
    #[error("Session error: {0}")]
    Session(SessionError),
}

impl From<SessionError> for TransportError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionServiceTerminated => TransportError::Closed,
            other => TransportError::Session(other),
        }
    }
}

pub struct McpTransport {
    id: SessionId,
    handle: LocalSessionHandle,
    /// Set once initialization succeeds; until then the id is not advertised.
    settled: OnceLock<SessionId>,
    state: watch::Receiver<TransportState>,
}

impl McpTransport {
    /// Starts a session worker for `server` under `id`.
    ///
    /// Must be called from within a Tokio runtime. The transport reports
    /// `Closed` once the service task ends, whatever the reason.
    pub fn open(id: SessionId, server: InkMatchServer) -> Self {
        let (handle, worker) = create_local_session(id.clone(), SessionConfig::default());
        let (state_tx, state_rx) = watch::channel(TransportState::Open);

        let session_id = id.clone();
        tokio::spawn(async move {
            let transport = WorkerTransport::spawn(worker);
            let service = serve_server::<
                InkMatchServer,
                WorkerTransport<LocalSessionWorker>,
                _,
                TransportAdapterIdentity,
            >(server, transport)
            .await;

            match service {
                Ok(running) => {
                    if let Err(e) = running.waiting().await {
                        error!(session_id = %session_id, "Session service task failed: {}", e);
                    }
                }
                Err(e) => warn!(session_id = %session_id, "Session never completed its handshake: {}", e),
            }

            state_tx.send_replace(TransportState::Closed);
            info!(session_id = %session_id, "Session transport closed");
        });

        Self {
            id,
            handle,
            settled: OnceLock::new(),
            state: state_rx,
        }
    }

    /// The identifier, available only after a successful initialize.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.settled.get()
    }

    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == TransportState::Closed
    }

    /// Watch channel that flips to `Closed` when the service task ends.
    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.state.clone()
    }

    /// Feeds the initialize request and waits for the server's answer.
    ///
    /// The id settles only when the answer is a success response; an error
    /// answer is still returned so it can be relayed to the client.
    pub async fn initialize(
        &self,
        message: ClientJsonRpcMessage,
    ) -> Result<ServerJsonRpcMessage, TransportError> {
        if self.settled.get().is_some() {
            return Err(TransportError::AlreadyInitialized);
        }
        let response = self.handle.initialize(message).await?;
        if matches!(response, JsonRpcMessage::Response(_)) {
            let _ = self.settled.set(self.id.clone());
        }
        Ok(response)
    }

    /// Forwards a request; the receiver yields every server message tied to
    /// it and ends after the response.
    pub async fn request(
        &self,
        message: ClientJsonRpcMessage,
    ) -> Result<mpsc::Receiver<ServerSseMessage>, TransportError> {
        let receiver = self.handle.establish_request_wise_channel().await?;
        self.handle
            .push_message(message, receiver.http_request_id)
            .await?;
        Ok(receiver.inner)
    }

    /// Forwards a notification or a response to a server-initiated request.
    pub async fn accept(&self, message: ClientJsonRpcMessage) -> Result<(), TransportError> {
        self.handle.push_message(message, None).await?;
        Ok(())
    }

    /// Opens the standalone stream for server-initiated messages.
    pub async fn listen(&self) -> Result<mpsc::Receiver<ServerSseMessage>, TransportError> {
        Ok(self.handle.establish_common_channel().await?.inner)
    }

    /// Replays messages after `last_event_id` and continues that stream.
    pub async fn resume(
        &self,
        last_event_id: &str,
    ) -> Result<mpsc::Receiver<ServerSseMessage>, TransportError> {
        let event_id = last_event_id
            .parse::<EventId>()
            .map_err(|_| TransportError::InvalidEventId(last_event_id.to_string()))?;
        Ok(self.handle.resume(event_id).await?.inner)
    }

    /// Asks the worker to shut down. Closing twice is not an error.
    pub async fn close(&self) {
        match self.handle.close().await {
            Ok(()) | Err(SessionError::SessionServiceTerminated) => {}
            Err(e) => warn!(session_id = %self.id, "Failed to close session transport: {}", e),
        }
    }
}
