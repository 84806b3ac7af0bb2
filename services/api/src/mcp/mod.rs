//! Streamable HTTP transport for MCP: per-session transports, the registry
//! that owns them, and the `/mcp` handlers.

pub mod endpoint;
pub mod registry;
pub mod transport;

pub use registry::{SessionRegistry, generate_session_id};
pub use transport::{McpTransport, TransportError, TransportState};
