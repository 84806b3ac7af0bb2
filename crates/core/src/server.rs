//! InkMatch MCP Server
//!
//! Implements the rmcp `ServerHandler` for one client session. Tool listing
//! and invocation are delegated to the shared [`ToolRegistry`]; the preview
//! widget is exposed as the single resource.

use crate::{
    tools::{
        registry::{ErrorKind, InvocationError, ToolRegistry},
        tattoo::WIDGET_URI,
    },
    widget::Widget,
};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListResourcesResult, ListToolsResult, Meta, PaginatedRequestParam,
        ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
};
use std::sync::Arc;
use tracing::{error, warn};

pub const SERVER_NAME: &str = "inkmatch";
pub const SERVER_VERSION: &str = "1.0.0";

/// Per-session MCP service. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct InkMatchServer {
    tools: Arc<ToolRegistry>,
    widget: Option<Arc<Widget>>,
}

impl InkMatchServer {
    pub fn new(tools: Arc<ToolRegistry>, widget: Option<Arc<Widget>>) -> Self {
        Self { tools, widget }
    }
}

fn to_mcp_error(err: InvocationError) -> McpError {
    match err.kind() {
        ErrorKind::UnknownTool | ErrorKind::Validation => {
            warn!(error = %err, "Rejected tool invocation");
            McpError::invalid_params(err.to_string(), None)
        }
        ErrorKind::Handler => {
            error!(error = %err, "Tool handler failed");
            McpError::internal_error(err.to_string(), None)
        }
    }
}

/// Descriptor hints first, then whatever the handler attached on top.
fn merge_meta(hints: Option<JsonObject>, extra: Option<JsonObject>) -> Option<Meta> {
    match (hints, extra) {
        (None, None) => None,
        (hints, extra) => {
            let mut merged = hints.unwrap_or_default();
            merged.extend(extra.unwrap_or_default());
            Some(Meta(merged))
        }
    }
}

impl ServerHandler for InkMatchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.list()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let hints = self.tools.get(&request.name).and_then(|d| d.meta.clone());
        let outcome = self
            .tools
            .dispatch(&request.name, request.arguments)
            .await
            .map_err(to_mcp_error)?;

        let mut result = CallToolResult::success(vec![Content::text(outcome.narration)]);
        result.structured_content = outcome.structured;
        result.meta = merge_meta(hints, outcome.meta);
        Ok(result)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self.widget.iter().map(|w| w.resource()).collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match &self.widget {
            Some(widget) if request.uri == WIDGET_URI => Ok(ReadResourceResult {
                contents: vec![widget.contents()],
            }),
            _ => Err(McpError::resource_not_found(
                format!("Resource '{}' not found", request.uri),
                None,
            )),
        }
    }
}
