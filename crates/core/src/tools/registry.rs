//! Tool Registry
//!
//! Binds tool names to their declared input shapes, metadata and handlers.
//! The registry is filled once at startup and only read afterwards, so it is
//! shared behind an `Arc` without any locking.

use super::schema::{InputShape, ValidationError};
use async_trait::async_trait;
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// The result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutcome {
    /// Machine-readable payload, if the tool produces one.
    pub structured: Option<Value>,
    /// Text the client model reads back to the user.
    pub narration: String,
    /// Auxiliary metadata passed through to the client.
    pub meta: Option<JsonObject>,
}

impl ToolOutcome {
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            narration: text.into(),
            ..Default::default()
        }
    }
}

/// A tool implementation. Arguments reach it already validated.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: JsonObject) -> anyhow::Result<ToolOutcome>;
}

/// Broad classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTool,
    Validation,
    Handler,
}

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("Tool '{0}' not found")]
    UnknownTool(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Tool '{tool}' failed: {error}")]
    Handler { tool: String, error: anyhow::Error },
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::UnknownTool(_) => ErrorKind::UnknownTool,
            InvocationError::Invalid(_) => ErrorKind::Validation,
            InvocationError::Handler { .. } => ErrorKind::Handler,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),
}

/// Everything the registry knows about one tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub shape: InputShape,
    pub annotations: ToolAnnotations,
    /// Display hints for the client (output template, status strings).
    pub meta: Option<JsonObject>,
    pub output_schema: Option<Arc<JsonObject>>,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Renders the descriptor as an MCP tool listing entry.
    pub fn to_tool(&self) -> Tool {
        let mut tool = Tool::new(self.name, self.description, self.shape.to_json_schema())
            .annotate(self.annotations.clone());
        tool.title = Some(self.title.to_string());
        tool.output_schema = self.output_schema.clone();
        tool
    }
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool. Names must be unique; insertion order is the listing order.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistrationError> {
        if self.get(descriptor.name).is_some() {
            return Err(RegistrationError::Duplicate(descriptor.name.to_string()));
        }
        debug!(tool = %descriptor.name, "Registered tool");
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn list(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }

    /// Validates `args` against the named tool's shape and runs its handler.
    ///
    /// The handler is never invoked when validation fails. Absent arguments
    /// are validated as an empty object.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Option<JsonObject>,
    ) -> Result<ToolOutcome, InvocationError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| InvocationError::UnknownTool(name.to_string()))?;

        let args = args.unwrap_or_default();
        let accepted = descriptor.shape.validate(&args)?;

        info!(tool = %name, "Executing tool");
        descriptor
            .handler
            .call(accepted)
            .await
            .map_err(|error| InvocationError::Handler {
                tool: name.to_string(),
                error,
            })
    }
}
