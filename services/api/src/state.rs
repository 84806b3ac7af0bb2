//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds everything the
//! handlers share: configuration, the tool registry, the widget and the live
//! MCP sessions.

use crate::{config::Config, mcp::registry::SessionRegistry};
use inkmatch_core::{
    generation::{DisabledGenerator, ImageGenerator, JobPoller, ReplicateClient},
    tools::{RegistrationError, ToolRegistry, build_registry},
    widget::Widget,
};
use std::sync::Arc;
use tracing::{info, warn};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: SessionRegistry,
    /// `None` when the widget file could not be read at startup.
    pub widget: Option<Arc<Widget>>,
}

impl AppState {
    /// Wires the image generator, the tools and the widget from `config`.
    pub fn from_config(config: Config) -> Result<Self, RegistrationError> {
        let generator: Arc<dyn ImageGenerator> = match &config.replicate_api_token {
            Some(token) => {
                info!("Image generation enabled.");
                Arc::new(JobPoller::new(Arc::new(ReplicateClient::new(token.clone()))))
            }
            None => {
                warn!("REPLICATE_API_TOKEN not set. Previews will be returned without images.");
                Arc::new(DisabledGenerator)
            }
        };
        Self::with_generator(config, generator)
    }

    /// Same as [`AppState::from_config`] with an explicit generator.
    pub fn with_generator(
        config: Config,
        generator: Arc<dyn ImageGenerator>,
    ) -> Result<Self, RegistrationError> {
        let tools = build_registry(generator, config.inkmatch_url.clone())?;

        let widget_path = config.widget_path();
        let widget = match Widget::load(&widget_path) {
            Ok(widget) => Some(Arc::new(widget)),
            Err(e) => {
                warn!(path = %widget_path.display(), "Widget HTML not loaded: {}", e);
                None
            }
        };

        Ok(Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            sessions: SessionRegistry::new(),
            widget,
        })
    }
}
