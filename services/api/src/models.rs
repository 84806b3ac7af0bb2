//! API Models
//!
//! Plain HTTP payloads of the service, annotated for OpenAPI generation with
//! `utoipa`. MCP traffic itself uses rmcp's JSON-RPC types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const APP_NAME: &str = "inkmatch";

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "inkmatch")]
    pub app: String,
    #[schema(example = "1.0.0")]
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            app: APP_NAME.to_string(),
            version: inkmatch_core::server::SERVER_VERSION.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}
