//! InkMatch API Library Crate
//!
//! This library contains the HTTP side of the InkMatch service: configuration,
//! application state, the MCP session transport and registry, the plain HTTP
//! handlers, and routing. The `api` binary is a thin wrapper around it.

pub mod config;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod router;
pub mod state;
