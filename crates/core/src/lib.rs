//! InkMatch Core
//!
//! Domain logic of the InkMatch tattoo service: the style catalog, prompt and
//! handoff translation, the image-generation job poller, the tool registry with
//! its three tattoo tools, and the MCP `ServerHandler` that exposes them.
//! The HTTP transport and session handling live in `inkmatch-api`.

pub mod catalog;
pub mod generation;
pub mod prompt;
pub mod server;
pub mod tools;
pub mod widget;

pub use server::InkMatchServer;
