//! WikiMed MCP - Model Context Protocol server for the WikiMed clinic API
//!
//! This crate exposes the operations from `wikimed-core` as MCP tools over
//! stdio or streamable HTTP.

pub mod error;
pub mod requests;
pub mod server;
pub mod transport;

pub use error::{Result, ServerError};
pub use server::WikimedMcpServer;
pub use transport::McpTransport;
