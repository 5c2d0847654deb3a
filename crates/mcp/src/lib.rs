//! Chess tools exposed over the Model Context Protocol.
//!
//! The same [`ToolRouter`] backs the stdio server, the chat agent and the
//! web interface's direct tool endpoint.

pub mod format;
pub mod protocol;
pub mod router;
pub mod server;
pub mod tools;

pub use router::{ToolError, ToolOutput, ToolRouter};
pub use server::McpServer;
pub use tools::{catalogue, ToolSpec};
