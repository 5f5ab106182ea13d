// MCP (Model Context Protocol) surface for the IBGE CNAE taxonomy.
// Exposes the CNAE access layer as tools to agent clients over stdio.

pub mod config;
pub mod facade;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::McpConfig;
pub use facade::{CnaeFacade, FacadeError, Record};
pub use server::McpServer;
pub use tools::{register_cnae_tools, CnaeOperation, ToolRegistry};
