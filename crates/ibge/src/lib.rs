//! # IBGE CNAE client
//!
//! HTTP client for the IBGE classification services, normalizing the
//! per-level payloads into [`mcpbr_core::CnaeEntity`] records.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcpbr_core::CnaeService;
//! use mcpbr_ibge::IbgeClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IbgeClient::builder().build()?;
//! let service = CnaeService::new(Arc::new(client));
//!
//! for section in service.list_sections().await? {
//!     println!("{} {}", section.code, section.description);
//! }
//!
//! let hits = service.search("padaria", None).await?;
//! println!("{} resultados", hits.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod transport;

pub use client::{IbgeClient, IbgeClientBuilder};
pub use config::{ClientConfig, RetryConfig, DEFAULT_BASE_URL};
pub use error::{IbgeError, IbgeResult};
