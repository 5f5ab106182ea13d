// Core model and access layer for the IBGE CNAE taxonomy

pub mod cache;
pub mod cancel;
pub mod code;
pub mod error;
pub mod normalize;
pub mod search;
pub mod service;
pub mod source;
pub mod types;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

pub use cancel::run_cancellable;
pub use error::{CnaeError, CnaeResult, ErrorKind};
pub use service::{CnaeService, DEFAULT_CACHE_CAPACITY};
pub use source::{CnaeSource, InMemorySource};
pub use types::*;
