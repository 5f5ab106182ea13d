//! Transport layer for the IBGE client.

pub mod http;

pub use http::HttpTransport;
