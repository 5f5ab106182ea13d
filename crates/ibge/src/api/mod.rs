//! API endpoint groups.

pub mod cnae;

pub use cnae::CnaeApi;
