//! Common types, protocol definitions, and errors shared across the Keda backend crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
