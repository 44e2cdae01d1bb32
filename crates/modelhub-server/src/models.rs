//! API models for requests and responses

pub mod api;
pub mod artifact;
pub mod version;

// Re-export commonly used types
pub use api::*;
pub use artifact::*;
pub use version::*;
