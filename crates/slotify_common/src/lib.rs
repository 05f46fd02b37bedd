// --- File: crates/slotify_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod retry; // Generic retry helper for collaborators
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{
    integration_failure, internal_error, invalid_input, not_found, Context, HttpStatusCode,
    SlotifyError,
};

// Re-export HTTP utilities for easier access
pub use http::{
    client::{get, post, HTTP_CLIENT},
    IntoHttpResponse,
};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level};

pub use retry::retry_with_backoff;

// This crate provides functionality shared across the application: the error
// taxonomy, collaborator service traits, HTTP and logging utilities.
