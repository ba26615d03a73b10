// ToggleTown - feature flags for Rust
//
// This library resolves feature flags locally against a catalog fetched from
// the ToggleTown service and kept fresh in the background.

// Re-export the SDK
pub use toggletown_features::*;

// Re-export the transport for callers that tune or replace it
pub use toggletown_http_client;
