//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the global subscriber used by binaries built on
//! this framework. Everything the manager and the resources log goes through
//! `tracing` with structured fields (`resource`, `health`, `container_id`, ...).
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle milestones only
//! RUST_LOG=info cargo run -p dockerdev
//!
//! # Every hook invocation and engine call
//! RUST_LOG=debug cargo run -p dockerdev
//!
//! # Only the manager
//! RUST_LOG=resource_framework::manager=debug cargo run -p dockerdev
//! ```
//!
//! With `RUST_LOG=info` a deploy reads roughly:
//!
//! ```text
//! INFO Step started step="Setting up network..."
//! INFO Created resource="network"
//! INFO Step started step="Creating new container..."
//! INFO Created resource="container"
//! ```

/// Initializes the global subscriber, filtered by `RUST_LOG`.
///
/// Call once per process; a second call panics inside `tracing_subscriber`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
