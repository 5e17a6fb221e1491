//! The HTTP protocol layer: wires every other crate
//! behind one `axum::Router`. Exposed as a library, not just the `recalld`
//! binary, so integration tests can build the router directly against an
//! in-memory `Store` and fake collaborators.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod startup;
pub mod state;
