//! # huddle-api
//!
//! HTTP and WebSocket surface for Huddle built on Axum.
//!
//! Provides the `/ws` upgrade endpoint, health and presence REST routes,
//! JWT token verification, and the mapping from domain errors to HTTP
//! responses.

pub mod access;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use access::PermissiveAccess;
pub use auth::JwtVerifier;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
