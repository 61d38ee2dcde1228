//! Vitrine core - session layer for the storefront backend.
//!
//! Owns the bearer-token lifecycle for one client context: storing the tokens
//! issued at login, attaching them to API requests, refreshing them when the
//! backend answers 401, and clearing everything on sign-out.

pub mod api;
pub mod auth;
pub mod config;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use api::{
    ApiError, AuthError, DispatchError, HttpResponse, HttpTransport, OutboundRequest,
    RefreshError, RequestBody, Transport, TransportError,
};
pub use auth::{PasswordReset, Registration, Session, SessionManager, SessionState};
pub use config::Config;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use validation::ValidationError;
