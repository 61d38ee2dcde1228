//! Authentication module for managing the signed-in session.
//!
//! This module provides:
//! - `Session`: the stored token pair and user record, with JWT expiry helpers
//! - `SessionManager`: login/logout, request interception and token refresh
//! - `Registration` / `PasswordReset`: account forms with client-side checks
//! - `CsrfTokens`: CSRF cookie tracking for API requests
//!
//! A session moves Anonymous -> Authenticated on login or registration and
//! back to Anonymous on logout or on any failed refresh.

pub mod csrf;
pub mod forms;
pub mod manager;
pub mod session;

pub use csrf::CsrfTokens;
pub use forms::{PasswordReset, Registration};
pub use manager::{with_bearer, SessionManager};
pub use session::{token_expiry, Session, SessionState};
