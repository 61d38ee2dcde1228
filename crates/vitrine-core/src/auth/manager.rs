//! Session manager: token storage, request authentication and refresh.
//!
//! Every API call made on behalf of a signed-in user goes through
//! [`SessionManager::dispatch`], which attaches the bearer token and, when the
//! backend answers 401, exchanges the refresh token once and retries once.
//! A refresh that fails leaves the client signed out.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::csrf::CsrfTokens;
use super::forms::{PasswordReset, Registration};
use super::session::{Session, SessionState};
use crate::api::{
    ApiError, AuthError, DispatchError, HttpResponse, HttpTransport, OutboundRequest,
    RefreshError, Transport, TransportError,
};
use crate::config::Config;
use crate::store::{
    FileStore, KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REMEMBER_KEY, USER_KEY,
};
use crate::validation::{self, ValidationError};

const AUTHORIZATION: &str = "Authorization";

const DEFAULT_LOGIN_ERROR: &str = "Invalid email or password";
const DEFAULT_REGISTER_ERROR: &str = "Could not create account";
const DEFAULT_RESET_REQUEST_ERROR: &str = "Could not send recovery email";
const DEFAULT_RESET_CONFIRM_ERROR: &str = "Could not reset password";

/// Error-message fields the backend uses, in order of preference
const LOGIN_MESSAGE_FIELDS: &[&str] = &["detalhes", "detail"];
const RESET_MESSAGE_FIELDS: &[&str] = &["erro", "detalhes", "detail"];

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Return `request` with `Authorization: Bearer <token>` when a token is
/// given and the target is protected; otherwise return it unchanged.
pub fn with_bearer(mut request: OutboundRequest, token: Option<&str>, protected: bool) -> OutboundRequest {
    if let (Some(token), true) = (token, protected) {
        request
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
        request
            .headers
            .insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
    }
    request
}

/// Pull a user-facing message out of an error body.
/// Accepts a plain string or the first string of a list.
fn backend_message(response: &HttpResponse, fields: &[&str]) -> Option<String> {
    let body: Value = response.json().ok()?;
    fields.iter().find_map(|field| match body.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    })
}

pub struct SessionManager {
    config: Config,
    origin: Option<Url>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    csrf: CsrfTokens,
}

impl SessionManager {
    pub fn new(config: Config, transport: Arc<dyn Transport>, store: Arc<dyn KeyValueStore>) -> Self {
        let origin = Url::parse(&config.base_url).ok();
        let csrf = CsrfTokens::new(config.csrf_cookie.clone());
        Self {
            config,
            origin,
            transport,
            store,
            csrf,
        }
    }

    /// Production wiring: `reqwest` transport and the on-disk session store
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let store = Arc::new(FileStore::new(config.store_path()?));
        Ok(Self::new(config, transport, store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn csrf(&self) -> &CsrfTokens {
        &self.csrf
    }

    // ===== State =====

    pub fn session(&self) -> Option<Session> {
        Session::load(self.store.as_ref())
    }

    pub fn state(&self) -> SessionState {
        if self.session().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Latest user record: the profile copy when fetched, else the login copy
    pub fn current_user(&self) -> Option<Value> {
        self.store
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .or_else(|| self.session().map(|s| s.user))
    }

    pub fn set_remember(&self, remember: bool) -> anyhow::Result<()> {
        if remember {
            self.store.set(REMEMBER_KEY, "true")
        } else {
            self.store.remove(REMEMBER_KEY)
        }
    }

    pub fn remember(&self) -> bool {
        self.store.get(REMEMBER_KEY).as_deref() == Some("true")
    }

    // ===== Request interception =====

    /// Whether `url` falls inside the bearer-protected API namespace
    pub fn is_api_target(&self, url: &str) -> bool {
        if url.starts_with('/') && !url.starts_with("//") {
            return url.starts_with(&self.config.api_prefix);
        }
        match (Url::parse(url), &self.origin) {
            (Ok(target), Some(origin)) => {
                target.origin() == origin.origin()
                    && target.path().starts_with(&self.config.api_prefix)
            }
            _ => false,
        }
    }

    /// Inject the stored session's access token into an API request
    pub fn attach_auth(&self, request: OutboundRequest) -> OutboundRequest {
        let token = self.session().map(|s| s.access_token);
        let protected = self.is_api_target(&request.url);
        with_bearer(request, token.as_deref(), protected)
    }

    fn attach_csrf(&self, mut request: OutboundRequest) -> OutboundRequest {
        if !self.is_api_target(&request.url) {
            return request;
        }
        if let Some(token) = self.csrf.token() {
            request.headers.insert(self.config.csrf_header.clone(), token);
        }
        request
    }

    /// Single authenticated send, no refresh handling
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let request = self.attach_csrf(self.attach_auth(request));
        let response = self.transport.send(&request).await?;
        self.csrf.observe(&response);
        Ok(response)
    }

    /// Send with token refresh on 401: at most one refresh and one retry.
    /// The retry's response is returned as-is, whatever its status.
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<HttpResponse, DispatchError> {
        let had_session = self.session().is_some();
        let response = self.send(request.clone()).await?;

        if response.status != 401 || !had_session {
            return Ok(response);
        }

        debug!(url = %request.url, "Access token rejected, refreshing");
        match self.refresh().await {
            Ok(_) => Ok(self.send(request).await?),
            Err(e) => {
                warn!(error = %e, "Session refresh failed, signing out");
                Session::clear(self.store.as_ref());
                Err(DispatchError::AuthExpired)
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    /// Only the access token is replaced; on failure nothing is touched.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)
            .ok_or(RefreshError::NoRefreshToken)?;

        // Sent without the stale bearer, which the backend would reject first
        let request = OutboundRequest::post(self.config.token_refresh_path())
            .json(&json!({ "refresh": refresh_token }));
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(RefreshError::Rejected(response.status));
        }
        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        self.store
            .set(ACCESS_TOKEN_KEY, &body.access)
            .map_err(|e| RefreshError::Storage(format!("{:#}", e)))?;
        debug!("Access token refreshed");
        Ok(body.access)
    }

    /// Ask the backend whether the stored access token is still valid
    pub async fn verify(&self) -> Result<bool, TransportError> {
        let Some(token) = self.store.get(ACCESS_TOKEN_KEY) else {
            return Ok(false);
        };
        let request = OutboundRequest::post(self.config.token_verify_path())
            .json(&json!({ "token": token }));
        let response = self.transport.send(&request).await?;
        Ok(response.is_success())
    }

    /// Page-load check: verify the token, refresh when rejected, sign out
    /// when the refresh fails. An unreachable verify endpoint keeps the session.
    pub async fn check_auth(&self) -> SessionState {
        if self.session().is_none() {
            return SessionState::Anonymous;
        }

        match self.verify().await {
            Ok(true) => SessionState::Authenticated,
            Ok(false) => match self.refresh().await {
                Ok(_) => SessionState::Authenticated,
                Err(e) => {
                    warn!(error = %e, "Token invalid and refresh failed, signing out");
                    Session::clear(self.store.as_ref());
                    SessionState::Anonymous
                }
            },
            Err(e) => {
                warn!(error = %e, "Could not verify token, keeping session");
                SessionState::Authenticated
            }
        }
    }

    // ===== Account operations =====

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }

        let request = OutboundRequest::post(self.config.login_path())
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request).await?;
        self.accept_session(&response, DEFAULT_LOGIN_ERROR)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Session, AuthError> {
        registration.validate()?;

        let request =
            OutboundRequest::post(self.config.register_path()).form(registration.form_fields());
        let response = self.send(request).await?;
        self.accept_session(&response, DEFAULT_REGISTER_ERROR)
    }

    /// Store the session carried by a login/registration response
    fn accept_session(&self, response: &HttpResponse, default_message: &str) -> Result<Session, AuthError> {
        if !response.is_success() {
            let message = backend_message(response, LOGIN_MESSAGE_FIELDS)
                .unwrap_or_else(|| default_message.to_string());
            debug!(status = response.status, "Credentials rejected");
            return Err(AuthError::Rejected(message));
        }

        let session: Session = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        // Drop the previous account's profile copy and remember flag
        Session::clear(self.store.as_ref());
        if let Err(e) = session.save(self.store.as_ref()) {
            Session::clear(self.store.as_ref());
            return Err(AuthError::Storage(format!("{:#}", e)));
        }

        info!("Signed in");
        Ok(session)
    }

    /// Best-effort backend notification, then unconditional local sign-out
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.get(REFRESH_TOKEN_KEY) {
            let request = OutboundRequest::post(self.config.logout_path())
                .json(&json!({ "refresh": refresh_token }));
            match self.send(request).await {
                Ok(response) if response.is_success() => debug!("Backend acknowledged logout"),
                Ok(response) => warn!(status = response.status, "Backend rejected logout"),
                Err(e) => warn!(error = %e, "Failed to notify backend of logout"),
            }
        }

        Session::clear(self.store.as_ref());
        info!("Signed out");
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        validation::validate_email(email)?;

        let request = OutboundRequest::post(self.config.reset_password_path())
            .json(&json!({ "email": email }));
        let response = self.send(request).await?;
        Self::expect_success(&response, DEFAULT_RESET_REQUEST_ERROR)
    }

    pub async fn confirm_password_reset(&self, reset: &PasswordReset) -> Result<(), AuthError> {
        reset.validate()?;

        let request =
            OutboundRequest::post(self.config.confirm_reset_password_path()).json(reset);
        let response = self.send(request).await?;
        Self::expect_success(&response, DEFAULT_RESET_CONFIRM_ERROR)
    }

    fn expect_success(response: &HttpResponse, default_message: &str) -> Result<(), AuthError> {
        if response.is_success() {
            Ok(())
        } else {
            let message = backend_message(response, RESET_MESSAGE_FIELDS)
                .unwrap_or_else(|| default_message.to_string());
            Err(AuthError::Rejected(message))
        }
    }

    /// Fetch the signed-in user's profile and cache it under `user`
    pub async fn fetch_profile(&self) -> Result<Value, ApiError> {
        let response = self
            .dispatch(OutboundRequest::get(self.config.profile_path()))
            .await?;
        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.text()));
        }

        let user: Value = response
            .json()
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        if let Err(e) = self.store.set(USER_KEY, &user.to_string()) {
            warn!(error = %e, "Failed to cache user profile");
        }
        Ok(user)
    }
}
