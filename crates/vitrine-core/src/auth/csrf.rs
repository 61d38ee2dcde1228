//! CSRF token tracking.
//!
//! The backend hands out its CSRF token as a cookie and expects it echoed
//! back in a header on state-changing API calls.

use std::sync::RwLock;

use crate::api::HttpResponse;

/// Find a cookie's value in a `Cookie:` header (`a=1; b=2`)
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Find a cookie's value in a single `Set-Cookie:` header value
pub fn set_cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let first = set_cookie.split(';').next()?.trim();
    let (key, value) = first.split_once('=')?;
    (key == name && !value.is_empty()).then(|| value.to_string())
}

/// Latest CSRF token seen for this client.
#[derive(Debug)]
pub struct CsrfTokens {
    cookie_name: String,
    token: RwLock<Option<String>>,
}

impl CsrfTokens {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            token: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok()?.clone()
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    /// Seed from a browser-style `Cookie:` header
    pub fn seed_from_cookie_header(&self, cookie_header: &str) {
        if let Some(token) = cookie_value(cookie_header, &self.cookie_name) {
            self.set(Some(token));
        }
    }

    /// Capture a token rotated by the backend
    pub fn observe(&self, response: &HttpResponse) {
        let rotated = response
            .header_values("set-cookie")
            .filter_map(|value| set_cookie_value(value, &self.cookie_name))
            .last();
        if let Some(token) = rotated {
            self.set(Some(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let header = "sessionid=abc; csrftoken=tok123; theme=dark";
        assert_eq!(cookie_value(header, "csrftoken").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("xcsrftoken=nope", "csrftoken"), None);
        assert_eq!(cookie_value("", "csrftoken"), None);
    }

    #[test]
    fn test_set_cookie_value() {
        let value = "csrftoken=abc; expires=Tue, 19 Oct 2027 00:00:00 GMT; Path=/; SameSite=Lax";
        assert_eq!(set_cookie_value(value, "csrftoken").as_deref(), Some("abc"));
        assert_eq!(set_cookie_value("sessionid=1; Path=/", "csrftoken"), None);
        assert_eq!(set_cookie_value("csrftoken=; Max-Age=0", "csrftoken"), None);
    }

    #[test]
    fn test_observe_keeps_latest_token() {
        let tokens = CsrfTokens::new("csrftoken");
        assert_eq!(tokens.token(), None);

        tokens.seed_from_cookie_header("csrftoken=first");
        assert_eq!(tokens.token().as_deref(), Some("first"));

        let response = HttpResponse::new(200, "{}")
            .with_header("Set-Cookie", "sessionid=s; Path=/")
            .with_header("Set-Cookie", "csrftoken=second; Path=/");
        tokens.observe(&response);
        assert_eq!(tokens.token().as_deref(), Some("second"));

        tokens.observe(&HttpResponse::new(200, "{}"));
        assert_eq!(tokens.token().as_deref(), Some("second"));
    }
}
