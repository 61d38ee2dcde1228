//! Client configuration management.
//!
//! This module handles loading the client configuration, which
//! describes where the backend lives and how its API namespace is laid out.
//!
//! Configuration is stored at `~/.config/vitrine/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "vitrine";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session store file name in the data directory
const STORE_FILE: &str = "session.json";

/// Environment variable overriding the backend origin
pub const BASE_URL_ENV: &str = "VITRINE_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Path prefix of the bearer-protected API namespace
    pub api_prefix: String,
    /// Base path of the user/auth endpoints
    pub users_path: String,
    /// Base path of the token verify/refresh endpoints
    pub token_path: String,
    pub csrf_cookie: String,
    pub csrf_header: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/".to_string(),
            users_path: "/api/usuarios".to_string(),
            token_path: "/api/token".to_string(),
            csrf_cookie: "csrftoken".to_string(),
            csrf_header: "X-CSRFToken".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Location of the persistent session store
    pub fn store_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORE_FILE))
    }

    // ===== Endpoint paths =====

    pub fn login_path(&self) -> String {
        self.users_endpoint("login")
    }

    pub fn register_path(&self) -> String {
        self.users_endpoint("cadastro")
    }

    pub fn logout_path(&self) -> String {
        self.users_endpoint("logout")
    }

    pub fn reset_password_path(&self) -> String {
        self.users_endpoint("reset-password")
    }

    pub fn confirm_reset_password_path(&self) -> String {
        self.users_endpoint("confirm-reset-password")
    }

    pub fn profile_path(&self) -> String {
        self.users_endpoint("me")
    }

    pub fn token_verify_path(&self) -> String {
        format!("{}/verify/", self.token_path.trim_end_matches('/'))
    }

    pub fn token_refresh_path(&self) -> String {
        format!("{}/refresh/", self.token_path.trim_end_matches('/'))
    }

    fn users_endpoint(&self, name: &str) -> String {
        format!("{}/{}/", self.users_path.trim_end_matches('/'), name)
    }
}
