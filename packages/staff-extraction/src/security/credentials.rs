//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of API keys.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable holding the model backend API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when building the outgoing request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Credentials and model selection for the inference backend.
///
/// Loaded once at startup and passed explicitly to the backend; never
/// mutated afterwards.
#[derive(Clone)]
pub struct ModelCredentials {
    /// API key (secret)
    pub api_key: SecretString,

    /// Provider identifier in `vendor/model` form, e.g. `openai/gpt-4o-mini`
    pub provider: String,

    /// API base URL override (Azure, proxies, local gateways)
    pub base_url: Option<String>,
}

impl ModelCredentials {
    pub fn new(api_key: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            provider: provider.into(),
            base_url: None,
        }
    }

    /// Read the API key from [`API_KEY_VAR`].
    pub fn from_env(provider: impl Into<String>) -> ConfigResult<Self> {
        Self::from_lookup(provider, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(
        provider: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                var: API_KEY_VAR.to_string(),
            })?;
        Ok(Self::new(api_key, provider))
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Model name: the part after the vendor prefix.
    pub fn model(&self) -> &str {
        self.provider
            .split_once('/')
            .map(|(_, model)| model)
            .unwrap_or(&self.provider)
    }

    /// Vendor name: the part before `/`, or `openai` when unprefixed.
    pub fn vendor(&self) -> &str {
        self.provider
            .split_once('/')
            .map(|(vendor, _)| vendor)
            .unwrap_or("openai")
    }
}

impl fmt::Debug for ModelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCredentials")
            .field("api_key", &"[REDACTED]")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .finish()
    }
}
