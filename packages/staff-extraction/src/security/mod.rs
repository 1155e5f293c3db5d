//! Credential handling.

pub mod credentials;

pub use credentials::{ModelCredentials, SecretString, API_KEY_VAR};
