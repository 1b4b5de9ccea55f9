//! API key lookup
//!
//! The service asks this collaborator for a key before every call; `None`
//! short-circuits the request with a configuration error before any network
//! attempt.

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub trait ApiKeyProvider {
  fn api_key(&self) -> Option<String>;
}

/// Reads the key from the environment, with `.env` support
#[derive(Debug, Default)]
pub struct EnvKeyProvider;

impl EnvKeyProvider {
  pub fn new() -> Self {
    dotenvy::dotenv().ok();
    Self
  }
}

impl ApiKeyProvider for EnvKeyProvider {
  fn api_key(&self) -> Option<String> {
    std::env::var(API_KEY_VAR)
      .ok()
      .filter(|key| !key.trim().is_empty())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
