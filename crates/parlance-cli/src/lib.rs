//! Terminal front end for Parlance: configuration, REPL input parsing and
//! snapshot rendering. The binary in `main.rs` wires these to a session.

pub mod commands;
pub mod config;
pub mod render;

use parlance_persist::{SecretStore, API_KEY_HANDLE};

/// Store `key` as the API key unless one is already stored.
///
/// Returns whether it was stored.
pub fn seed_api_key(secrets: &dyn SecretStore, key: Option<&str>) -> anyhow::Result<bool> {
    let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(false);
    };
    if secrets.read_secret(API_KEY_HANDLE)?.is_some() {
        return Ok(false);
    }
    secrets.save_secret(API_KEY_HANDLE, key)?;
    tracing::info!("Stored API key from GEMINI_API_KEY");
    Ok(true)
}
