// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};

/// Load configuration from the process environment. Validation runs here so
/// a malformed downstream address aborts startup rather than surfacing as a
/// per-request failure.
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_lookup(|key| std::env::var(key).ok())
        .context("Failed to read configuration from environment")?;

    config.validate()?;
    Ok(config)
}
