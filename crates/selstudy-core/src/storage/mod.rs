//! Local on-disk state: configuration and the location of the outbox.

mod config;

pub use config::{CollectorConfig, Config, OutboxConfig, RetryConfig, StudyConfig};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/selstudy[-dev]/` based on SELSTUDY_ENV.
///
/// Set SELSTUDY_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SELSTUDY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("selstudy-dev")
    } else {
        base_dir.join("selstudy")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
