//! Environment Configuration Loader
//!
//! Loads environment variables from `/etc/proxysieve/environment` (or a
//! local `.env` during development) so every proxysieve component sees
//! the same `PS_*` settings.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading any config:
//!
//! ```rust
//! use ps_core::config::load_environment;
//!
//! fn main() {
//!     load_environment();
//!     // Now all env vars from /etc/proxysieve/environment are available
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Paths checked in order of priority
pub const ENV_FILE_PATHS: &[&str] = &[
    "/etc/proxysieve/environment",
    "/etc/proxysieve.env",
    ".env",
];

/// Load environment variables from the first environment file found.
///
/// `PS_ENV_FILE` takes precedence over the default paths. Variables that
/// are already set are never overridden.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("PS_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!("Loaded: {}={}", key, value);
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single `KEY=VALUE` line, stripping surrounding quotes.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a floating point configuration value.
pub fn get_config_f64(key: &str, default: f64) -> f64 {
    get_config_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Get an unsigned integer configuration value.
pub fn get_config_usize(key: &str, default: usize) -> usize {
    get_config_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Get a duration configuration value expressed in whole seconds.
pub fn get_config_secs(key: &str, default: Duration) -> Duration {
    get_config_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
