//! Runtime settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `AFRIGROW_MODEL_DIR` | `models` |
//! | `AFRIGROW_REQUIRE_MANIFEST` | off |
//! | `AFRIGROW_LOG_MODE` | `stderr` (or `file`) |
//! | `AFRIGROW_LOG_FILE` | `afrigrow.log` |
//! | `AFRIGROW_WORKERS` | available parallelism |

use std::path::PathBuf;

pub const MODEL_DIR_ENV: &str = "AFRIGROW_MODEL_DIR";
pub const REQUIRE_MANIFEST_ENV: &str = "AFRIGROW_REQUIRE_MANIFEST";
pub const LOG_MODE_ENV: &str = "AFRIGROW_LOG_MODE";
pub const LOG_FILE_ENV: &str = "AFRIGROW_LOG_FILE";
pub const WORKERS_ENV: &str = "AFRIGROW_WORKERS";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "afrigrow.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Log to stderr, keeping stdout for results
    #[default]
    Stderr,
    /// Append to the log file
    File,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "file" => Self::File,
            _ => Self::Stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_dir: PathBuf,
    pub require_manifest: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub workers: usize,
}

fn parse_bool(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("1" | "true" | "TRUE" | "yes" | "YES")
    )
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl Settings {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let workers = match lookup(WORKERS_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!("Ignoring invalid {}={:?}", WORKERS_ENV, raw);
                    default_workers()
                }
            },
            None => default_workers(),
        };

        Self {
            model_dir: lookup(MODEL_DIR_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR), PathBuf::from),
            require_manifest: parse_bool(lookup(REQUIRE_MANIFEST_ENV)),
            log_mode: lookup(LOG_MODE_ENV)
                .map(|v| LogMode::parse(&v))
                .unwrap_or_default(),
            log_file: lookup(LOG_FILE_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            workers,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
