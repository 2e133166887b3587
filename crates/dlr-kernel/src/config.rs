//! Runtime configuration for the backend adapters.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional config file (YAML, TOML or JSON, picked by extension)
//! 3. `DLR_*` environment variables (`DLR_HEXAGON_DEBUG_LEVEL=2`)
//! 4. `OMP_NUM_THREADS` for the Treelite worker thread count

use config::{Config as Cfg, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{DlrError, DlrResult};

/// Environment variable read for the Treelite worker thread count.
pub const NUM_THREADS_ENV: &str = "OMP_NUM_THREADS";

/// Configuration shared by the backend adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Treelite worker threads. `None` uses every available core.
    pub num_worker_threads: Option<i32>,

    /// Shared library that exports the Treelite runtime C API.
    pub treelite_runtime_library: PathBuf,

    /// Debug level handed to the Hexagon session on init.
    pub hexagon_debug_level: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_worker_threads: None,
            treelite_runtime_library: PathBuf::from(default_treelite_runtime_library()),
            hexagon_debug_level: 0,
        }
    }
}

fn default_treelite_runtime_library() -> &'static str {
    if cfg!(target_os = "windows") {
        "treelite_runtime.dll"
    } else if cfg!(target_os = "macos") {
        "libtreelite_runtime.dylib"
    } else {
        "libtreelite_runtime.so"
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the environment.
    pub fn from_env() -> DlrResult<Self> {
        Self::load(None)
    }

    /// Defaults overridden by `path`, then by the environment.
    pub fn from_file(path: impl AsRef<Path>) -> DlrResult<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> DlrResult<Self> {
        let mut builder = Cfg::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(DlrError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("DLR").try_parsing(true));

        let mut cfg: RuntimeConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DlrError::config(e.to_string()))?;

        if let Some(threads) = parse_num_threads(std::env::var(NUM_THREADS_ENV).ok().as_deref()) {
            cfg.num_worker_threads = Some(threads);
        }
        Ok(cfg)
    }

    /// Set the Treelite worker thread count.
    pub fn with_num_worker_threads(mut self, threads: i32) -> DlrResult<Self> {
        if threads <= 0 {
            return Err(DlrError::config("num_worker_threads must be > 0"));
        }
        self.num_worker_threads = Some(threads);
        Ok(self)
    }

    /// Point at a specific Treelite runtime library.
    pub fn with_treelite_runtime_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.treelite_runtime_library = path.into();
        self
    }

    /// Set the Hexagon debug level.
    pub fn with_hexagon_debug_level(mut self, level: i32) -> Self {
        self.hexagon_debug_level = level;
        self
    }

    /// Thread count in the form the Treelite C API expects: `-1` for all.
    ///
    /// An explicit `num_worker_threads` wins. Otherwise `OMP_NUM_THREADS` is
    /// read at call time, so a [`RuntimeConfig::default`] still honours it.
    pub fn worker_threads_arg(&self) -> i32 {
        resolve_worker_threads(
            self.num_worker_threads,
            std::env::var(NUM_THREADS_ENV).ok().as_deref(),
        )
    }
}

/// Explicit count, else the `OMP_NUM_THREADS` value, else `-1`.
pub fn resolve_worker_threads(explicit: Option<i32>, env_value: Option<&str>) -> i32 {
    explicit
        .or_else(|| parse_num_threads(env_value))
        .unwrap_or(-1)
}

/// Parse a thread-count override. Absent, empty, non-numeric or non-positive
/// values mean "use all available".
pub fn parse_num_threads(value: Option<&str>) -> Option<i32> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(value = raw, "ignoring invalid {}", NUM_THREADS_ENV);
            None
        }
    }
}
