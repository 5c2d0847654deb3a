//! Engine configuration from environment variables

use std::env;
use std::time::Duration;

/// Stockfish process settings.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path (or name on `PATH`) of the Stockfish binary
    pub stockfish_path: String,

    pub threads: usize,

    /// Transposition table size in MB
    pub hash_mb: usize,

    pub move_overhead_ms: u32,

    /// Upper bound on a single `go depth` search before `stop` is sent
    pub search_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    /// Unset or unparsable values fall back to defaults sized from the core count.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let stockfish_path = var("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path);

        let threads = var("STOCKFISH_THREADS")
            .and_then(|v| v.parse().ok())
            .filter(|&t: &usize| t > 0)
            .unwrap_or(defaults.threads);

        let hash_mb = var("STOCKFISH_HASH_MB")
            .and_then(|v| v.parse().ok())
            .filter(|&h: &usize| h > 0)
            .unwrap_or_else(|| default_hash_mb(threads));

        let move_overhead_ms = var("STOCKFISH_MOVE_OVERHEAD_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.move_overhead_ms);

        let search_timeout = var("STOCKFISH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.search_timeout);

        Self {
            stockfish_path,
            threads,
            hash_mb,
            move_overhead_ms,
            search_timeout,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.stockfish_path = path.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let threads = default_threads(num_cpus::get());
        Self {
            stockfish_path: "stockfish".to_string(),
            threads,
            hash_mb: default_hash_mb(threads),
            move_overhead_ms: 10,
            search_timeout: Duration::from_secs(120),
        }
    }
}

/// Two thirds of the cores, at least one.
pub fn default_threads(cores: usize) -> usize {
    (cores * 2 / 3).max(1)
}

/// 64 MB per thread, capped at 1 GB.
pub fn default_hash_mb(threads: usize) -> usize {
    (64 * threads).min(1024)
}
