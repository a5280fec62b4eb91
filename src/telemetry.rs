//! Structured logging bootstrap.
//!
//! The node has no metrics/tracing-backend requirement, so this is a
//! `tracing` + `tracing-subscriber` initializer only: a small builder
//! (`.with_name()`, `.with_version()`, `.register()`) with no exporter
//! pipeline behind it.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber.
///
/// Respects `RUST_LOG` via [`EnvFilter`]; defaults to `info` when unset.
pub struct Telemetry {
    name: Option<&'static str>,
    version: Option<&'static str>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            name: None,
            version: None,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    /// Installs the global subscriber. Idempotent-ish: a second call would
    /// panic, same as `tracing_subscriber::registry().init()` does upstream.
    pub fn register(self) -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
        if let (Some(name), Some(version)) = (self.name, self.version) {
            tracing::info!(name, version, "starting");
        }
        self
    }
}
