//! Service state and configuration.
//!
//! The timeline is loaded once and shared read-only. The current position
//! is a single session behind a lock: one navigation at a time.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::timeline::{Session, Timeline};

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Genesis definitions file.
    pub genesis_path: PathBuf,
    /// Mutation log file.
    pub mutations_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            genesis_path: PathBuf::from("data/graph.json"),
            mutations_path: PathBuf::from("data/mutations.json"),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from environment variables.
    ///
    /// `HOST`, `PORT`, `GENESIS_PATH` and `MUTATIONS_PATH`; unset or
    /// unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "PORT is not a valid port, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            genesis_path: lookup("GENESIS_PATH").map(PathBuf::from).unwrap_or(defaults.genesis_path),
            mutations_path: lookup("MUTATIONS_PATH").map(PathBuf::from).unwrap_or(defaults.mutations_path),
        }
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared service state.
///
/// Contains the loaded timeline and the current session position.
pub struct ServiceState {
    /// Genesis, log and relevance index. Never mutated.
    pub timeline: Arc<Timeline>,
    /// Current position in the timeline.
    pub(crate) session: Arc<Mutex<Session>>,
}

impl ServiceState {
    /// Create state positioned at genesis.
    pub fn new(timeline: Timeline) -> Self {
        let session = timeline.session();
        Self {
            timeline: Arc::new(timeline),
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Version the shared session currently sits at.
    pub fn current_version(&self) -> usize {
        self.session.lock().version()
    }
}

impl Clone for ServiceState {
    fn clone(&self) -> Self {
        Self {
            timeline: Arc::clone(&self.timeline),
            session: Arc::clone(&self.session),
        }
    }
}
