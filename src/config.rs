//! Service configuration.
//!
//! Defaults match the original deployment: localhost on port 8000, keyspace
//! `task_manager`, migrations next to the binary. Environment variables with
//! the `TASKROW_` prefix override individual fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Keyspace holding the task tables (default: "task_manager")
    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    /// Directory of `.cql` migration files (default: "./migrations")
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_keyspace() -> String {
    "task_manager".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("./migrations")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keyspace: default_keyspace(),
            migrations_dir: default_migrations_dir(),
        }
    }
}

impl AppConfig {
    /// Defaults with `TASKROW_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("TASKROW_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("TASKROW_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(keyspace) = std::env::var("TASKROW_KEYSPACE") {
            config.keyspace = keyspace;
        }
        if let Ok(dir) = std::env::var("TASKROW_MIGRATIONS_DIR") {
            config.migrations_dir = PathBuf::from(dir);
        }
        config
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
