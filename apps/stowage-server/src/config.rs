//! Server configuration.

use std::path::PathBuf;

/// Origins allowed when `ALLOWED_ORIGINS` is not set: the Vite dev server.
pub const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// HTTP server configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub listen: String,
    /// Origins the CORS layer answers for.
    pub allowed_origins: Vec<String>,
    /// Directory audit log files are appended to.
    pub audit_dir: PathBuf,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_owned(),
            allowed_origins: DEFAULT_ORIGINS.iter().map(ToString::to_string).collect(),
            audit_dir: PathBuf::from("./logs"),
            log_level: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SERVER_LISTEN` | `0.0.0.0:8000` |
    /// | `ALLOWED_ORIGINS` | the Vite dev origins |
    /// | `AUDIT_DIR` | `./logs` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SERVER_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("ALLOWED_ORIGINS") {
            let origins = parse_origins(&v);
            if !origins.is_empty() {
                config.allowed_origins = origins;
            }
        }
        if let Ok(v) = std::env::var("AUDIT_DIR") {
            config.audit_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Parse a comma-separated origin list, dropping empty entries.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_owned())
        .filter(|origin| !origin.is_empty())
        .collect()
}
