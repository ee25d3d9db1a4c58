use std::env;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// `sqlite` or `file`
    pub storage_backend: String,
    pub db_path: String,
    pub db_max_connections: u32,
    pub data_file: String,
    pub listen_addr: String,
    pub ping_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            storage_backend: get_env("STORAGE_BACKEND", "sqlite").trim().to_lowercase(),
            db_path: get_env("DB_PATH", "/data/patchbay.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            data_file: get_env("DATA_FILE", "/data/patchbay.json"),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            ping_timeout_secs: get_env("PING_TIMEOUT_SECS", "2")
                .parse()
                .unwrap_or(2),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
