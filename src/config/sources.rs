use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "DOCQUEUE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/docqueue.toml";
const ENV_PREFIX: &str = "DOCQUEUE";
const ENV_SEPARATOR: &str = "__";
const EXTRACTOR_KEY_VAR: &str = "EXTRACTOR_API_KEY";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(api_key) = env::var(EXTRACTOR_KEY_VAR) {
        if !api_key.is_empty() {
            config.extractor.api_key = Some(api_key);
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // DOCQUEUE__WORKER__CONCURRENCY -> worker.concurrency
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    load_secrets(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.queue.test_limit, 10);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
data_dir = "/var/lib/docqueue"

[queue]
max_retries = 2
test_limit = 3
idle_backoff = "250ms"

[worker]
concurrency = 8
autostart = true
processed_folder = "processed"

[download]
folder = "downloads"
max_file_bytes = "20MB"
max_attempts = 1

[extractor]
endpoint = "https://extract.example.com/v1/documents"
request_timeout = "2m"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.catalog_path(), PathBuf::from("/var/lib/docqueue/catalog"));
        assert_eq!(config.queue.max_retries, 2);
        assert_eq!(config.queue.test_limit, 3);
        assert_eq!(config.queue.idle_backoff.as_duration(), Duration::from_millis(250));
        assert_eq!(config.worker.concurrency, 8);
        assert!(config.worker.autostart);
        assert_eq!(config.worker.processed_folder, Some(PathBuf::from("processed")));
        assert_eq!(config.download.folder, PathBuf::from("downloads"));
        assert_eq!(config.download.max_file_bytes.as_u64(), 20 * 1024 * 1024);
        assert_eq!(
            config.extractor.endpoint.as_deref(),
            Some("https://extract.example.com/v1/documents")
        );
        assert_eq!(config.extractor.request_timeout.as_duration(), Duration::from_secs(120));
    }
}
