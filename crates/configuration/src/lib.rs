use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{Config, DatabaseSettings, DemoSettings, LogFormat, LoggingSettings};

/// The file read by [`load_config`], relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides, e.g. `SCOPEDB__DATABASE__TARGET`.
pub const ENV_PREFIX: &str = "SCOPEDB";

/// Loads the application configuration.
///
/// Layers, lowest to highest precedence: built-in defaults, `config.toml` if it
/// exists, then `SCOPEDB__*` environment variables. The result is validated
/// before it is returned.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Like [`load_config`], reading the file at `path` instead. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .set_default("database.target", "scopedb.sqlite3")?
        .set_default("database.busy_timeout_ms", 5000)?
        .set_default("demo.fast_latency_ms", 100)?
        .set_default("demo.slow_latency_ms", 150)?
        .set_default("demo.batch_size", 100)?
        .set_default("demo.min_age", 25)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "full")?
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.target.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.target must not be empty".to_string(),
        ));
    }
    if config.demo.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "demo.batch_size must be greater than zero".to_string(),
        ));
    }
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "logging.level must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.database.target, "scopedb.sqlite3");
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.demo.fast_latency(), Duration::from_millis(100));
        assert_eq!(config.demo.slow_latency(), Duration::from_millis(150));
        assert_eq!(config.demo.batch_size, 100);
        assert_eq!(config.demo.min_age, 25);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Full);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"
            [database]
            target = "/tmp/demo.sqlite3"

            [demo]
            batch_size = 7

            [logging]
            format = "compact"
            directory = "logs"
            "#,
        );

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.database.target, "/tmp/demo.sqlite3");
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.demo.batch_size, 7);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.directory.as_deref(), Some(Path::new("logs")));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let (_dir, path) = write_config("[demo]\nbatch_size = 0\n");

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn blank_target_is_rejected() {
        let (_dir, path) = write_config("[database]\ntarget = \"  \"\n");

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn malformed_files_are_load_errors() {
        let (_dir, path) = write_config("[demo]\nbatch_size = \"many\"\n");

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
