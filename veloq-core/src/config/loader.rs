//! Configuration file loading.

use crate::config::schema::BrokerConfig;
use std::path::Path;
use tracing::info;

/// Load and validate a broker configuration file.
///
/// # Errors
/// Returns `Configuration` if the file cannot be read, parsed, or fails
/// validation. Configuration errors are fatal at startup.
pub fn load_file<P: AsRef<Path>>(path: P) -> crate::Result<BrokerConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Configuration(format!("cannot read config file {}: {e}", path.display()))
    })?;
    let config: BrokerConfig = toml::from_str(&raw).map_err(|e| {
        crate::Error::Configuration(format!("cannot parse config file {}: {e}", path.display()))
    })?;
    config.validate()?;
    info!(path = %path.display(), name = %config.core.name, "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_core_section() {
        let file = write_config(
            r#"
[Core]
Name = "node-a"
Port = 7001
SeedServer = "10.0.0.5"
SeedPort = 7001
HttpPort = 8080
RingSize = 3
Visibility = 45.0
SyncConfigInterval = 2000
LogLevel = "debug"
"#,
        );
        let config = load_file(file.path()).unwrap();
        assert_eq!(config.core.name, "node-a");
        assert_eq!(config.core.http_port, 8080);
        assert_eq!(config.core.ring_size, 3);
        assert_eq!(config.core.sync_config_interval, 2000);
        assert!((config.core.visibility - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let file = write_config("[Core]\nName = \"solo\"\n");
        let config = load_file(file.path()).unwrap();
        assert_eq!(config.core.name, "solo");
        assert_eq!(config.core.sync_config_interval, 5_000);
    }

    #[test]
    fn test_invalid_file_is_fatal() {
        let file = write_config("[Core]\nRingSize = 0\n");
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn test_absent_file_is_fatal() {
        assert!(load_file("/nonexistent/veloq.toml").is_err());
    }
}
