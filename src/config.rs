use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// `host[:port]` of the device on the local network
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000,
            timeout_ms: 10_000,
        }
    }
}

/// A value of 0 disables the timeout
impl HttpConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        millis(self.timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [device]
            address = "192.168.1.10"

            [http]
            connect_timeout_ms = 500
            timeout_ms = 2000

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.device.address, "192.168.1.10");
        assert_eq!(config.http.connect_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.http.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::parse("[device]\naddress = \"remo.local:80\"\n").unwrap();
        assert_eq!(config.device.address, "remo.local:80");
        assert_eq!(config.http.timeout_ms, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = Config::parse("[http]\nconnect_timeout_ms = 0\ntimeout_ms = 0\n").unwrap();
        assert_eq!(config.http.connect_timeout(), None);
        assert_eq!(config.http.timeout(), None);
    }

    #[test]
    fn test_invalid_toml_fails() {
        assert!(Config::parse("[device\naddress =").is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/remo-local.toml")).is_err());
    }
}
