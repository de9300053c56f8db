use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub tick_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub demo_email: String,
    pub demo_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_cache_path: Option<PathBuf>,
    pub skip_overlapping_polls: bool,
    pub clamp_step_regression: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8003".to_string(),
            poll_interval_secs: 3,
            tick_interval_secs: 1,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            demo_email: "demo@creatoros.com".to_string(),
            demo_password: "demo123456".to_string(),
            token_cache_path: None,
            skip_overlapping_polls: true,
            clamp_step_regression: true,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<TrackerConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<TrackerConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            #[cfg(not(test))]
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            TrackerConfig::default()
        }
    } else {
        #[cfg(not(test))]
        tracing::info!("No config path provided, using defaults");
        TrackerConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &TrackerConfig) -> Result<()> {
    let url = config.api_base_url.trim();
    if url.is_empty() {
        anyhow::bail!("api_base_url cannot be empty");
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("api_base_url must start with http:// or https://");
    }

    if config.poll_interval_secs == 0 {
        anyhow::bail!("poll_interval_secs must be at least 1");
    }

    if config.tick_interval_secs == 0 {
        anyhow::bail!("tick_interval_secs must be at least 1");
    }

    if config.request_timeout_secs == 0 {
        anyhow::bail!("request_timeout_secs must be at least 1");
    }

    if config.demo_email.trim().is_empty() {
        anyhow::bail!("demo_email cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn arb_tracker_config() -> impl Strategy<Value = TrackerConfig> {
        (
            prop_oneof![Just("http://"), Just("https://")],
            "[a-z]{1,12}(\\.[a-z]{2,5})?(:[0-9]{2,5})?",
            1_u64..120,
            1_u64..10,
            1_u64..600,
            1_u64..60,
            "[a-z]{1,10}@[a-z]{1,10}\\.com",
            "[a-zA-Z0-9]{0,16}",
            prop::option::of("[a-z]{1,8}/[a-z]{1,8}\\.json".prop_map(PathBuf::from)),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(
                |(
                    scheme,
                    host,
                    poll_interval_secs,
                    tick_interval_secs,
                    request_timeout_secs,
                    connect_timeout_secs,
                    demo_email,
                    demo_password,
                    token_cache_path,
                    skip_overlapping_polls,
                    clamp_step_regression,
                )| TrackerConfig {
                    api_base_url: format!("{}{}", scheme, host),
                    poll_interval_secs,
                    tick_interval_secs,
                    request_timeout_secs,
                    connect_timeout_secs,
                    demo_email,
                    demo_password,
                    token_cache_path,
                    skip_overlapping_polls,
                    clamp_step_regression,
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any valid config written as TOML loads back unchanged.
        #[test]
        fn prop_config_round_trip(config in arb_tracker_config()) {
            let toml_string = toml::to_string(&config)
                .expect("Failed to serialize config to TOML");

            let mut temp_file = NamedTempFile::new()
                .expect("Failed to create temp file");
            temp_file.write_all(toml_string.as_bytes())
                .expect("Failed to write to temp file");
            temp_file.flush()
                .expect("Failed to flush temp file");

            let loaded_config = load_config(Some(temp_file.path()))
                .expect("Failed to load config from file");

            prop_assert_eq!(config, loaded_config);
        }
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let non_existent_path = PathBuf::from("/tmp/non_existent_tracker_config_12345.toml");
        let config = load_config(Some(&non_existent_path)).expect("Should load defaults");
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_no_config_path_uses_defaults() {
        let config = load_config(None).expect("Should load defaults");
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_syntax() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(b"this is not valid TOML {{{")
            .expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let result = load_config(Some(temp_file.path()));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("parse TOML"));
    }

    #[test]
    fn test_partial_config_with_defaults() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let partial_toml = r#"
api_base_url = "https://api.vidova.example"
poll_interval_secs = 5
"#;
        temp_file
            .write_all(partial_toml.as_bytes())
            .expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let config = load_config(Some(temp_file.path())).expect("Should load partial config");

        assert_eq!(config.api_base_url, "https://api.vidova.example");
        assert_eq!(config.poll_interval_secs, 5);

        let defaults = TrackerConfig::default();
        assert_eq!(config.tick_interval_secs, defaults.tick_interval_secs);
        assert_eq!(config.demo_email, defaults.demo_email);
        assert_eq!(config.token_cache_path, None);
        assert!(config.skip_overlapping_polls);
    }

    #[test]
    fn test_validation_empty_base_url() {
        let config = TrackerConfig {
            api_base_url: "  ".to_string(),
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("api_base_url"));
    }

    #[test]
    fn test_validation_base_url_without_scheme() {
        let config = TrackerConfig {
            api_base_url: "localhost:8003".to_string(),
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("http://"));
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let config = TrackerConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("poll_interval_secs"));
    }

    #[test]
    fn test_validation_zero_tick_interval() {
        let config = TrackerConfig {
            tick_interval_secs: 0,
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("tick_interval_secs"));
    }

    #[test]
    fn test_validation_empty_demo_email() {
        let config = TrackerConfig {
            demo_email: String::new(),
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("demo_email"));
    }
}
