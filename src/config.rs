use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::environment::Environment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tracing: TracingConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TracingConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Arm scheduled jobs at startup. Unset means on in production only.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Timezone every schedule is evaluated in (default: UTC)
    #[serde(
        default = "default_timezone",
        deserialize_with = "deserialize_timezone",
        serialize_with = "serialize_timezone"
    )]
    pub timezone: Tz,
    /// Days of run history the cleanup job keeps (default: 90)
    #[serde(default = "default_run_retention_days")]
    pub run_retention_days: u32,
}

impl SchedulerConfig {
    pub fn is_enabled(&self, environment: Environment) -> bool {
        self.enabled
            .unwrap_or(environment == Environment::Production)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            timezone: default_timezone(),
            run_retention_days: default_run_retention_days(),
        }
    }
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn serialize_timezone<S>(timezone: &Tz, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(timezone.name())
}

const fn default_timezone() -> Tz {
    Tz::UTC
}

const fn default_run_retention_days() -> u32 {
    90
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_config(toml: &str) -> SchedulerConfig {
        config_rs::Config::builder()
            .add_source(config_rs::File::from_str(toml, config_rs::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_scheduler_defaults() {
        let config = scheduler_config("");

        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.run_retention_days, 90);
        assert!(config.is_enabled(Environment::Production));
        assert!(!config.is_enabled(Environment::Development));
        assert!(!config.is_enabled(Environment::Test));
    }

    #[test]
    fn test_scheduler_explicit_values() {
        let config = scheduler_config(
            r#"
            enabled = true
            timezone = "America/New_York"
            run_retention_days = 7
            "#,
        );

        assert_eq!(config.timezone, Tz::America__New_York);
        assert_eq!(config.run_retention_days, 7);
        assert!(config.is_enabled(Environment::Development));
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let result = config_rs::Config::builder()
            .add_source(config_rs::File::from_str(
                r#"timezone = "Mars/Olympus""#,
                config_rs::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<SchedulerConfig>();

        assert!(result.is_err());
    }
}
