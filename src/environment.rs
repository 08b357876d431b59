use std::{env, str::FromStr as _};

use strum::{Display, EnumString};

/// Variable that selects the environment, and with it `config/{environment}.toml`.
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Reads [`ENVIRONMENT_VARIABLE`], falling back to development for unset
    /// or unknown values.
    #[must_use]
    pub fn current() -> Self {
        env::var(ENVIRONMENT_VARIABLE)
            .ok()
            .and_then(|s| Self::from_str(&s).ok())
            .unwrap_or_default()
    }
}
