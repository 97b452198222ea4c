use rocket::figment::Figment;
use serde::Deserialize;

use std::path::PathBuf;
use std::time::Duration;

use crate::internal_error::{InternalError, InternalResult};

/// Planner settings, read from the same figment as Rocket's own config
/// (`Rocket.toml`, `ROCKET_*` environment variables).
#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("dayplanner.db")
}

fn default_save_debounce_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> InternalResult<AppConfig> {
        figment
            .extract::<AppConfig>()
            .map_err(|e| InternalError::Invalid(format!("bad configuration: {}", e)))
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = AppConfig::from_figment(&Figment::new()).unwrap();

        assert_eq!(config.database_path, PathBuf::from("dayplanner.db"));
        assert_eq!(config.save_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let figment = Figment::new()
            .merge(("database_path", "/tmp/planner-test.db"))
            .merge(("save_debounce_ms", 25));
        let config = AppConfig::from_figment(&figment).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/planner-test.db"));
        assert_eq!(config.save_debounce_ms, 25);
    }
}
