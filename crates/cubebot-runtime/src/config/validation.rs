//! Semantic checks that figment extraction cannot express.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CubeConfig, LogOutput};

/// Validates a loaded configuration.
///
/// `deploy` additionally requires the credentials needed to register
/// commands with the platform.
pub fn validate_config(config: &CubeConfig, deploy: bool) -> ConfigResult<()> {
    if config.interactions.modal_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "interactions.modal_timeout_secs must be greater than 0",
        ));
    }
    if config.interactions.event_buffer == 0 {
        return Err(ConfigError::validation(
            "interactions.event_buffer must be greater than 0",
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    #[cfg(not(feature = "json-log"))]
    if config.logging.format == super::schema::LogFormat::Json {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the json-log feature",
        ));
    }

    if deploy {
        if config.bot.token.is_empty() {
            return Err(ConfigError::missing_field("bot.token"));
        }
        if config.bot.application_id.is_empty() {
            return Err(ConfigError::missing_field("bot.application_id"));
        }
    }
    Ok(())
}
