//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

const SSL_MODES: &[&str] = &["disable", "prefer", "require"];

/// Validate the parts of the configuration every command relies on.
pub fn validate(config: &Config) -> Result<()> {
    if config.target.r#type != "mysql" {
        return Err(MigrateError::Config(format!(
            "target.type must be 'mysql', got '{}'",
            config.target.r#type
        )));
    }
    if !SSL_MODES.contains(&config.target.ssl_mode.to_lowercase().as_str()) {
        return Err(MigrateError::Config(format!(
            "target.ssl_mode must be one of {:?}, got '{}'",
            SSL_MODES, config.target.ssl_mode
        )));
    }
    if config.target.port == 0 {
        return Err(MigrateError::Config("target.port must be non-zero".into()));
    }
    if config.output.suffix.is_empty() {
        return Err(MigrateError::Config(
            "output.suffix must not be empty (the input would be overwritten)".into(),
        ));
    }
    if config.output.suffix.contains(['/', '\\']) {
        return Err(MigrateError::Config(format!(
            "output.suffix must not contain path separators, got '{}'",
            config.output.suffix
        )));
    }
    Ok(())
}

/// Additional checks before connecting to MySQL.
pub fn validate_for_execution(config: &Config) -> Result<()> {
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config(
            "target.database is required (set --database or DB_DATABASE)".into(),
        ));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;

    fn valid_config() -> Config {
        Config {
            target: TargetConfig {
                database: "target_db".to_string(),
                password: "password".to_string(),
                ..TargetConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
        assert!(validate_for_execution(&config).is_ok());
    }

    #[test]
    fn test_missing_database_only_fails_execution() {
        let mut config = valid_config();
        config.target.database = String::new();
        assert!(validate(&config).is_ok());
        let err = validate_for_execution(&config).unwrap_err();
        assert!(err.to_string().contains("target.database"));
    }

    #[test]
    fn test_missing_target_host() {
        let mut config = valid_config();
        config.target.host = String::new();
        assert!(validate_for_execution(&config).is_err());
    }

    #[test]
    fn test_wrong_target_type() {
        let mut config = valid_config();
        config.target.r#type = "postgres".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.target.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
        config.target.ssl_mode = "REQUIRE".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_suffix_rejected() {
        let mut config = valid_config();
        config.output.suffix = String::new();
        assert!(validate(&config).is_err());
        config.output.suffix = "../x".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let mut config = valid_config();
        config.target.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", config.target);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_456"),
            "Debug output should not contain actual password value"
        );
    }

    #[test]
    fn test_target_config_password_not_serialized() {
        let mut config = valid_config();
        config.target.password = "super_secret".to_string();
        let json = serde_json::to_string(&config.target).unwrap();
        assert!(!json.contains("super_secret"), "Password was serialized: {}", json);
    }
}
