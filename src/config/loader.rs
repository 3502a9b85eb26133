//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    let config: GateConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::gate::LookupMode;
    use crate::routing::{AccessLevel, MatchKind};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.gate.login_path, "/auth/login");
        assert_eq!(config.gate.landing_path, "/mi-santuario");
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert!(!config.gate.routes.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            url = "http://127.0.0.1:3000"

            [gate]
            landing_path = "/inicio"
            lookup_mode = "concurrent"
            checkout_paths = ["/paywall"]

            [[gate.routes]]
            path = "/auth/login"
            kind = "exact"
            access = "auth"

            [[gate.routes]]
            path = "/inicio"
            access = "protected"

            [[gate.routes]]
            path = "/paywall"
            access = "auth_only"

            [backend]
            kind = "rest"
            base_url = "https://proyecto.example.co"
            api_key = "anon-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.gate.lookup_mode, LookupMode::Concurrent);
        assert_eq!(config.gate.routes.len(), 3);
        assert_eq!(config.gate.routes[0].kind, MatchKind::Exact);
        // Kind defaults to prefix.
        assert_eq!(config.gate.routes[1].kind, MatchKind::Prefix);
        assert_eq!(config.gate.routes[1].access, AccessLevel::Protected);
        assert_eq!(config.backend.kind, BackendKind::Rest);
        // Untouched fields keep their defaults.
        assert_eq!(config.gate.paywall_path, "/paywall");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[gate\nlogin_path = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_all() {
        let err = parse_config(
            r#"
            [listener]
            max_connections = 0

            [timeouts]
            request_secs = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.toml");
        std::fs::write(&path, "[gate]\nreturn_param = \"next\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.gate.return_param, "next");

        let missing = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }

    #[test]
    fn test_demo_config_is_valid() {
        let config = parse_config(include_str!("../../demos/gate.toml")).unwrap();
        assert!(config.admin.enabled);
        assert_eq!(config.backend.seed_path.as_deref(), Some("demos/seed.json"));
    }
}
