//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("listener.max_connections must be greater than 0")]
    ZeroMaxConnections,
    #[error("websocket.{0} must be greater than 0")]
    ZeroLimit(&'static str),
    #[error("websocket.max_frame_bytes ({frame}) exceeds max_message_bytes ({message})")]
    FrameExceedsMessage { frame: usize, message: usize },
    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let ws = &config.websocket;
    if ws.max_message_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_message_bytes"));
    }
    if ws.max_frame_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_frame_bytes"));
    }
    if ws.message_buffer == 0 {
        errors.push(ValidationError::ZeroLimit("message_buffer"));
    }
    if ws.max_frame_bytes > ws.max_message_bytes {
        errors.push(ValidationError::FrameExceedsMessage {
            frame: ws.max_frame_bytes,
            message: ws.max_message_bytes,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.listener.max_connections = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("not-an-address".into()),
                ValidationError::ZeroMaxConnections,
                ValidationError::LogLevel("loud".into()),
            ]
        );
    }

    #[test]
    fn test_frame_limit_checked_against_message_limit() {
        let mut config = RouterConfig::default();
        config.websocket.max_message_bytes = 1024;
        config.websocket.max_frame_bytes = 4096;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::FrameExceedsMessage { frame: 4096, message: 1024 }]
        );
    }

    #[test]
    fn test_zero_message_buffer_rejected() {
        let mut config = RouterConfig::default();
        config.websocket.message_buffer = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ZeroLimit("message_buffer")]);
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = RouterConfig::default();
        config.observability.log_level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
