use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Concurrency, history, timeout and cache size limits are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.processor.max_concurrent_tasks == 0 {
        return Err(ConfigError::ValidationError(
            "processor.max_concurrent_tasks must be at least 1".to_string(),
        ));
    }

    if config.processor.task_history_limit == 0 {
        return Err(ConfigError::ValidationError(
            "processor.task_history_limit must be at least 1".to_string(),
        ));
    }

    if config.converter.tool_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "converter.tool_timeout_ms cannot be 0".to_string(),
        ));
    }

    if config.cache.max_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "cache.max_size_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}
