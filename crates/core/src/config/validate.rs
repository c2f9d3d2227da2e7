use super::{types::Config, ConfigError};
use crate::sink::SinkKind;

/// Validate configuration
/// Currently validates:
/// - byte sizing values are positive and the average item fits the budget
/// - ceiling, concurrency override and progress interval are not 0
/// - the source file pattern compiles
/// - an http sink has an endpoint
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let dispatch = &config.dispatch;

    if dispatch.default_average_item_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.default_average_item_bytes cannot be 0".to_string(),
        ));
    }

    if dispatch.max_aggregate_batch_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.max_aggregate_batch_bytes cannot be 0".to_string(),
        ));
    }

    if dispatch.default_average_item_bytes > dispatch.max_aggregate_batch_bytes {
        return Err(ConfigError::ValidationError(format!(
            "dispatch.default_average_item_bytes ({}) exceeds dispatch.max_aggregate_batch_bytes ({})",
            dispatch.default_average_item_bytes, dispatch.max_aggregate_batch_bytes
        )));
    }

    if dispatch.global_item_ceiling == Some(0) {
        return Err(ConfigError::ValidationError(
            "dispatch.global_item_ceiling cannot be 0 (leave it unset for no limit)".to_string(),
        ));
    }

    if dispatch.max_concurrent_per_source == Some(0) {
        return Err(ConfigError::ValidationError(
            "dispatch.max_concurrent_per_source cannot be 0".to_string(),
        ));
    }

    if dispatch.progress_every == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.progress_every cannot be 0".to_string(),
        ));
    }

    if let Err(e) = regex_lite::Regex::new(&config.source.file_pattern) {
        return Err(ConfigError::ValidationError(format!(
            "source.file_pattern is not a valid regex: {}",
            e
        )));
    }

    if config.sink.kind == SinkKind::Http {
        match config.sink.endpoint.as_deref() {
            None | Some("") => {
                return Err(ConfigError::ValidationError(
                    "sink.endpoint is required when sink.kind = \"http\"".to_string(),
                ))
            }
            Some(endpoint) => {
                if reqwest::Url::parse(endpoint).is_err() {
                    return Err(ConfigError::ValidationError(format!(
                        "sink.endpoint is not a valid URL: {}",
                        endpoint
                    )));
                }
            }
        }
    }

    Ok(())
}
