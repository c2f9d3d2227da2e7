use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `DISPATCHER_DISPATCH__GLOBAL_ITEM_CEILING=500`
const ENV_PREFIX: &str = "DISPATCHER_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::new().merge(Toml::file(path)))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(Figment::new())
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .merge(legacy_env())
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// `TASK_LIMIT` and `MAX_PARALLEL_TASKS` predate the prefixed variables and are still honoured.
fn legacy_env() -> Env {
    Env::raw()
        .only(&["TASK_LIMIT", "MAX_PARALLEL_TASKS"])
        .map(|key| {
            if key.as_str().eq_ignore_ascii_case("TASK_LIMIT") {
                "dispatch.global_item_ceiling".into()
            } else {
                "dispatch.max_concurrent_per_source".into()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[dispatch]
global_item_ceiling = 500

[status]
path = "state/tasks.json"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.dispatch.global_item_ceiling, Some(500));
        assert_eq!(config.status.path.to_str().unwrap(), "state/tasks.json");
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[dispatch]
global_item_ceiling = "lots"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/dispatcher.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[dispatch]
max_concurrent_per_source = 8
retry_failed = false

[sink]
kind = "http"
endpoint = "http://127.0.0.1:9000/requests"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.dispatch.max_concurrent_per_source, Some(8));
        assert!(!config.dispatch.retry_failed);
        assert_eq!(
            config.sink.endpoint.as_deref(),
            Some("http://127.0.0.1:9000/requests")
        );
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "dispatcher.toml",
                r#"
[dispatch]
global_item_ceiling = 10
"#,
            )?;
            jail.set_env("DISPATCHER_DISPATCH__GLOBAL_ITEM_CEILING", "25");
            jail.set_env("DISPATCHER_STATUS__BACKEND", "sqlite");

            let config = load_config(Path::new("dispatcher.toml")).unwrap();
            assert_eq!(config.dispatch.global_item_ceiling, Some(25));
            assert_eq!(
                config.status.backend,
                crate::config::StatusBackendKind::Sqlite
            );
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_names() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TASK_LIMIT", "100");
            jail.set_env("MAX_PARALLEL_TASKS", "5");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.dispatch.global_item_ceiling, Some(100));
            assert_eq!(config.dispatch.max_concurrent_per_source, Some(5));
            Ok(())
        });
    }
}
