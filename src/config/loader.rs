//! Settings loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, SettingsError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {}", join(.0))]
    Validation(Vec<SettingsError>),
}

fn join(errors: &[SettingsError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(content)?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}

/// Load settings from `path`, or defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let Some(path) = path else {
        return parse_settings("");
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = parse_settings(
            r#"
            [listener]
            bind_address = "0.0.0.0:8088"

            [stats]
            window_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(settings.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(settings.listener.request_timeout_secs, 30);
        assert_eq!(settings.stats.window_secs, 120);
        assert_eq!(settings.pool, Default::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\npath = \"/var/lib/relay/config.json\"\nwatch = false").unwrap();
        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.store.path, PathBuf::from("/var/lib/relay/config.json"));
        assert!(!settings.store.watch);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(load_settings(None), Ok(s) if s == Settings::default()));
        assert!(matches!(
            load_settings(Some(Path::new("/nonexistent/relay.toml"))),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(parse_settings("[listener"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            parse_settings("[pool]\nbuild_timeout_secs = 0"),
            Err(ConfigError::Validation(errors)) if errors.len() == 1
        ));
    }
}
