//! Settings validation.
//!
//! Serde handles syntax; this checks value ranges and addresses. All
//! problems are reported at once, not just the first.

use std::net::SocketAddr;

use crate::config::schema::Settings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct SettingsError {
    pub field: &'static str,
    pub message: String,
}

impl SettingsError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<SettingsError>> {
    let mut errors = Vec::new();

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(SettingsError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", settings.listener.bind_address),
        ));
    }
    if settings.listener.request_timeout_secs == 0 {
        errors.push(SettingsError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if settings.store.path.as_os_str().is_empty() {
        errors.push(SettingsError::new("store.path", "must not be empty"));
    }

    if settings.stats.window_secs == 0 {
        errors.push(SettingsError::new("stats.window_secs", "must be > 0"));
    }
    if !(settings.stats.rate_unit_scale.is_finite() && settings.stats.rate_unit_scale > 0.0) {
        errors.push(SettingsError::new("stats.rate_unit_scale", "must be a positive number"));
    }
    if settings.stats.prune_interval_secs == 0 {
        errors.push(SettingsError::new("stats.prune_interval_secs", "must be > 0"));
    }

    if settings.pool.build_timeout_secs == 0 {
        errors.push(SettingsError::new("pool.build_timeout_secs", "must be > 0"));
    }

    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(SettingsError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", settings.observability.metrics_address),
        ));
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
    fn test_defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = Settings::default();
        settings.listener.bind_address = "not-an-addr".into();
        settings.stats.window_secs = 0;
        settings.stats.rate_unit_scale = f64::NAN;
        settings.pool.build_timeout_secs = 0;

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "stats.window_secs",
                "stats.rate_unit_scale",
                "pool.build_timeout_secs",
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut settings = Settings::default();
        settings.observability.metrics_address = "nope".into();
        assert!(validate_settings(&settings).is_ok());

        settings.observability.metrics_enabled = true;
        assert!(validate_settings(&settings).is_err());
    }
}
