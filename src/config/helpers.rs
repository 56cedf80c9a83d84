use std::str::FromStr;

use crate::error::ConfigError;

/// Read an environment variable, treating unset and empty as absent.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("failed to read: {e}"),
        }),
    }
}

/// Parse an optional value from a lookup, falling back to `default`.
pub(crate) fn parse_optional<T>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(s) => s.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_uses_default_when_absent() {
        let port: u16 = parse_optional("BERTH_SSH_PORT", None, 22).unwrap();
        assert_eq!(port, 22);
    }

    #[test]
    fn parse_optional_reports_key_on_error() {
        let err = parse_optional::<u16>("BERTH_SSH_PORT", Some("ssh".into()), 22).unwrap_err();
        assert!(err.to_string().contains("BERTH_SSH_PORT"));
    }

    #[test]
    fn optional_env_treats_unset_as_none() {
        assert!(
            optional_env("BERTH_TEST_DEFINITELY_UNSET_VAR")
                .unwrap()
                .is_none()
        );
    }
}
