use std::time::Duration;

use crate::error::{ServiceError, CONFIGURATION_MESSAGE};

pub const DEFAULT_PREFERRED_MODEL: &str = "gemini-1.5-flash-001";
pub const DEFAULT_FAMILY_MARKERS: &[&str] = &["gemini", "bison"];
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 365;

const PLACEHOLDER_KEY_MARKER: &str = "YOUR_KEY";

/// Process-wide, read-only settings built once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub preferred_model: String,
    /// Lower-cased substrings identifying acceptable fallback models
    pub family_markers: Vec<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    /// Send the syllabus document to the model instead of a text-only prompt
    pub attach_documents: bool,
    pub default_days: u32,
    pub plan_subject: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            preferred_model: DEFAULT_PREFERRED_MODEL.to_string(),
            family_markers: DEFAULT_FAMILY_MARKERS.iter().map(|m| m.to_string()).collect(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
            attach_documents: true,
            default_days: DEFAULT_DAYS,
            plan_subject: "Engineering Calculus".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load from process environment (call `dotenv` first)
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values are
    /// configuration errors; an unusable API key is not, see [`AppConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let family_markers = match get("MODEL_FAMILY_MARKERS") {
            Some(raw) => {
                let markers: Vec<String> = raw
                    .split(',')
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect();
                if markers.is_empty() {
                    return Err(ServiceError::Configuration(
                        "MODEL_FAMILY_MARKERS must name at least one family".to_string(),
                    ));
                }
                markers
            }
            None => defaults.family_markers,
        };

        Ok(Self {
            api_key: lookup("GOOGLE_API_KEY"),
            preferred_model: get("PREFERRED_MODEL").unwrap_or(defaults.preferred_model),
            family_markers,
            api_base: get("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            request_timeout: match get("REQUEST_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", &v)?),
                None => defaults.request_timeout,
            },
            attach_documents: match get("ATTACH_DOCUMENTS") {
                Some(v) => parse_bool("ATTACH_DOCUMENTS", &v)?,
                None => defaults.attach_documents,
            },
            default_days: match get("DEFAULT_DAYS") {
                Some(v) => parse_var("DEFAULT_DAYS", &v)?,
                None => defaults.default_days,
            },
            plan_subject: get("PLAN_SUBJECT").unwrap_or(defaults.plan_subject),
            port: match get("PORT") {
                Some(v) => parse_var("PORT", &v)?,
                None => defaults.port,
            },
        })
    }

    /// Check the provider credential. Every request is rejected with the
    /// same fixed message while this fails.
    pub fn validate(&self) -> Result<&str, ServiceError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && !key.contains(PLACEHOLDER_KEY_MARKER) => Ok(key),
            _ => Err(ServiceError::Configuration(CONFIGURATION_MESSAGE.to_string())),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::Configuration(format!("{} has invalid value '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ServiceError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::Configuration(format!(
            "{} has invalid value '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ServiceError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.preferred_model, DEFAULT_PREFERRED_MODEL);
        assert_eq!(config.family_markers, vec!["gemini", "bison"]);
        assert_eq!(config.default_days, 7);
        assert!(config.attach_documents);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("PREFERRED_MODEL", "gemini-2.5-flash"),
            ("MODEL_FAMILY_MARKERS", "Gemini, PaLM ,"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1beta/"),
            ("ATTACH_DOCUMENTS", "off"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(config.preferred_model, "gemini-2.5-flash");
        assert_eq!(config.family_markers, vec!["gemini", "palm"]);
        assert_eq!(config.api_base, "http://localhost:9000/v1beta");
        assert!(!config.attach_documents);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_bad_numeric_value_is_configuration_error() {
        let err = config_from(&[("REQUEST_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_missing_and_placeholder_keys() {
        let missing = config_from(&[]).unwrap();
        assert_eq!(
            missing.validate().unwrap_err(),
            ServiceError::Configuration(CONFIGURATION_MESSAGE.to_string())
        );

        let placeholder = config_from(&[("GOOGLE_API_KEY", "YOUR_KEY_HERE")]).unwrap();
        assert!(placeholder.validate().is_err());

        let real = config_from(&[("GOOGLE_API_KEY", "AIza-test")]).unwrap();
        assert_eq!(real.validate().unwrap(), "AIza-test");
    }
}
