//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default API host when no override is set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// 10 MiB, the backend's per-file limit.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// The backend accepts at most this many files per registration.
pub const DEFAULT_MAX_FILES: usize = 10;

/// MIME types the registration backend accepts.
pub const ALLOWED_FILE_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/jpg",
];

/// Limits applied to document selection before anything is sent.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Maximum number of files per registration.
    pub max_files: usize,
    /// Accepted content types. Empty means any type.
    pub allowed_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            allowed_types: ALLOWED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UploadLimits {
    pub fn allows_type(&self, content_type: &str) -> bool {
        self.allowed_types.is_empty()
            || self
                .allowed_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(content_type))
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the registration API, without a trailing slash.
    pub api_base_url: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Whether unrecognized input is forwarded to `/api/ai/chat`.
    pub fallback_enabled: bool,
    pub upload_limits: UploadLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            fallback_enabled: true,
            upload_limits: UploadLimits::default(),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("REGISTRATION_API_URL")
            .or_else(|| lookup("VITE_API_URL"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        reqwest::Url::parse(&raw_url).map_err(|e| ConfigError::InvalidValue {
            key: "REGISTRATION_API_URL".into(),
            message: format!("{raw_url}: {e}"),
        })?;
        let api_base_url = raw_url.trim_end_matches('/').to_string();

        let timeout_secs: u64 = lookup("REGISTRATION_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_file_size: u64 = lookup("REGISTRATION_MAX_FILE_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let max_files: usize = lookup("REGISTRATION_MAX_FILES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILES);

        let fallback_enabled = lookup("REGISTRATION_FALLBACK")
            .map(|s| !matches!(s.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            fallback_enabled,
            upload_limits: UploadLimits {
                max_file_size,
                max_files,
                ..UploadLimits::default()
            },
        })
    }

    /// Join a path onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.fallback_enabled);
        assert_eq!(config.upload_limits.max_files, 10);
        assert_eq!(config.upload_limits.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn override_strips_trailing_slash() {
        let config = ClientConfig::from_lookup(lookup(&[(
            "REGISTRATION_API_URL",
            "https://api.example.com/",
        )]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(
            config.endpoint("/api/v1/register"),
            "https://api.example.com/api/v1/register"
        );
    }

    #[test]
    fn vite_variable_is_honored_as_fallback() {
        let config =
            ClientConfig::from_lookup(lookup(&[("VITE_API_URL", "http://10.0.0.5:9000")])).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.5:9000");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("REGISTRATION_API_URL", "not a url")]))
            .unwrap_err();
        assert!(err.to_string().contains("REGISTRATION_API_URL"));
    }

    #[test]
    fn numeric_overrides_and_fallback_toggle() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REGISTRATION_HTTP_TIMEOUT_SECS", "5"),
            ("REGISTRATION_MAX_FILES", "3"),
            ("REGISTRATION_MAX_FILE_SIZE", "2048"),
            ("REGISTRATION_FALLBACK", "off"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.upload_limits.max_files, 3);
        assert_eq!(config.upload_limits.max_file_size, 2048);
        assert!(!config.fallback_enabled);
    }

    #[test]
    fn allowed_types_match_case_insensitively() {
        let limits = UploadLimits::default();
        assert!(limits.allows_type("application/PDF"));
        assert!(!limits.allows_type("text/plain"));

        let open = UploadLimits {
            allowed_types: vec![],
            ..UploadLimits::default()
        };
        assert!(open.allows_type("text/plain"));
    }
}
