use crate::images::{ImageAllowList, PatternError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";

pub const DEFAULT_IMAGE_ORIGINS: [&str; 2] = [
    "https://faoqoakoiatxpymudknr.supabase.co/storage/v1/object/public/objects/**",
    "https://*.vercel.app/**",
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("api url must start with http:// or https://, got {0:?}")]
    InvalidApiUrl(String),
    #[error(transparent)]
    InvalidImageOrigin(#[from] PatternError),
}

/// Runtime configuration of the browser client, served as `/app-config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_url: String,
    #[serde(default = "default_image_origins")]
    pub image_origins: Vec<String>,
}

fn default_image_origins() -> Vec<String> {
    DEFAULT_IMAGE_ORIGINS.iter().map(|o| o.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_url: DEFAULT_API_URL.to_string(),
            image_origins: default_image_origins(),
        }
    }
}

impl AppConfig {
    /// Builds a config from optional overrides. `image_origins` is a
    /// comma-separated list of patterns.
    pub fn from_overrides(
        api_url: Option<&str>,
        image_origins: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(url) = api_url.map(str::trim).filter(|url| !url.is_empty()) {
            config.api_url = url.to_string();
        }
        if let Some(origins) = image_origins {
            config.image_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        let has_host = ["http://", "https://"]
            .iter()
            .any(|scheme| url.starts_with(scheme) && url.len() > scheme.len());
        if !has_host {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }

        self.image_allow_list()?;
        Ok(())
    }

    /// Joins `path` onto the api base url without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn image_allow_list(&self) -> Result<ImageAllowList, PatternError> {
        ImageAllowList::new(self.image_origins.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let mut config = AppConfig::default();
        config.api_url = "https://object-manager-backend.vercel.app/".to_string();

        assert_eq!(
            config.endpoint("/api/objects"),
            "https://object-manager-backend.vercel.app/api/objects"
        );
        assert_eq!(
            config.endpoint("health"),
            "https://object-manager-backend.vercel.app/health"
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = AppConfig::from_overrides(
            Some(" https://api.example.com "),
            Some("https://cdn.example.com/**, https://*.vercel.app/**"),
        )
        .unwrap();

        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(
            config.image_origins,
            vec!["https://cdn.example.com/**", "https://*.vercel.app/**"]
        );
    }

    #[test]
    fn empty_overrides_keep_defaults() {
        let config = AppConfig::from_overrides(Some(""), None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn rejects_non_http_api_url() {
        assert_eq!(
            AppConfig::from_overrides(Some("localhost:3001"), None),
            Err(ConfigError::InvalidApiUrl("localhost:3001".to_string()))
        );
        assert!(AppConfig::from_overrides(Some("https://"), None).is_err());
    }

    #[test]
    fn rejects_bad_image_origin() {
        let err = AppConfig::from_overrides(None, Some("cdn.example.com")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidImageOrigin(_)));
    }

    #[test]
    fn missing_image_origins_deserialize_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"api_url":"http://a.b"}"#).unwrap();
        assert_eq!(config.image_origins.len(), 2);
    }
}
