//! Backend configuration from environment variables.

use crate::error::ConfigError;
use crate::{AVATAR_BUCKET, PROFILES_TABLE};

/// Where the hosted backend lives and how to address it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    pub avatar_bucket: String,
    pub profiles_table: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        Ok(Self {
            url,
            anon_key: anon_key.into(),
            avatar_bucket: AVATAR_BUCKET.to_string(),
            profiles_table: PROFILES_TABLE.to_string(),
        })
    }

    pub fn with_avatar_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.avatar_bucket = bucket.into();
        self
    }

    pub fn with_profiles_table(mut self, table: impl Into<String>) -> Self {
        self.profiles_table = table.into();
        self
    }

    /// Read the configuration from the process environment, loading `.env` first.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Browser builds have no process environment; the values are baked in at
    /// compile time.
    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| {
            match name {
                "BACKEND_URL" => option_env!("BACKEND_URL"),
                "BACKEND_ANON_KEY" => option_env!("BACKEND_ANON_KEY"),
                "BACKEND_AVATAR_BUCKET" => option_env!("BACKEND_AVATAR_BUCKET"),
                "BACKEND_PROFILES_TABLE" => option_env!("BACKEND_PROFILES_TABLE"),
                _ => None,
            }
            .map(str::to_string)
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("BACKEND_URL"))?;
        let anon_key = lookup("BACKEND_ANON_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("BACKEND_ANON_KEY"))?;

        let mut config = Self::new(url, anon_key)?;
        if let Some(bucket) = lookup("BACKEND_AVATAR_BUCKET").filter(|v| !v.is_empty()) {
            config = config.with_avatar_bucket(bucket);
        }
        if let Some(table) = lookup("BACKEND_PROFILES_TABLE").filter(|v| !v.is_empty()) {
            config = config.with_profiles_table(table);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_and_trailing_slash() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "https://project.example.co/"),
            ("BACKEND_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://project.example.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.avatar_bucket, "avatars");
        assert_eq!(config.profiles_table, "profiles");
    }

    #[test]
    fn test_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "http://localhost:54321"),
            ("BACKEND_ANON_KEY", "anon"),
            ("BACKEND_AVATAR_BUCKET", "pictures"),
            ("BACKEND_PROFILES_TABLE", "people"),
        ]))
        .unwrap();
        assert_eq!(config.avatar_bucket, "pictures");
        assert_eq!(config.profiles_table, "people");
    }

    #[test]
    fn test_missing_and_invalid() {
        assert_eq!(
            BackendConfig::from_lookup(lookup(&[("BACKEND_ANON_KEY", "anon")])),
            Err(ConfigError::Missing("BACKEND_URL"))
        );
        assert_eq!(
            BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "https://x.co")])),
            Err(ConfigError::Missing("BACKEND_ANON_KEY"))
        );
        assert_eq!(
            BackendConfig::new("x.co", "anon"),
            Err(ConfigError::InvalidUrl("x.co".into()))
        );
    }
}
