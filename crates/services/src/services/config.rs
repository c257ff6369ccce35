//! Runtime configuration read from the environment.

use std::{fmt::Display, str::FromStr};

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Hosted backend endpoints and keys
#[derive(Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: SecretString,
    pub service_role_key: SecretString,
    /// HS256 secret used to verify access tokens locally
    pub jwt_secret: SecretString,
    /// Serverless function invoked for outgoing e-mail
    pub email_function: String,
}

#[derive(Debug)]
pub struct StorageConfig {
    pub documents_bucket: String,
    pub receipts_bucket: String,
    pub max_upload_bytes: usize,
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Frontend origin used for confirmation and invitation redirects
    pub site_url: String,
    pub rent_due_day: u32,
    pub supabase: SupabaseConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rent_due_day: u32 = parse_or(&lookup, "RENT_DUE_DAY", 15)?;
        if !(1..=31).contains(&rent_due_day) {
            return Err(ConfigError::Invalid {
                key: "RENT_DUE_DAY",
                message: format!("{rent_due_day} is not a day of the month"),
            });
        }

        Ok(Self {
            database_url: string_or(&lookup, "DATABASE_URL", "sqlite://primeliving.db"),
            host: string_or(&lookup, "HOST", "127.0.0.1"),
            port: parse_or(&lookup, "PORT", 3001)?,
            site_url: string_or(&lookup, "SITE_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            rent_due_day,
            supabase: SupabaseConfig {
                url: required(&lookup, "SUPABASE_URL")?
                    .trim_end_matches('/')
                    .to_string(),
                anon_key: required(&lookup, "SUPABASE_ANON_KEY")?.into(),
                service_role_key: required(&lookup, "SUPABASE_SERVICE_ROLE_KEY")?.into(),
                jwt_secret: required(&lookup, "SUPABASE_JWT_SECRET")?.into(),
                email_function: string_or(&lookup, "EMAIL_FUNCTION_NAME", "send-email"),
            },
            storage: StorageConfig {
                documents_bucket: string_or(&lookup, "DOCUMENTS_BUCKET", "tenant-documents"),
                receipts_bucket: string_or(&lookup, "RECEIPTS_BUCKET", "payment-receipts"),
                max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
                signed_url_ttl_secs: parse_or(&lookup, "SIGNED_URL_TTL_SECS", 3600)?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn string_or<F>(lookup: &F, key: &'static str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service"),
        ("SUPABASE_JWT_SECRET", "jwt-secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_missing() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.rent_due_day, 15);
        assert_eq!(config.supabase.url, "https://project.supabase.co");
        assert_eq!(config.supabase.jwt_secret.expose_secret(), "jwt-secret");
        assert_eq!(config.storage.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
    }

    #[test]
    fn missing_required_value_is_named() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_JWT_SECRET")));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            Config::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RENT_DUE_DAY", "32"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
