//! HTTP client for the hosted backend (auth, storage and functions APIs).

use std::{sync::Arc, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

use super::config::SupabaseConfig;

#[derive(Debug, Clone, Error)]
pub enum BaasError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("json error: {0}")]
    Serde(String),
}

impl BaasError {
    /// Returns true if the error is transient and should be retried. A
    /// request that may have reached the backend (timeout, dropped
    /// connection) is only retried when repeating it has no extra effect.
    pub fn should_retry(&self, idempotent: bool) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => idempotent,
            Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Human readable message pulled from a JSON error body, if any.
    pub fn provider_message(&self) -> Option<String> {
        let body = match self {
            Self::Http { body, .. } | Self::Unauthorized(body) => body,
            _ => return None,
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::RateLimited => Some(429),
            _ => None,
        }
    }
}

/// Credential attached to a request
#[derive(Debug, Clone, Copy)]
pub enum BaasAuth<'a> {
    /// Public anon key, as a browser client would send
    Anon,
    /// Service-role key for admin operations
    ServiceRole,
    /// A signed-in user's access token
    User(&'a str),
}

struct Keys {
    anon: SecretString,
    service_role: SecretString,
}

#[derive(Clone)]
pub struct BaasClient {
    http: Client,
    base_url: String,
    keys: Arc<Keys>,
}

impl BaasClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(config: &SupabaseConfig) -> Result<Self, BaasError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("primeliving/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BaasError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            keys: Arc::new(Keys {
                anon: SecretString::from(config.anon_key.expose_secret().to_owned()),
                service_role: SecretString::from(config.service_role_key.expose_secret().to_owned()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn builder(&self, method: Method, path: &str, auth: BaasAuth<'_>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let (api_key, bearer) = match auth {
            BaasAuth::Anon => (self.keys.anon.expose_secret(), self.keys.anon.expose_secret()),
            BaasAuth::ServiceRole => (
                self.keys.service_role.expose_secret(),
                self.keys.service_role.expose_secret(),
            ),
            BaasAuth::User(token) => (self.keys.anon.expose_secret(), token),
        };
        self.http
            .request(method, url)
            .header("apikey", api_key)
            .bearer_auth(bearer)
    }

    /// Send a JSON request and decode a JSON response, retrying transient failures.
    pub async fn json<B, T>(
        &self,
        method: Method,
        path: &str,
        auth: BaasAuth<'_>,
        body: Option<&B>,
    ) -> Result<T, BaasError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self
            .with_retry(is_idempotent(&method), || {
                let mut req = self.builder(method.clone(), path, auth);
                if let Some(body) = body {
                    req = req.json(body);
                }
                req
            })
            .await?;
        res.json::<T>()
            .await
            .map_err(|e| BaasError::Serde(e.to_string()))
    }

    /// Like [`Self::json`] but discards the response body.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        auth: BaasAuth<'_>,
        body: Option<&B>,
    ) -> Result<(), BaasError>
    where
        B: Serialize + ?Sized,
    {
        self.with_retry(is_idempotent(&method), || {
            let mut req = self.builder(method.clone(), path, auth);
            if let Some(body) = body {
                req = req.json(body);
            }
            req
        })
        .await?;
        Ok(())
    }

    /// Upload raw bytes (storage objects).
    pub async fn upload(
        &self,
        path: &str,
        auth: BaasAuth<'_>,
        content_type: &str,
        data: Bytes,
        upsert: bool,
    ) -> Result<(), BaasError> {
        self.with_retry(upsert, || {
            self.builder(Method::POST, path, auth)
                .header("content-type", content_type)
                .header("x-upsert", if upsert { "true" } else { "false" })
                .body(data.clone())
        })
        .await?;
        Ok(())
    }

    async fn with_retry<F>(&self, idempotent: bool, build: F) -> Result<Response, BaasError>
    where
        F: Fn() -> RequestBuilder,
    {
        (|| async { Self::execute(build()).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(250))
                    .with_max_delay(Duration::from_secs(5))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &BaasError| e.should_retry(idempotent))
            .notify(|e, dur| {
                warn!(
                    "Backend call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn execute(req: RequestBuilder) -> Result<Response, BaasError> {
        let res = req.send().await.map_err(map_reqwest_error)?;
        match res.status() {
            s if s.is_success() => Ok(res),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = res.text().await.unwrap_or_default();
                Err(BaasError::Unauthorized(body))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(BaasError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(BaasError::Http { status, body })
            }
        }
    }
}

/// POSTs create things on the backend (accounts, invitations, objects).
fn is_idempotent(method: &Method) -> bool {
    *method != Method::POST
}

fn map_reqwest_error(e: reqwest::Error) -> BaasError {
    if e.is_timeout() {
        BaasError::Timeout
    } else {
        BaasError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_only_transient_failures() {
        assert!(BaasError::Timeout.should_retry(true));
        assert!(BaasError::RateLimited.should_retry(true));
        assert!(
            BaasError::Http {
                status: 503,
                body: String::new()
            }
            .should_retry(true)
        );
        assert!(
            !BaasError::Http {
                status: 400,
                body: String::new()
            }
            .should_retry(true)
        );
        assert!(!BaasError::Unauthorized(String::new()).should_retry(true));
    }

    #[test]
    fn creating_requests_are_not_repeated_after_a_timeout() {
        assert!(!is_idempotent(&Method::POST));
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::DELETE));

        assert!(!BaasError::Timeout.should_retry(false));
        assert!(!BaasError::Transport("connection reset".into()).should_retry(false));
        assert!(BaasError::RateLimited.should_retry(false));
        assert!(
            BaasError::Http {
                status: 502,
                body: String::new()
            }
            .should_retry(false)
        );
    }

    #[test]
    fn provider_message_reads_known_keys() {
        let err = BaasError::Http {
            status: 400,
            body: r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#
                .to_string(),
        };
        assert_eq!(err.provider_message().as_deref(), Some("Invalid login credentials"));

        let err = BaasError::Http {
            status: 400,
            body: r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#.to_string(),
        };
        assert_eq!(err.provider_message().as_deref(), Some("Email not confirmed"));

        let err = BaasError::Http {
            status: 500,
            body: "gateway exploded".to_string(),
        };
        assert_eq!(err.provider_message(), None);
    }
}
