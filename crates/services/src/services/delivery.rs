//! Outgoing e-mail and SMS channels.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::baas::{BaasAuth, BaasClient, BaasError};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{channel} delivery is not implemented")]
    NotImplemented { channel: &'static str },
    #[error("delivery rejected: {0}")]
    Rejected(String),
    #[error("delivery failed: {0}")]
    Backend(#[from] BaasError),
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub to: String,
    pub message: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, sms: &SmsMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug, Deserialize)]
struct FunctionResponse {
    success: bool,
    error: Option<String>,
}

/// Sends e-mail through the hosted serverless function.
#[derive(Clone)]
pub struct FunctionEmailSender {
    client: BaasClient,
    function_name: String,
}

impl FunctionEmailSender {
    pub fn new(client: BaasClient, function_name: impl Into<String>) -> Self {
        Self {
            client,
            function_name: function_name.into(),
        }
    }
}

#[async_trait]
impl EmailSender for FunctionEmailSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DeliveryError> {
        let res: FunctionResponse = self
            .client
            .json(
                Method::POST,
                &format!("/functions/v1/{}", self.function_name),
                BaasAuth::ServiceRole,
                Some(email),
            )
            .await?;
        if res.success {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(
                res.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// No SMS gateway is wired up; every attempt fails.
#[derive(Debug, Clone, Default)]
pub struct UnimplementedSms;

#[async_trait]
impl SmsSender for UnimplementedSms {
    async fn send_sms(&self, _sms: &SmsMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotImplemented { channel: "sms" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sms_stub_always_fails() {
        let sms = SmsMessage {
            to: "09171234567".into(),
            message: "hello".into(),
        };
        let err = UnimplementedSms.send_sms(&sms).await.unwrap_err();
        assert_eq!(err.to_string(), "sms delivery is not implemented");
    }

    #[test]
    fn function_response_with_error() {
        let res: FunctionResponse =
            serde_json::from_str(r#"{"success":false,"error":"mailbox full"}"#).unwrap();
        assert!(!res.success);
        assert_eq!(res.error.as_deref(), Some("mailbox full"));
    }
}
