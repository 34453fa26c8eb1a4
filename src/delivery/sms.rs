//! SMS channel over an HTTP gateway.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use super::{ChannelKind, DeliveryChannel, DeliveryScript};
use crate::types::{CoachError, Result};

/// SMS gateway client. The bearer token never appears in logs or debug output.
pub struct SmsChannel {
    gateway: Option<Url>,
    token: Option<SecretString>,
    from: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for SmsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsChannel")
            .field("gateway", &self.gateway.as_ref().map(Url::as_str))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    body: String,
}

impl SmsChannel {
    pub fn new(
        gateway: Option<Url>,
        token: Option<String>,
        from: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoachError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            gateway,
            token: token.map(SecretString::from),
            from,
            client,
        })
    }
}

#[async_trait]
impl DeliveryChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn deliver(&self, script: &DeliveryScript) -> Result<()> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| CoachError::delivery("sms", "sms gateway not configured"))?;
        let phone = script.rep.phone.as_deref().ok_or_else(|| {
            CoachError::delivery("sms", format!("phone number not configured for {}", script.rep.id))
        })?;

        let request = SmsRequest {
            to: phone,
            from: self.from.as_deref(),
            body: script.text_body(),
        };

        let mut builder = self.client.post(gateway.as_str()).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                format!("connection error: {}", e)
            };
            CoachError::delivery("sms", reason)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoachError::delivery(
                "sms",
                format!("gateway returned {}: {}", status.as_u16(), body),
            ));
        }

        tracing::debug!(rep_id = %script.rep.id, "SMS accepted by gateway");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.gateway.is_some())
    }
}
