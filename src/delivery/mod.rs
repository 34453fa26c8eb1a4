//! Coaching Delivery
//!
//! Channels that carry a rendered directive to a rep, and the dispatcher that
//! persists, routes, and scores each directive.
//!
//! ## Modules
//!
//! - `dispatcher`: session persistence, background transport, score update
//! - `router`: ordered fallback across channels with per-channel circuit breakers
//! - `circuit_breaker`: skips a channel after repeated transport failures
//! - `voice` / `sms` / `in_app`: channel implementations

mod circuit_breaker;
mod dispatcher;
mod in_app;
mod router;
mod sms;
mod voice;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use dispatcher::Dispatcher;
pub use in_app::InAppChannel;
pub use router::{ChannelAttempt, ChannelRouter, RouteReport};
pub use sms::SmsChannel;
pub use voice::{Pacing, SpeechSink, VoiceChannel, WebSocketSink, stream_script};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{RepIdentity, Result, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Voice,
    Sms,
    InApp,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Voice => "voice",
            ChannelKind::Sms => "sms",
            ChannelKind::InApp => "in_app",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channels tried in order for a severity
pub fn route_for(severity: Severity) -> &'static [ChannelKind] {
    match severity {
        Severity::Immediate => &[ChannelKind::Voice, ChannelKind::Sms],
        Severity::High => &[ChannelKind::Sms],
        Severity::Medium => &[ChannelKind::InApp],
    }
}

/// Everything a channel needs to deliver one session
#[derive(Debug, Clone)]
pub struct DeliveryScript {
    pub session_id: String,
    pub rep: RepIdentity,
    pub severity: Severity,
    pub message: String,
    pub suggestions: Vec<String>,
    /// Closing line, spoken last on voice
    pub signature: String,
}

impl DeliveryScript {
    /// Flattened text for channels without pacing
    pub fn text_body(&self) -> String {
        let mut body = self.message.clone();
        for suggestion in &self.suggestions {
            body.push_str("\n- ");
            body.push_str(suggestion);
        }
        body
    }
}

/// Transport for a rendered directive
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver the script. Errors are classified by the router for fallback.
    async fn deliver(&self, script: &DeliveryScript) -> Result<()>;

    /// Whether the channel has what it needs to attempt a delivery
    async fn health_check(&self) -> Result<bool>;
}

pub type SharedChannel = Arc<dyn DeliveryChannel>;

#[cfg(test)]
pub(crate) mod testing {
    //! Recording channels shared by the delivery and team tests.

    use std::sync::Mutex;

    use super::*;
    use crate::types::CoachError;

    /// Records every script it is handed; optionally fails each time
    pub struct RecordingChannel {
        kind: ChannelKind,
        failure: Option<String>,
        pub delivered: Mutex<Vec<DeliveryScript>>,
    }

    impl RecordingChannel {
        pub fn ok(kind: ChannelKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                failure: None,
                delivered: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(kind: ChannelKind, message: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                failure: Some(message.to_string()),
                delivered: Mutex::new(Vec::new()),
            })
        }

        pub fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DeliveryChannel for RecordingChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn deliver(&self, script: &DeliveryScript) -> Result<()> {
            self.delivered.lock().unwrap().push(script.clone());
            match &self.failure {
                Some(message) => Err(CoachError::delivery(self.kind.as_str(), message.clone())),
                None => Ok(()),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.failure.is_none())
        }
    }
}
