//! Channel Fallback Router
//!
//! Tries the channels of a route in order until one delivers.
//!
//! 1. Skip channels that are not registered or whose circuit is open
//! 2. Attempt delivery once (no retry)
//! 3. On failure, record it and move to the next channel
//!
//! Every failed attempt moves on. Only failures classified as
//! unavailable, network, or unknown count against a channel's breaker;
//! a rejected payload says nothing about the channel's health.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use super::{ChannelKind, DeliveryScript, SharedChannel};

/// Result of one channel attempt
#[derive(Debug, Clone)]
pub struct ChannelAttempt {
    pub channel: ChannelKind,
    pub error: Option<String>,
}

impl ChannelAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteReport {
    pub attempts: Vec<ChannelAttempt>,
}

impl RouteReport {
    pub fn delivered_via(&self) -> Option<ChannelKind> {
        self.attempts
            .iter()
            .find(|a| a.succeeded())
            .map(|a| a.channel)
    }
}

pub struct ChannelRouter {
    channels: HashMap<ChannelKind, SharedChannel>,
    breakers: DashMap<ChannelKind, CircuitBreaker>,
    breaker_config: CircuitBreakerConfig,
}

impl ChannelRouter {
    pub fn new(breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            channels: HashMap::new(),
            breakers: DashMap::new(),
            breaker_config,
        }
    }

    /// Register a channel, replacing any previous channel of the same kind
    pub fn with_channel(mut self, channel: SharedChannel) -> Self {
        let kind = channel.kind();
        self.breakers.insert(
            kind,
            CircuitBreaker::new(kind.as_str(), self.breaker_config.clone()),
        );
        self.channels.insert(kind, channel);
        self
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<&SharedChannel> {
        self.channels.get(&kind)
    }

    pub async fn route(&self, script: &DeliveryScript, route: &[ChannelKind]) -> RouteReport {
        let mut report = RouteReport::default();

        for &kind in route {
            let Some(channel) = self.channels.get(&kind) else {
                warn!(channel = %kind, "Channel not registered, falling back");
                report.attempts.push(ChannelAttempt {
                    channel: kind,
                    error: Some(format!("{} channel not configured", kind)),
                });
                continue;
            };

            let allowed = self
                .breakers
                .get(&kind)
                .map(|cb| cb.allow_request())
                .unwrap_or(true);
            if !allowed {
                debug!(channel = %kind, "Skipping channel (circuit open)");
                report.attempts.push(ChannelAttempt {
                    channel: kind,
                    error: Some("circuit open".to_string()),
                });
                continue;
            }

            match channel.deliver(script).await {
                Ok(()) => {
                    if let Some(cb) = self.breakers.get(&kind) {
                        cb.record_success();
                    }
                    info!(
                        channel = %kind,
                        rep_id = %script.rep.id,
                        session_id = %script.session_id,
                        "Delivered"
                    );
                    report.attempts.push(ChannelAttempt {
                        channel: kind,
                        error: None,
                    });
                    return report;
                }
                Err(err) => {
                    let category = err.category();
                    if category.should_fallback()
                        && let Some(cb) = self.breakers.get(&kind)
                    {
                        cb.record_failure();
                    }
                    warn!(
                        channel = %kind,
                        rep_id = %script.rep.id,
                        category = %category,
                        error = %err,
                        "Delivery attempt failed"
                    );
                    report.attempts.push(ChannelAttempt {
                        channel: kind,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        report
    }

    /// Breaker stats for every registered channel, in channel order
    pub fn circuit_stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (*entry.key(), entry.value().stats()))
            .collect();
        stats.sort_by_key(|(kind, _)| *kind);
        stats.into_iter().map(|(_, s)| s).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::super::testing::RecordingChannel;
    use super::*;
    use crate::delivery::CircuitState;
    use crate::types::{RepIdentity, Severity};

    fn script() -> DeliveryScript {
        DeliveryScript {
            session_id: "s1".into(),
            rep: RepIdentity::new("r1", "Dana"),
            severity: Severity::Immediate,
            message: "Call now.".into(),
            suggestions: vec![],
            signature: "Go.".into(),
        }
    }

    fn config(threshold: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            open_timeout: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_voice_failure_falls_back_to_sms() {
        let voice = RecordingChannel::failing(ChannelKind::Voice, "connection refused");
        let sms = RecordingChannel::ok(ChannelKind::Sms);
        let router = ChannelRouter::new(config(3))
            .with_channel(voice.clone())
            .with_channel(sms.clone());

        let report = router
            .route(&script(), &[ChannelKind::Voice, ChannelKind::Sms])
            .await;
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.delivered_via(), Some(ChannelKind::Sms));
        assert_eq!(voice.count(), 1);
        assert_eq!(sms.count(), 1);
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let voice = RecordingChannel::ok(ChannelKind::Voice);
        let sms = RecordingChannel::ok(ChannelKind::Sms);
        let router = ChannelRouter::new(config(3))
            .with_channel(voice.clone())
            .with_channel(sms.clone());

        let report = router
            .route(&script(), &[ChannelKind::Voice, ChannelKind::Sms])
            .await;
        assert_eq!(report.delivered_via(), Some(ChannelKind::Voice));
        assert_eq!(sms.count(), 0);
    }

    #[tokio::test]
    async fn test_missing_channel_is_a_failed_attempt() {
        let router = ChannelRouter::new(config(3));
        let report = router.route(&script(), &[ChannelKind::InApp]).await;
        assert_eq!(report.delivered_via(), None);
        assert!(report.attempts[0].error.as_deref().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_open_circuit_skips_channel() {
        let voice = RecordingChannel::failing(ChannelKind::Voice, "connection refused");
        let sms = RecordingChannel::ok(ChannelKind::Sms);
        let router = ChannelRouter::new(config(2))
            .with_channel(voice.clone())
            .with_channel(sms.clone());
        let route = [ChannelKind::Voice, ChannelKind::Sms];

        router.route(&script(), &route).await;
        router.route(&script(), &route).await;
        let report = router.route(&script(), &route).await;

        assert_eq!(voice.count(), 2, "third attempt skipped by the breaker");
        assert_eq!(report.attempts[0].error.as_deref(), Some("circuit open"));
        assert_eq!(report.delivered_via(), Some(ChannelKind::Sms));

        let stats = router.circuit_stats();
        assert_eq!(stats[0].channel, "voice");
        assert_eq!(stats[0].state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_rejected_payload_does_not_trip_breaker() {
        let sms: Arc<RecordingChannel> =
            RecordingChannel::failing(ChannelKind::Sms, "invalid phone number");
        let router = ChannelRouter::new(config(1)).with_channel(sms.clone());

        router.route(&script(), &[ChannelKind::Sms]).await;
        router.route(&script(), &[ChannelKind::Sms]).await;
        assert_eq!(sms.count(), 2);
        assert_eq!(router.circuit_stats()[0].state, CircuitState::Closed);
    }
}
