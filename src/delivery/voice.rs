//! Voice channel over a speech-synthesis WebSocket.
//!
//! Frames are JSON text messages: `{"type": "speak", "rep_id": ..., "text": ...}`.
//! The message goes first, then each suggestion after a gap, then the
//! signature line after a longer pause. The socket is closed afterwards.

use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{ChannelKind, DeliveryChannel, DeliveryScript};
use crate::constants::delivery as pacing;
use crate::types::{CoachError, Result};

/// Gaps between the spoken parts of a script
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub suggestion_gap: Duration,
    pub signature_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            suggestion_gap: Duration::from_secs(pacing::SUGGESTION_GAP_SECS),
            signature_delay: Duration::from_secs(pacing::SIGNATURE_DELAY_SECS),
        }
    }
}

/// Destination for spoken text
#[async_trait]
pub trait SpeechSink: Send {
    async fn speak(&mut self, text: &str) -> Result<()>;
    async fn finish(&mut self) -> Result<()>;
}

/// Speak a script with pacing
pub async fn stream_script<S>(sink: &mut S, script: &DeliveryScript, pacing: Pacing) -> Result<()>
where
    S: SpeechSink + ?Sized,
{
    sink.speak(&script.message).await?;
    for suggestion in &script.suggestions {
        tokio::time::sleep(pacing.suggestion_gap).await;
        sink.speak(suggestion).await?;
    }
    tokio::time::sleep(pacing.signature_delay).await;
    sink.speak(&script.signature).await?;
    sink.finish().await
}

#[derive(Serialize)]
struct SpeakFrame<'a> {
    #[serde(rename = "type")]
    frame_type: &'static str,
    rep_id: &'a str,
    text: &'a str,
}

pub struct WebSocketSink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    rep_id: String,
}

impl WebSocketSink {
    pub async fn connect(url: &Url, rep_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let connect = tokio_tungstenite::connect_async(url.as_str());
        let (stream, _response) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| CoachError::timeout("voice websocket connect", timeout))?
            .map_err(|e| CoachError::delivery("voice", format!("websocket connection failed: {}", e)))?;

        Ok(Self {
            stream,
            rep_id: rep_id.into(),
        })
    }
}

#[async_trait]
impl SpeechSink for WebSocketSink {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let frame = serde_json::to_string(&SpeakFrame {
            frame_type: "speak",
            rep_id: &self.rep_id,
            text,
        })?;
        self.stream
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| CoachError::delivery("voice", format!("websocket send failed: {}", e)))
    }

    async fn finish(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| CoachError::delivery("voice", format!("websocket close failed: {}", e)))
    }
}

pub struct VoiceChannel {
    url: Option<Url>,
    pacing: Pacing,
    connect_timeout: Duration,
}

impl VoiceChannel {
    pub fn new(url: Option<Url>, pacing: Pacing, connect_timeout: Duration) -> Self {
        Self {
            url,
            pacing,
            connect_timeout,
        }
    }
}

#[async_trait]
impl DeliveryChannel for VoiceChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Voice
    }

    async fn deliver(&self, script: &DeliveryScript) -> Result<()> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| CoachError::delivery("voice", "voice endpoint not configured"))?;

        let mut sink = WebSocketSink::connect(url, script.rep.id.as_str(), self.connect_timeout).await?;
        tracing::debug!(rep_id = %script.rep.id, "Voice session opened");
        stream_script(&mut sink, script, self.pacing).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.url.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RepIdentity, Severity};
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        spoken: Vec<(Duration, String)>,
        finished: bool,
        start: Option<Instant>,
    }

    #[async_trait]
    impl SpeechSink for RecordingSink {
        async fn speak(&mut self, text: &str) -> Result<()> {
            let start = *self.start.get_or_insert_with(Instant::now);
            self.spoken.push((start.elapsed(), text.to_string()));
            Ok(())
        }

        async fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn script() -> DeliveryScript {
        DeliveryScript {
            session_id: "s1".into(),
            rep: RepIdentity::new("r1", "Dana"),
            severity: Severity::Immediate,
            message: "Stop.".into(),
            suggestions: vec!["One.".into(), "Two.".into()],
            signature: "Now go.".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_script_pacing() {
        let mut sink = RecordingSink::default();
        stream_script(&mut sink, &script(), Pacing::default())
            .await
            .unwrap();

        let offsets: Vec<u64> = sink.spoken.iter().map(|(d, _)| d.as_secs()).collect();
        let texts: Vec<&str> = sink.spoken.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["Stop.", "One.", "Two.", "Now go."]);
        assert_eq!(offsets, vec![0, 2, 4, 9]);
        assert!(sink.finished);
    }

    #[tokio::test]
    async fn test_unconfigured_voice_fails_fast() {
        let channel = VoiceChannel::new(None, Pacing::default(), Duration::from_secs(1));
        let err = channel.deliver(&script()).await.unwrap_err();
        assert!(err.should_fallback());
        assert!(!channel.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_failure() {
        // Port 9 (discard) on localhost is closed on test hosts
        let url = Url::parse("ws://127.0.0.1:9/speak").unwrap();
        let channel = VoiceChannel::new(Some(url), Pacing::default(), Duration::from_secs(2));
        let err = channel.deliver(&script()).await.unwrap_err();
        assert!(err.should_fallback());
    }
}
