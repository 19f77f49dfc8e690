// Chat channel transport: one authenticated WebSocket connection with a
// connect -> identify -> join handshake. All outbound text funnels
// through the `ChatSink` handle; inbound traffic is filtered down to
// channel messages from other participants before anyone else sees it.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to connect to chat service at {url}")]
    ConnectFailed {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("failed to send handshake frame")]
    HandshakeFailed(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("chat connection closed")]
    ConnectionClosed,
    #[error("failed to encode frame")]
    Encode(#[from] serde_json::Error),
}

/// A message observed on the channel, already attributed to its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub from: String,
    pub to: String,
    pub content: String,
}

/// Outbound text sink. The coordinator only ever needs "send this line
/// to the joined channel", so tests can substitute a recording sink.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), ProtocolError>;
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    Identity { agent_id: &'a str },
    Join { channel: &'a str },
    Message { to: &'a str, content: &'a str },
}

/// Loosely-typed inbound frame: anything that is not a channel message
/// (presence notices, acks, malformed JSON) is dropped silently.
#[derive(Deserialize)]
struct InboundFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Connected chat client bound to one channel under a fresh identity.
pub struct ChatClient {
    agent_id: String,
    channel: String,
    outbound: mpsc::Sender<String>,
}

impl ChatClient {
    /// Connect, identify, and join. Returns the client plus the stream
    /// of inbound channel messages from other participants.
    pub async fn connect(
        url: &str,
        channel: &str,
    ) -> Result<(Self, mpsc::Receiver<ChannelMessage>), ProtocolError> {
        let agent_id = format!("@coord-{:08x}", rand::random::<u32>());
        info!(agent_id = %agent_id, url, channel, "connecting to chat service");

        let (socket, _) = connect_async(url)
            .await
            .map_err(|source| ProtocolError::ConnectFailed {
                url: url.to_string(),
                source,
            })?;
        let (mut writer, mut reader) = socket.split();

        // Handshake happens before either pump task starts, so nothing
        // can race ahead of the identify/join pair.
        let identity = serde_json::to_string(&OutboundFrame::Identity {
            agent_id: &agent_id,
        })?;
        let join = serde_json::to_string(&OutboundFrame::Join { channel })?;
        writer
            .send(Message::text(identity))
            .await
            .map_err(ProtocolError::HandshakeFailed)?;
        writer
            .send(Message::text(join))
            .await
            .map_err(ProtocolError::HandshakeFailed)?;
        info!(channel, "joined channel");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(64);
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = writer.send(Message::text(frame)).await {
                    warn!(error = %e, "outbound send failed, dropping connection");
                    break;
                }
            }
        });

        let (inbound_tx, inbound_rx) = mpsc::channel::<ChannelMessage>(64);
        let own_id = agent_id.clone();
        let joined_channel = channel.to_string();
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "chat read error");
                        break;
                    }
                };
                let Ok(parsed) = serde_json::from_str::<InboundFrame>(text.as_str()) else {
                    continue;
                };
                if parsed.kind != "message" {
                    continue;
                }
                let (Some(from), Some(to), Some(content)) =
                    (parsed.from, parsed.to, parsed.content)
                else {
                    continue;
                };
                if from == own_id {
                    continue; // our own broadcast echoed back
                }
                if to != joined_channel {
                    debug!(to = %to, "dropping message for another channel");
                    continue;
                }
                if inbound_tx
                    .send(ChannelMessage { from, to, content })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            info!("disconnected from chat service");
        });

        Ok((
            Self {
                agent_id,
                channel: channel.to_string(),
                outbound: outbound_tx,
            },
            inbound_rx,
        ))
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl ChatSink for ChatClient {
    async fn send(&self, text: &str) -> Result<(), ProtocolError> {
        let frame = serde_json::to_string(&OutboundFrame::Message {
            to: &self.channel,
            content: text,
        })?;
        self.outbound
            .send(frame)
            .await
            .map_err(|_| ProtocolError::ConnectionClosed)
    }
}
