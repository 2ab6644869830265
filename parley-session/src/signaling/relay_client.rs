use crate::signaling::SignalingOutput;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parley_core::{Envelope, Identity, RelayFrame};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// WebSocket link from one participant to the relay.
///
/// Cloning is cheap; every clone feeds the same writer task, so the client can be
/// shared by all call sessions of the process.
#[derive(Clone)]
pub struct RelayClient {
    identity: Identity,
    outbound: mpsc::UnboundedSender<String>,
}

impl RelayClient {
    /// Connect to `{base_url}/ws/{identity}`.
    ///
    /// Returns the client and the stream of raw inbound text frames. The stream
    /// ends when the relay link is lost.
    pub async fn connect(
        base_url: &str,
        identity: Identity,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>)> {
        let url = format!("{}/ws/{}", base_url.trim_end_matches('/'), identity);
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to relay at {url}"))?;
        info!("Connected to relay {} as {}", url, identity);

        let (mut sender, mut receiver) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    warn!("Relay write failed: {}", e);
                    break;
                }
            }
            let _ = sender.close().await;
        });

        let reader_identity = identity.clone();
        tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay read failed for {}: {}", reader_identity, e);
                        break;
                    }
                }
            }
            info!("Relay link closed for {}", reader_identity);
        });

        Ok((Self { identity, outbound }, inbound_rx))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[async_trait]
impl SignalingOutput for RelayClient {
    async fn send(&self, envelope: Envelope) {
        let kind = envelope.signal.kind();
        let to = envelope.to.clone();
        match RelayFrame::Signal(envelope).encode() {
            Ok(json) => {
                debug!("-> {} {}", to, kind);
                if self.outbound.send(json).is_err() {
                    warn!("Relay link is down, dropping {} to {}", kind, to);
                }
            }
            Err(e) => error!("Failed to serialize {} to {}: {}", kind, to, e),
        }
    }
}
