use futures::SinkExt;
use parley_core::{Identity, RelayFrame};
use parley_relay::RelayService;
use parley_session::RelayClient;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for frames to cross the relay (ms).
pub const RELAY_TIMEOUT_MS: u64 = 5000;

pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn id(name: &str) -> Identity {
    Identity::parse(name).expect("valid identity")
}

/// Start a relay on an ephemeral port. Returns its `ws://` base URL.
pub async fn spawn_relay() -> (String, RelayService) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay");
    let addr = listener.local_addr().expect("relay address");
    let service = RelayService::new();

    tokio::spawn(parley_relay::serve(listener, service.clone()));

    (format!("ws://{addr}"), service)
}

/// Connect a RelayClient and wait until the relay has registered it.
pub async fn connect_client(
    base: &str,
    service: &RelayService,
    name: &str,
) -> (RelayClient, mpsc::UnboundedReceiver<String>) {
    let (client, inbound) = RelayClient::connect(base, id(name))
        .await
        .expect("Failed to connect relay client");
    assert!(
        wait_online(service, &id(name), RELAY_TIMEOUT_MS).await,
        "{name} never registered"
    );
    (client, inbound)
}

/// A bare socket, for sending frames the typed client would never produce.
pub async fn connect_raw(base: &str, service: &RelayService, name: &str) -> RawSocket {
    let (socket, _) = connect_async(format!("{base}/ws/{name}"))
        .await
        .expect("Failed to connect raw socket");
    assert!(wait_online(service, &id(name), RELAY_TIMEOUT_MS).await);
    socket
}

pub async fn send_raw(socket: &mut RawSocket, text: &str) {
    socket
        .send(Message::Text(text.to_owned().into()))
        .await
        .expect("Failed to send raw frame");
}

pub async fn wait_online(service: &RelayService, identity: &Identity, timeout_ms: u64) -> bool {
    wait_until(|| service.is_online(identity), timeout_ms).await
}

pub async fn wait_offline(service: &RelayService, identity: &Identity, timeout_ms: u64) -> bool {
    wait_until(|| !service.is_online(identity), timeout_ms).await
}

async fn wait_until(check: impl Fn() -> bool, timeout_ms: u64) -> bool {
    let start = tokio::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        if check() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Next decoded frame from a client's inbound stream, if one arrives in time.
pub async fn recv_frame(
    inbound: &mut mpsc::UnboundedReceiver<String>,
    timeout_ms: u64,
) -> Option<RelayFrame> {
    let text = tokio::time::timeout(
        std::time::Duration::from_millis(timeout_ms),
        inbound.recv(),
    )
    .await
    .ok()??;
    Some(RelayFrame::decode(&text).expect("relay sent an undecodable frame"))
}
