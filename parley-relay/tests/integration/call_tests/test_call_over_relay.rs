use parley_session::{CallManager, CallState, SessionConfig};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{LogObserver, NullMedia, RELAY_TIMEOUT_MS, id, spawn_relay, wait_online};

async fn join(base: &str, name: &str) -> CallManager {
    let (client, inbound) = parley_session::RelayClient::connect(base, id(name))
        .await
        .expect("Failed to connect");
    let manager = CallManager::new(
        id(name),
        Arc::new(client),
        Arc::new(LogObserver),
        NullMedia::factory(),
        SessionConfig::default(),
    );

    let pump = manager.clone();
    tokio::spawn(async move { pump.run_inbound(inbound).await });
    manager
}

async fn wait_for_call(manager: &CallManager, remote: &str) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < Duration::from_millis(RELAY_TIMEOUT_MS) {
        if manager.state_of(&id(remote)).is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Two call managers negotiating through a live relay.
#[tokio::test]
async fn test_call_over_relay() {
    init_tracing();

    let (base, service) = spawn_relay().await;
    let alice = join(&base, "alice").await;
    let bob = join(&base, "bob").await;
    let timeout = Duration::from_millis(RELAY_TIMEOUT_MS);

    // The dial is dropped by the relay if bob is not registered yet.
    assert!(wait_online(&service, &id("bob"), RELAY_TIMEOUT_MS).await);
    alice.dial(&id("bob")).expect("Failed to dial");

    assert!(wait_for_call(&bob, "alice").await, "bob never rang");
    bob.accept(&id("alice")).await.expect("Failed to accept");

    assert!(
        alice
            .wait_for_state(&id("bob"), CallState::Connected, timeout)
            .await
    );
    assert!(
        bob.wait_for_state(&id("alice"), CallState::Connected, timeout)
            .await
    );

    // Alice quits: every live call is hung up on the way out.
    alice.shutdown().await;
    let mut ended = false;
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        if bob.state_of(&id("alice")).is_none() {
            ended = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(ended, "bob's call should end after alice hangs up");
    assert!(bob.active_calls().is_empty());
}
