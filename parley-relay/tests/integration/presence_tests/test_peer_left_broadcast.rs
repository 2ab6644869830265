use parley_core::RelayFrame;

use crate::integration::init_tracing;
use crate::utils::{RELAY_TIMEOUT_MS, connect_client, id, recv_frame, spawn_relay, wait_offline};

#[tokio::test]
async fn test_peer_left_broadcast() {
    init_tracing();

    let (base, service) = spawn_relay().await;
    let (_alice, mut alice_rx) = connect_client(&base, &service, "alice").await;
    let (_carol, mut carol_rx) = connect_client(&base, &service, "carol").await;
    let (bob, bob_rx) = connect_client(&base, &service, "bob").await;

    // Dropping every handle closes bob's socket.
    drop(bob);
    drop(bob_rx);

    assert!(wait_offline(&service, &id("bob"), RELAY_TIMEOUT_MS).await);

    let expected = Some(RelayFrame::PeerLeft {
        identity: id("bob"),
    });
    assert_eq!(recv_frame(&mut alice_rx, RELAY_TIMEOUT_MS).await, expected);
    assert_eq!(recv_frame(&mut carol_rx, RELAY_TIMEOUT_MS).await, expected);
    assert_eq!(service.online(), vec![id("alice"), id("carol")]);
}
