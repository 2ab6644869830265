use parley_core::{Envelope, RelayFrame, SignalMessage};
use parley_session::SignalingOutput;

use crate::integration::init_tracing;
use crate::utils::{RELAY_TIMEOUT_MS, connect_client, connect_raw, id, recv_frame, send_raw, spawn_relay};

#[tokio::test]
async fn test_signal_forwarded_by_identity() {
    init_tracing();

    let (base, service) = spawn_relay().await;
    let (alice, _alice_rx) = connect_client(&base, &service, "alice").await;
    let (_bob, mut bob_rx) = connect_client(&base, &service, "bob").await;

    let dial = SignalMessage::Dial {
        caller: id("alice"),
        receiver: id("bob"),
    };
    alice
        .send(Envelope {
            to: id("bob"),
            from: id("alice"),
            signal: dial.clone(),
        })
        .await;

    assert_eq!(
        recv_frame(&mut bob_rx, RELAY_TIMEOUT_MS).await,
        Some(RelayFrame::Signal(Envelope {
            to: id("bob"),
            from: id("alice"),
            signal: dial,
        }))
    );
}

#[tokio::test]
async fn test_relay_overwrites_claimed_sender() {
    init_tracing();

    let (base, service) = spawn_relay().await;
    let mut mallory = connect_raw(&base, &service, "mallory").await;
    let (_bob, mut bob_rx) = connect_client(&base, &service, "bob").await;

    let forged = RelayFrame::Signal(Envelope {
        to: id("bob"),
        from: id("alice"),
        signal: SignalMessage::Hangup {
            caller: id("alice"),
            callee: id("bob"),
        },
    })
    .encode()
    .expect("encode");
    send_raw(&mut mallory, &forged).await;

    match recv_frame(&mut bob_rx, RELAY_TIMEOUT_MS).await {
        Some(RelayFrame::Signal(envelope)) => assert_eq!(envelope.from, id("mallory")),
        other => panic!("expected a forwarded signal, got {other:?}"),
    }
}
