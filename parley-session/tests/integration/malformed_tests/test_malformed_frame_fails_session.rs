use parley_core::{SessionDescription, SignalMessage};
use parley_session::{CallError, CallState};

use crate::integration::init_tracing;
use crate::utils::{CallEvent, SIGNAL_TIMEOUT_MS, TestPeer, frame, id, ring_and_accept};

#[tokio::test]
async fn test_malformed_frame_fails_session() {
    init_tracing();

    let bob = TestPeer::new("bob");
    let alice = id("alice");

    ring_and_accept(&bob, &alice).await;

    // Unreadable frames name no sender and cannot touch any call.
    bob.manager.dispatch("{not json").await;
    bob.manager
        .dispatch(r#"{"op":"signal","d":{"signal":{"op":"hangup"}}}"#)
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(bob.manager.state_of(&alice), Some(CallState::Accepted));

    // An answer blob in the offer slot is a contract violation by alice.
    let bad_offer = SignalMessage::Offer {
        caller: alice.clone(),
        callee: bob.identity.clone(),
        offer: SessionDescription::answer("v=0"),
    };
    bob.manager
        .dispatch(&frame(&bob.identity, &alice, bad_offer))
        .await;

    match bob.observer.wait_for_terminal(&alice, SIGNAL_TIMEOUT_MS).await {
        Some(CallEvent::Failed {
            reason: CallError::MalformedMessage(reason),
            ..
        }) => assert!(reason.contains("offer"), "{reason}"),
        other => panic!("expected a malformed message failure, got {other:?}"),
    }
    assert_eq!(bob.media.record(&alice).await.remote_descriptions, 0);
    assert_eq!(bob.media.record(&alice).await.released, 1);
}
