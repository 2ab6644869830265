use parley_session::{CallError, CallState};

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestPeer, id};

#[tokio::test]
async fn test_dial_rejections() {
    init_tracing();

    let alice = TestPeer::new("alice");
    let bob = id("bob");
    let carol = id("carol");

    assert!(matches!(
        alice.manager.dial(&alice.identity),
        Err(CallError::InvalidIdentity(_))
    ));

    alice.manager.dial(&bob).expect("Failed to dial");
    assert_eq!(alice.manager.dial(&bob), Err(CallError::SessionExists));

    assert_eq!(alice.manager.accept(&carol).await, Err(CallError::NoSession));
    assert_eq!(alice.manager.decline(&carol).await, Err(CallError::NoSession));
    assert_eq!(alice.manager.hangup(&carol).await, Err(CallError::NoSession));

    assert!(
        alice
            .observer
            .wait_for_state(&bob, CallState::Ringing, SIGNAL_TIMEOUT_MS)
            .await
    );

    // Accepting our own outgoing call is not a thing; the call keeps ringing.
    alice.manager.accept(&bob).await.expect("command delivered");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(alice.manager.state_of(&bob), Some(CallState::Ringing));
    assert_eq!(alice.media.record(&bob).await.acquired, 0);
}
