use parley_session::{CallError, CallState};

use crate::integration::{create_linked_peers, init_tracing};
use crate::utils::{CallEvent, SIGNAL_TIMEOUT_MS};

#[tokio::test]
async fn test_hangup_releases_media_once() {
    init_tracing();

    let (alice, bob) = create_linked_peers("alice", "bob");

    alice.manager.dial(&bob.identity).expect("Failed to dial");
    assert!(
        bob.observer
            .wait_for_incoming(&alice.identity, SIGNAL_TIMEOUT_MS)
            .await
    );
    bob.manager.accept(&alice.identity).await.expect("accept");
    assert!(
        alice
            .manager
            .wait_for_state(
                &bob.identity,
                CallState::Connected,
                std::time::Duration::from_millis(SIGNAL_TIMEOUT_MS)
            )
            .await
    );

    alice
        .manager
        .hangup(&bob.identity)
        .await
        .expect("Failed to hang up");

    assert_eq!(
        bob.observer
            .wait_for_terminal(&alice.identity, SIGNAL_TIMEOUT_MS)
            .await,
        Some(CallEvent::Ended {
            remote: alice.identity.clone()
        })
    );
    assert_eq!(
        alice
            .observer
            .wait_for_terminal(&bob.identity, SIGNAL_TIMEOUT_MS)
            .await,
        Some(CallEvent::Ended {
            remote: bob.identity.clone()
        })
    );

    // Give any stray teardown path a chance to run twice.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(alice.media.record(&bob.identity).await.released, 1);
    assert_eq!(bob.media.record(&alice.identity).await.released, 1);
    assert_eq!(alice.observer.terminal_count(&bob.identity).await, 1);
    assert_eq!(bob.observer.terminal_count(&alice.identity).await, 1);

    // The pair is free again.
    assert_eq!(
        alice.manager.hangup(&bob.identity).await,
        Err(CallError::NoSession)
    );
    alice
        .manager
        .dial(&bob.identity)
        .expect("Redial after hangup should be allowed");
}
