use crate::integration::init_tracing;
use crate::utils::{TestPeer, candidate, dial, frame, id, offer};

#[tokio::test]
async fn test_unknown_pair_is_dropped() {
    init_tracing();

    let bob = TestPeer::new("bob");
    let carol = id("carol");
    let dave = id("dave");

    // Only a dial may open a call.
    bob.receive(&carol, candidate(&carol, &bob.identity, "c1")).await;
    bob.receive(&carol, offer(&carol, &bob.identity, "v=0")).await;

    // Addressed to someone else entirely.
    bob.manager
        .dispatch(&frame(&dave, &carol, dial(&carol, &dave)))
        .await;

    // A peer_left for a stranger is harmless.
    bob.manager
        .dispatch(r#"{"op":"peer_left","d":{"identity":"carol"}}"#)
        .await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(bob.manager.active_calls().is_empty());
    assert!(bob.signaling.sent().await.is_empty());
    assert!(bob.observer.get_events().await.is_empty());
    assert_eq!(bob.media.record(&carol).await.ops.len(), 0);
}
