use parley_core::SignalKind;

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, TestPeer, candidate, id, offer, ring_and_accept};

#[tokio::test]
async fn test_candidates_queued_until_offer() {
    init_tracing();

    let bob = TestPeer::new("bob");
    let alice = id("alice");

    ring_and_accept(&bob, &alice).await;

    // Candidates overtake the offer.
    bob.receive(&alice, candidate(&alice, &bob.identity, "c1")).await;
    bob.receive(&alice, candidate(&alice, &bob.identity, "c2")).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(
        bob.media
            .record(&alice)
            .await
            .applied_candidates
            .is_empty(),
        "candidates must wait for the remote description"
    );

    bob.receive(&alice, offer(&alice, &bob.identity, "v=0 from alice"))
        .await;
    assert!(
        bob.signaling
            .wait_for_kind(SignalKind::Answer, 1, SIGNAL_TIMEOUT_MS)
            .await,
        "Expected an answer"
    );

    let record = bob.media.record(&alice).await;
    assert_eq!(record.applied_candidates, vec!["c1", "c2"]);
    assert!(record.happened_before("remote:offer", "candidate:c1"));
    assert!(record.happened_before("candidate:c1", "candidate:c2"));

    // Once the description is in, candidates go straight through.
    bob.receive(&alice, candidate(&alice, &bob.identity, "c3")).await;
    assert!(
        bob.media
            .wait_for_candidates(&alice, 3, SIGNAL_TIMEOUT_MS)
            .await
    );
    assert_eq!(
        bob.media.record(&alice).await.applied_candidates,
        vec!["c1", "c2", "c3"]
    );
}
