use proptest::prelude::*;
use rendezvous_net_trackers::{
    AnnounceContext, AnnounceOptions, TrackerError, TrackerEvent, TrackerEventReceiver,
    TrackerRegistry, TrackerStats, tracker_events,
};
use rendezvous_net_types::{InfoHash, PeerIdentity};
use rendezvous_test_utils::{MockChannel, MockConnector, peer_identity};

const T1: &str = "wss://tracker-one.example";
const T2: &str = "wss://tracker-two.example";

fn context() -> AnnounceContext {
    AnnounceContext {
        info_hash: InfoHash::from_identifier("registry-tests"),
        peer_id: PeerIdentity::new([7; 20]),
    }
}

fn registry() -> (
    TrackerRegistry<MockConnector>,
    MockConnector,
    TrackerEventReceiver<MockChannel>,
) {
    let connector = MockConnector::new();
    let (tx, rx) = tracker_events();
    (
        TrackerRegistry::new(connector.clone(), context(), tx),
        connector,
        rx,
    )
}

#[tokio::test]
async fn add_tracker_connects_and_announces_defaults() {
    let (registry, connector, _rx) = registry();

    registry.add_tracker(T1).await.unwrap();

    assert!(registry.contains(T1));
    assert_eq!(registry.len(), 1);
    let client = connector.client(T1).unwrap();
    assert_eq!(client.context(), context());
    assert_eq!(client.announces(), vec![AnnounceOptions::default()]);
    assert_eq!(client.announces()[0].numwant, 50);
}

#[tokio::test]
async fn duplicate_tracker_is_rejected() {
    let (registry, connector, _rx) = registry();

    registry.add_tracker(T1).await.unwrap();
    let err = registry.add_tracker(T1).await.unwrap_err();

    assert_eq!(err, TrackerError::TrackerAlreadyExists(T1.to_string()));
    assert_eq!(registry.len(), 1);
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn removing_unknown_tracker_fails() {
    let (registry, _connector, _rx) = registry();

    assert_eq!(
        registry.remove_tracker(T1),
        Err(TrackerError::TrackerNotFound(T1.to_string()))
    );
}

#[tokio::test]
async fn remove_tracker_destroys_only_the_client() {
    let (registry, connector, _rx) = registry();
    registry.add_tracker(T1).await.unwrap();
    registry.add_tracker(T2).await.unwrap();

    let channel = MockChannel::new(peer_identity(1), "a");
    assert!(connector.client(T1).unwrap().emit_peer(channel.clone()));
    registry.remove_tracker(T1).unwrap();

    assert!(connector.client(T1).unwrap().is_destroyed());
    assert!(!connector.client(T2).unwrap().is_destroyed());
    assert!(!channel.is_destroyed());
    assert_eq!(registry.urls(), vec![T2.to_string()]);
}

#[tokio::test]
async fn refused_connect_is_not_registered() {
    let (registry, connector, _rx) = registry();
    connector.refuse(T1);

    let err = registry.add_tracker(T1).await.unwrap_err();
    assert!(matches!(err, TrackerError::Connect { .. }));
    assert!(!registry.contains(T1));
    assert_eq!(registry.stats(), TrackerStats::default());
}

#[tokio::test]
async fn request_more_peers_announces_everywhere() {
    let (registry, connector, _rx) = registry();
    registry.add_tracker(T1).await.unwrap();
    registry.add_tracker(T2).await.unwrap();

    assert_eq!(registry.request_more_peers().await, 2);

    assert_eq!(connector.client(T1).unwrap().announces().len(), 2);
    assert_eq!(connector.client(T2).unwrap().announces().len(), 2);
}

#[tokio::test]
async fn announce_with_overrides_options() {
    let (registry, connector, _rx) = registry();
    registry.add_tracker(T1).await.unwrap();

    let opts = AnnounceOptions::default().with_numwant(5);
    registry.announce_with(opts).await;

    assert_eq!(connector.client(T1).unwrap().announces().last(), Some(&opts));
}

#[tokio::test]
async fn default_options_apply_to_every_announce() {
    let connector = MockConnector::new();
    let (tx, _rx) = tracker_events();
    let opts = AnnounceOptions::default().with_numwant(20);
    let registry = TrackerRegistry::new(connector.clone(), context(), tx).with_default_options(opts);

    registry.add_tracker(T1).await.unwrap();
    registry.request_more_peers().await;

    assert_eq!(connector.client(T1).unwrap().announces(), vec![opts, opts]);
}

#[tokio::test]
async fn failed_announce_becomes_warning() {
    let (registry, connector, mut rx) = registry();
    registry.add_tracker(T1).await.unwrap();
    registry.add_tracker(T2).await.unwrap();
    connector.client(T1).unwrap().fail_announces(true);

    assert_eq!(registry.request_more_peers().await, 2);

    // The healthy tracker still announced.
    assert_eq!(connector.client(T2).unwrap().announces().len(), 2);
    match rx.try_recv().unwrap() {
        TrackerEvent::Warning { tracker, error } => {
            assert_eq!(tracker, T1);
            assert!(error.contains("mock announce failure"));
        }
        other => panic!("expected warning, got {other:?}"),
    }
}

#[tokio::test]
async fn stats_track_open_connections() {
    let (registry, connector, _rx) = registry();
    assert_eq!(registry.stats(), TrackerStats { connected: 0, total: 0 });

    registry.add_tracker(T1).await.unwrap();
    registry.add_tracker(T2).await.unwrap();
    assert_eq!(registry.stats(), TrackerStats { connected: 2, total: 2 });

    connector.client(T2).unwrap().set_open(false);
    assert_eq!(registry.stats(), TrackerStats { connected: 1, total: 2 });

    registry.remove_tracker(T1).unwrap();
    assert_eq!(registry.stats(), TrackerStats { connected: 0, total: 1 });
}

#[tokio::test]
async fn destroy_all_empties_registry() {
    let (registry, connector, _rx) = registry();
    registry.add_tracker(T1).await.unwrap();
    registry.add_tracker(T2).await.unwrap();

    assert_eq!(registry.destroy_all(), 2);
    assert!(registry.is_empty());
    assert!(connector.client(T1).unwrap().is_destroyed());
    assert!(connector.client(T2).unwrap().is_destroyed());
    assert_eq!(registry.destroy_all(), 0);
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    SetOpen(usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize).prop_map(Op::Add),
        (0..4usize).prop_map(Op::Remove),
        (0..4usize, any::<bool>()).prop_map(|(i, open)| Op::SetOpen(i, open)),
    ]
}

proptest! {
    #[test]
    fn connected_never_exceeds_total(ops in prop::collection::vec(op(), 0..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (registry, connector, _rx) = registry();
            let urls: Vec<String> = (0..4).map(|i| format!("wss://t{i}.example")).collect();

            for op in ops {
                match op {
                    Op::Add(i) => { let _ = registry.add_tracker(&urls[i]).await; }
                    Op::Remove(i) => { let _ = registry.remove_tracker(&urls[i]); }
                    Op::SetOpen(i, open) => {
                        if let Some(client) = connector.client(&urls[i]) {
                            client.set_open(open);
                        }
                    }
                }
                let stats = registry.stats();
                assert!(stats.connected <= stats.total);
                assert_eq!(stats.total, registry.len());
            }
        });
    }
}
