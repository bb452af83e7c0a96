use super::*;
use crate::{TIME_HIGH, TIME_LOW};

fn populated() -> (MemoryTsdb, Uuid) {
    let tsdb = MemoryTsdb::new();
    let uu = Uuid::new_v4();
    tsdb.add_stream(uu, "campus/building1/voltage");
    tsdb.add_points(uu, [(0, 1.0), (5, 3.0), (16, 2.0), (40, -4.0)]);
    (tsdb, uu)
}

#[tokio::test]
async fn test_exists_and_collection() {
    let (tsdb, uu) = populated();

    assert!(tsdb.exists(uu).await.unwrap());
    assert!(!tsdb.exists(Uuid::new_v4()).await.unwrap());
    assert_eq!(
        tsdb.collection(uu).await.unwrap(),
        "campus/building1/voltage"
    );
    assert!(matches!(
        tsdb.collection(Uuid::new_v4()).await,
        Err(TsdbError::StreamNotFound)
    ));
}

#[tokio::test]
async fn test_aligned_windows_aggregates_buckets() {
    let (tsdb, uu) = populated();

    // pw=4 => 16ns buckets: [0,16) holds {1.0, 3.0}, [16,32) holds {2.0},
    // [32,48) holds {-4.0}
    let mut stream = tsdb.aligned_windows(CancellationToken::new(), uu, 0, 48, 4);

    let w0 = stream.points.recv().await.unwrap();
    assert_eq!(w0.time, 0);
    assert_eq!(w0.min, 1.0);
    assert_eq!(w0.max, 3.0);
    assert_eq!(w0.mean, 2.0);
    assert_eq!(w0.count, 2);

    let w1 = stream.points.recv().await.unwrap();
    assert_eq!((w1.time, w1.count), (16, 1));

    let w2 = stream.points.recv().await.unwrap();
    assert_eq!((w2.time, w2.min), (32, -4.0));

    assert!(stream.points.recv().await.is_none());
    assert!(stream.errors.recv().await.is_none());
}

#[tokio::test]
async fn test_aligned_windows_respects_range() {
    let (tsdb, uu) = populated();

    // Only [16, 32) falls inside the range
    let mut stream = tsdb.aligned_windows(CancellationToken::new(), uu, 16, 32, 4);
    let w = stream.points.recv().await.unwrap();
    assert_eq!(w.time, 16);
    assert!(stream.points.recv().await.is_none());
}

#[tokio::test]
async fn test_aligned_windows_unknown_stream() {
    let tsdb = MemoryTsdb::new();
    let mut stream = tsdb.aligned_windows(CancellationToken::new(), Uuid::new_v4(), 0, 64, 2);

    assert!(stream.points.recv().await.is_none());
    assert!(matches!(
        stream.errors.recv().await,
        Some(TsdbError::StreamNotFound)
    ));
}

#[tokio::test]
async fn test_poison_delivers_points_then_error() {
    let (tsdb, uu) = populated();
    tsdb.poison(uu, "replica down");

    let mut stream = tsdb.aligned_windows(CancellationToken::new(), uu, 0, 48, 4);
    let mut delivered = 0;
    while stream.points.recv().await.is_some() {
        delivered += 1;
    }
    assert_eq!(delivered, 3);
    match stream.errors.recv().await {
        Some(TsdbError::Backend(msg)) => assert_eq!(msg, "replica down"),
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_stops_delivery() {
    let (tsdb, uu) = populated();
    let cancel = CancellationToken::new();

    let mut stream = tsdb.aligned_windows(cancel.clone(), uu, 0, 48, 4);
    let first = stream.points.recv().await.unwrap();
    assert_eq!(first.time, 0);

    cancel.cancel();
    // After cancellation the channel drains and closes; no error is reported.
    while stream.points.recv().await.is_some() {}
    assert!(stream.errors.recv().await.is_none());
}

#[tokio::test]
async fn test_nearest_forward_and_backward() {
    let (tsdb, uu) = populated();
    let cancel = CancellationToken::new();

    let p = tsdb.nearest(cancel.clone(), uu, TIME_LOW, false).await.unwrap();
    assert_eq!(p.time, 0);

    let p = tsdb.nearest(cancel.clone(), uu, TIME_HIGH, true).await.unwrap();
    assert_eq!(p.time, 40);

    let p = tsdb.nearest(cancel.clone(), uu, 6, false).await.unwrap();
    assert_eq!(p.time, 16);

    // backward is exclusive of the query instant
    let p = tsdb.nearest(cancel.clone(), uu, 16, true).await.unwrap();
    assert_eq!(p.time, 5);

    assert!(matches!(
        tsdb.nearest(cancel, uu, TIME_HIGH, false).await,
        Err(TsdbError::NoPoint)
    ));
}

#[tokio::test]
async fn test_nearest_empty_stream() {
    let tsdb = MemoryTsdb::new();
    let uu = Uuid::new_v4();
    tsdb.add_stream(uu, "empty");

    assert!(matches!(
        tsdb.nearest(CancellationToken::new(), uu, TIME_LOW, false).await,
        Err(TsdbError::NoPoint)
    ));
}
