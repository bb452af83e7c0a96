use super::*;
use crate::spawn_invalidation_daemon;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use plotter_store::MemoryStore;
use plotter_tsdb::{MemoryTsdb, RawPoint, StatStream};
use tokio_util::sync::CancellationToken;

fn session(prefixes: &[&str]) -> LoginSession {
    LoginSession {
        issued: 0,
        user: "sam".to_string(),
        prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
    }
}

struct Fixture {
    checker: Arc<PermissionChecker>,
    tsdb: Arc<MemoryTsdb>,
    store: Arc<dyn ConfigStore>,
    uu: Uuid,
}

async fn fixture() -> Fixture {
    let tsdb = Arc::new(MemoryTsdb::new());
    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    let ns = StoreNamespace::default();

    let uu = Uuid::new_v4();
    tsdb.add_stream(uu, "campus/building1/voltage");

    TagDef::new(["public/"])
        .upsert(&store, &ns, PUBLIC_TAG)
        .await
        .unwrap();

    let checker = Arc::new(PermissionChecker::new(
        Arc::clone(&tsdb) as Arc<dyn TsdbClient>,
        Arc::clone(&store),
        ns,
        1024,
    ));
    Fixture {
        checker,
        tsdb,
        store,
        uu,
    }
}

#[tokio::test]
async fn test_prefix_decision() {
    let f = fixture().await;

    assert!(
        f.checker
            .has_permission(Some(&session(&["campus/building1/"])), f.uu)
            .await
    );
    assert!(
        f.checker
            .has_permission(Some(&session(&["campus/"])), f.uu)
            .await
    );
    // The empty prefix matches everything (the `all` tag)
    assert!(f.checker.has_permission(Some(&session(&[""])), f.uu).await);
    assert!(
        !f.checker
            .has_permission(Some(&session(&["campus/building2/"])), f.uu)
            .await
    );
    assert!(!f.checker.has_permission(Some(&session(&[])), f.uu).await);
}

#[tokio::test]
async fn test_unauthenticated_uses_public_tag() {
    let f = fixture().await;

    // The stream is not under public/
    assert!(!f.checker.has_permission(None, f.uu).await);

    let public = Uuid::new_v4();
    f.tsdb.add_stream(public, "public/weather/temp");
    assert!(f.checker.has_permission(None, public).await);
}

#[tokio::test]
async fn test_missing_stream_denied_and_not_cached() {
    let f = fixture().await;
    let new_stream = Uuid::new_v4();
    let all = session(&[""]);

    assert!(!f.checker.has_permission(Some(&all), new_stream).await);

    // The stream appears; no invalidation is needed for the decision to
    // flip, because non-existence is never cached.
    f.tsdb.add_stream(new_stream, "campus/building3/freq");
    assert!(f.checker.has_permission(Some(&all), new_stream).await);
}

#[tokio::test]
async fn test_tag_change_applies_after_invalidation() {
    let f = fixture().await;
    let shutdown = CancellationToken::new();
    let _daemon = spawn_invalidation_daemon(
        Arc::clone(&f.store),
        Arc::clone(&f.checker),
        shutdown.clone(),
    );

    // Prime the tag-prefix cache with the original public definition.
    assert!(!f.checker.has_permission(None, f.uu).await);

    // Redefine public to cover the campus subtree.
    TagDef::new(["campus/"])
        .upsert(&f.store, f.checker.namespace(), PUBLIC_TAG)
        .await
        .unwrap();

    // After the watch delivers, the cached decision flips.
    let mut flipped = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        if f.checker.has_permission(None, f.uu).await {
            flipped = true;
            break;
        }
    }
    assert!(flipped, "permission did not reflect the tag redefinition");
    shutdown.cancel();
}

#[tokio::test]
async fn test_undefined_tag_is_empty_set() {
    let f = fixture().await;
    let prefixes = f.checker.tag_prefixes("no-such-tag").await.unwrap();
    assert!(prefixes.is_empty());
}

/// Counts collection lookups and can be told to fail them.
struct CountingTsdb {
    inner: MemoryTsdb,
    collection_calls: AtomicU64,
    fail: AtomicBool,
}

#[async_trait]
impl TsdbClient for CountingTsdb {
    async fn exists(&self, uuid: Uuid) -> Result<bool, TsdbError> {
        self.inner.exists(uuid).await
    }

    async fn collection(&self, uuid: Uuid) -> Result<String, TsdbError> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers pile onto the in-flight resolution.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(TsdbError::Backend("metadata unavailable".into()));
        }
        self.inner.collection(uuid).await
    }

    fn aligned_windows(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
    ) -> StatStream {
        self.inner.aligned_windows(cancel, uuid, start, end, pw)
    }

    async fn nearest(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        time: i64,
        backward: bool,
    ) -> Result<RawPoint, TsdbError> {
        self.inner.nearest(cancel, uuid, time, backward).await
    }
}

fn counting_fixture() -> (Arc<CountingTsdb>, Arc<PermissionChecker>, Uuid) {
    let inner = MemoryTsdb::new();
    let uu = Uuid::new_v4();
    inner.add_stream(uu, "campus/building1/voltage");

    let tsdb = Arc::new(CountingTsdb {
        inner,
        collection_calls: AtomicU64::new(0),
        fail: AtomicBool::new(false),
    });
    let checker = Arc::new(PermissionChecker::new(
        Arc::clone(&tsdb) as Arc<dyn TsdbClient>,
        Arc::new(MemoryStore::new()),
        StoreNamespace::default(),
        1024,
    ));
    (tsdb, checker, uu)
}

#[tokio::test]
async fn test_concurrent_misses_coalesce() {
    let (tsdb, checker, uu) = counting_fixture();
    let sess = session(&["campus/"]);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let checker = Arc::clone(&checker);
        let sess = sess.clone();
        tasks.spawn(async move { checker.has_permission(Some(&sess), uu).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap());
    }

    assert_eq!(tsdb.collection_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_resolution_is_not_cached() {
    let (tsdb, checker, uu) = counting_fixture();
    let sess = session(&["campus/"]);

    tsdb.fail.store(true, Ordering::SeqCst);
    assert!(!checker.has_permission(Some(&sess), uu).await);

    // The failure was not cached: the next decision retries and succeeds.
    tsdb.fail.store(false, Ordering::SeqCst);
    assert!(checker.has_permission(Some(&sess), uu).await);
    assert_eq!(tsdb.collection_calls.load(Ordering::SeqCst), 2);
}
