//! Shared fixture for gateway integration tests

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use plotter_auth::{Account, SessionAuthenticator, StoreNamespace, TagDef, PUBLIC_TAG};
use plotter_dispatch::Dispatcher;
use plotter_gateway::AppState;
use plotter_permcache::PermissionChecker;
use plotter_store::{ConfigStore, MemoryStore};
use plotter_tsdb::{MemoryTsdb, TsdbClient};

// Not every test binary touches every handle.
#[allow(dead_code)]
pub struct Fixture {
    pub state: AppState,
    pub tsdb: Arc<MemoryTsdb>,
    pub store: Arc<dyn ConfigStore>,
    /// Stream under `public/`, readable without a token.
    pub public_stream: Uuid,
    /// Stream under `campus/`, readable only by `sam`.
    pub campus_stream: Uuid,
}

/// Build a gateway over an in-memory store and TSDB.
///
/// Accounts: `sam`/`hunter2` holding the `facilities` tag (prefix
/// `campus/`). The `public` tag covers `public/`.
pub async fn fixture() -> Fixture {
    let tsdb = Arc::new(MemoryTsdb::new());
    let store: Arc<dyn ConfigStore> = Arc::new(MemoryStore::new());
    let ns = StoreNamespace::default();

    let public_stream = Uuid::new_v4();
    tsdb.add_stream(public_stream, "public/weather/temperature");
    tsdb.add_points(
        public_stream,
        [(0, 1.0), (1_000_000, 2.0), (500_000_000, 3.0)],
    );

    let campus_stream = Uuid::new_v4();
    tsdb.add_stream(campus_stream, "campus/building1/voltage");
    tsdb.add_points(campus_stream, [(2_000_000, 120.1), (9_000_000, 119.8)]);

    TagDef::new(["public/"])
        .upsert(&store, &ns, PUBLIC_TAG)
        .await
        .unwrap();
    TagDef::new(["campus/"])
        .upsert(&store, &ns, "facilities")
        .await
        .unwrap();

    let mut account = Account::new("sam", "hunter2").unwrap();
    account.grant_tag("facilities");
    account.upsert(&store, &ns).await.unwrap();

    let auth = Arc::new(
        SessionAuthenticator::bootstrap(Arc::clone(&store), ns.clone(), 3600)
            .await
            .unwrap(),
    );

    let permissions = Arc::new(PermissionChecker::new(
        Arc::clone(&tsdb) as Arc<dyn TsdbClient>,
        Arc::clone(&store),
        ns,
        1024,
    ));

    let data = Arc::new(Dispatcher::new(
        Arc::clone(&tsdb) as Arc<dyn TsdbClient>,
        16,
        Duration::from_secs(5),
        "data",
    ));
    let brackets = Arc::new(Dispatcher::new(
        Arc::clone(&tsdb) as Arc<dyn TsdbClient>,
        16,
        Duration::from_secs(5),
        "bracket",
    ));

    let state = AppState {
        data,
        brackets,
        auth,
        permissions,
        max_request_bytes: 16 << 10,
        path_separator: '/',
    };

    Fixture {
        state,
        tsdb,
        store,
        public_stream,
        campus_stream,
    }
}
