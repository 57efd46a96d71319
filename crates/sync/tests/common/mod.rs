//! Shared test harness: an engine over an in-memory store with mock
//! collaborators.

use std::sync::Arc;
use std::time::Duration;

use domain::services::images::MockImageStore;
use domain::services::notification::MockNotifier;
use persistence::store::MemoryStore;
use popera_sync::{auth_channel, AuthController, Config, CurrentUser, SyncEngine};

pub struct TestHarness {
    pub engine: SyncEngine,
    pub store: MemoryStore,
    pub auth: AuthController,
    pub notifier: Arc<MockNotifier>,
    pub images: Arc<MockImageStore>,
}

pub fn harness() -> TestHarness {
    let store = MemoryStore::new();
    let notifier = Arc::new(MockNotifier::new());
    let images = Arc::new(MockImageStore::new());
    let (auth, state) = auth_channel();
    let engine = SyncEngine::new(
        &Config::default(),
        Arc::new(store.clone()),
        notifier.clone(),
        images.clone(),
        state,
    );
    TestHarness {
        engine,
        store,
        auth,
        notifier,
        images,
    }
}

pub fn sign_in(auth: &AuthController, uid: &str) {
    auth.sign_in(CurrentUser {
        uid: uid.to_string(),
        display_name: None,
    });
}

/// Polls `condition` for up to two seconds; panics if it never holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
