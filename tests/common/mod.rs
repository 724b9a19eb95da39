use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use modeled_cache::JsonCodec;
use modeled_cache::MemoryStore;
use modeled_cache::ModelCodec;
use modeled_cache::ModeledStore;
use modeled_cache::ZPath;
use serde::Deserialize;
use serde::Serialize;

/// Upper bound for a notification to arrive
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Window in which no notification may arrive
pub const QUIET_PERIOD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModel {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub age: u32,
    pub salary: u64,
}

impl TestModel {
    pub fn new(
        first_name: &str,
        last_name: &str,
        address: &str,
        age: u32,
        salary: u64,
    ) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            address: address.to_string(),
            age,
            salary,
        }
    }
}

pub fn json_codec() -> Arc<dyn ModelCodec<TestModel>> {
    Arc::new(JsonCodec::new())
}

/// Fresh store plus a typed facade rooted at `path`
pub fn modeled_store(path: &str) -> (MemoryStore, ModeledStore<TestModel>) {
    let store = MemoryStore::new();
    let modeled = ModeledStore::wrap(store.clone(), ZPath::parse(path).unwrap(), json_codec());
    (store, modeled)
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until<F>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
