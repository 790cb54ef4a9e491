//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::BoxStream;
use keypath_index::{
    BatchOp, IndexError, KvPair, MemoryStore, OrderedStore, RangeBound, Result, ScanOptions,
    WriteOptions,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Once;
use std::time::Duration;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (RUST_LOG=keypath_index=debug)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// MemoryStore wrapper with injectable failures and lookup latency
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    failing_gets: Mutex<HashSet<Vec<u8>>>,
    failing_batches: Mutex<HashSet<Vec<u8>>>,
    get_delays: Mutex<HashMap<Vec<u8>, Duration>>,
    batch_delays: Mutex<HashMap<Vec<u8>, Duration>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get(key)` fails with a lookup error
    pub fn fail_get(&self, key: &str) {
        self.failing_gets.lock().insert(key.as_bytes().to_vec());
    }

    /// Any batch touching `key` fails with a write error
    pub fn fail_batch(&self, key: &str) {
        self.failing_batches.lock().insert(key.as_bytes().to_vec());
    }

    /// `get(key)` sleeps before answering
    pub fn delay_get(&self, key: &str, delay: Duration) {
        self.get_delays.lock().insert(key.as_bytes().to_vec(), delay);
    }

    /// Any batch touching `key` sleeps before it is applied
    pub fn delay_batch(&self, key: &str, delay: Duration) {
        self.batch_delays.lock().insert(key.as_bytes().to_vec(), delay);
    }
}

#[async_trait]
impl OrderedStore for FaultyStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let delay = self.get_delays.lock().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self.failing_gets.lock().contains(key);
        if failing {
            return Err(IndexError::store_lookup(format!(
                "injected get failure for {}",
                String::from_utf8_lossy(key)
            )));
        }
        self.inner.get(key).await
    }

    fn scan(&self, bound: &RangeBound, options: &ScanOptions) -> BoxStream<'static, Result<KvPair>> {
        self.inner.scan(bound, options)
    }

    async fn batch(&self, ops: Vec<BatchOp>, options: WriteOptions) -> Result<()> {
        let rejected = {
            let failing = self.failing_batches.lock();
            ops.iter().any(|op| failing.contains(op.key()))
        };
        if rejected {
            return Err(IndexError::store_write("injected batch failure"));
        }
        let delay = {
            let delays = self.batch_delays.lock();
            ops.iter().find_map(|op| delays.get(op.key()).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.batch(ops, options).await
    }
}
