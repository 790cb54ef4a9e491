//! In-Memory Ordered Store
//!
//! BTreeMap-backed implementation of [`OrderedStore`]. Batches are applied
//! under a single write lock, which makes them atomic with respect to every
//! reader. Scans iterate over a snapshot taken when the scan starts.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use crate::domain::{BatchOp, KvPair, OrderedStore, RangeBound, ScanOptions, WriteOptions};
use crate::Result;

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys (documents and index entries)
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All keys in order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.read().keys().cloned().collect()
    }

    /// Remove a key outside of any batch, leaving index entries behind
    pub fn remove_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.write().remove(key)
    }

    fn collect_range(&self, bound: &RangeBound, options: &ScanOptions) -> Vec<KvPair> {
        if bound.lower > bound.upper {
            return Vec::new();
        }

        let data = self.data.read();
        let range = data.range::<[u8], _>((
            Bound::Included(bound.lower.as_slice()),
            Bound::Included(bound.upper.as_slice()),
        ));
        let limit = options.limit.unwrap_or(usize::MAX);
        let to_pair = |(k, v): (&Vec<u8>, &Vec<u8>)| KvPair {
            key: k.clone(),
            value: if options.keys_only { Vec::new() } else { v.clone() },
        };

        if options.reverse {
            range.rev().take(limit).map(to_pair).collect()
        } else {
            range.take(limit).map(to_pair).collect()
        }
    }
}

#[async_trait]
impl OrderedStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(&self, bound: &RangeBound, options: &ScanOptions) -> BoxStream<'static, Result<KvPair>> {
        let pairs = self.collect_range(bound, options);
        stream::iter(pairs.into_iter().map(Ok)).boxed()
    }

    async fn batch(&self, ops: Vec<BatchOp>, _options: WriteOptions) -> Result<()> {
        let mut data = self.data.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Del { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn put(key: &[u8], value: &[u8]) -> BatchOp {
        BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .batch(
                vec![put(b"a", b"1"), put(b"b", b"2"), put(b"c", b"3"), put(b"d", b"4")],
                WriteOptions::default(),
            )
            .await
            .unwrap();
        store
    }

    fn bound(lower: &[u8], upper: &[u8]) -> RangeBound {
        RangeBound {
            lower: lower.to_vec(),
            upper: upper.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_get_and_batch() {
        let store = seeded().await;
        assert_eq!(store.get(b"a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"z").await.unwrap(), None);

        store
            .batch(
                vec![BatchOp::Del { key: b"a".to_vec() }, put(b"e", b"5")],
                WriteOptions { sync: true },
            )
            .await
            .unwrap();
        assert_eq!(store.get(b"a").await.unwrap(), None);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_scan_inclusive_bounds() {
        let store = seeded().await;
        let pairs: Vec<KvPair> = store
            .scan(&bound(b"b", b"c"), &ScanOptions::default())
            .try_collect()
            .await
            .unwrap();
        let keys: Vec<_> = pairs.iter().map(|p| p.key.clone()).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[tokio::test]
    async fn test_scan_reverse_limit_keys_only() {
        let store = seeded().await;
        let options = ScanOptions {
            limit: Some(2),
            reverse: true,
            keys_only: true,
        };
        let pairs: Vec<KvPair> = store
            .scan(&bound(b"a", b"d"), &options)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].key, b"d".to_vec());
        assert_eq!(pairs[1].key, b"c".to_vec());
        assert!(pairs.iter().all(|p| p.value.is_empty()));
    }

    #[tokio::test]
    async fn test_scan_inverted_bound_is_empty() {
        let store = seeded().await;
        let pairs: Vec<KvPair> = store
            .scan(&bound(b"d", b"a"), &ScanOptions::default())
            .try_collect()
            .await
            .unwrap();
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn test_remove_raw() {
        let store = seeded().await;
        assert_eq!(store.remove_raw(b"b"), Some(b"2".to_vec()));
        assert_eq!(store.keys(), vec![b"a".to_vec(), b"c".to_vec(), b"d".to_vec()]);
        assert!(!store.is_empty());
    }
}
