//! Store Port (Trait Interface)
//!
//! The pipeline talks to the ordered key-value store through this trait only:
//! - Production: any LSM / B-tree store with ordered iteration and atomic batches
//! - Testing: [`MemoryStore`](crate::infrastructure::MemoryStore)

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::models::{BatchOp, KvPair, RangeBound, ScanOptions, WriteOptions};
use crate::Result;

/// Ordered key-value store port
///
/// Keys compare as raw bytes. Implementations must apply a batch atomically:
/// either every operation is visible afterwards or none is.
#[async_trait]
pub trait OrderedStore: Send + Sync {
    /// Point lookup. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Ordered iteration over `[bound.lower, bound.upper]` (both inclusive)
    ///
    /// Honors `limit`, `reverse` and `keys_only`. Dropping the stream closes
    /// the cursor.
    fn scan(&self, bound: &RangeBound, options: &ScanOptions) -> BoxStream<'static, Result<KvPair>>;

    /// Apply all operations atomically
    async fn batch(&self, ops: Vec<BatchOp>, options: WriteOptions) -> Result<()>;
}
