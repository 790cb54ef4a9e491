//! Read and write pipelines
//!
//! # Write path
//!
//! ```text
//! Document ──make_index_docs──▶ [index puts.., document put] ──batch──▶ store
//! ```
//!
//! One atomic batch per document. Batches are submitted one after another and
//! never merged, so a failed batch only affects its own document.
//!
//! # Read path
//!
//! ```text
//! Query ──make_range──▶ scan ──▶ index entries ──get (buffered)──▶ documents
//! ```
//!
//! Lookups are started in scan order, at most `read_concurrency` at a time,
//! and their results are yielded in scan order whatever order they finish in.
//! A lookup miss yields `value: None` instead of failing the scan.

use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

use crate::config::{IndexConfig, DEFAULT_READ_CONCURRENCY};
use crate::domain::{
    BatchOp, Document, IndexEntry, IndexSet, KvPair, OrderedStore, Query, ResolvedDocument,
    ScanOptions, ScanRequest, WriteOptions,
};
use crate::range::make_range;
use crate::resolver::IndexResolver;
use crate::{IndexError, Result};

/// Batch prepared for a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBatch {
    pub key: String,
    pub ops: Vec<BatchOp>,
}

/// Acknowledgement for one committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Primary key of the document
    pub key: String,
    /// Operations in the batch (index entries + document)
    pub operations: usize,
}

/// Totals reported by [`IndexPipeline::write`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub committed: usize,
    pub failed: usize,
    pub operations: usize,
}

/// Secondary-index pipeline over an ordered store
pub struct IndexPipeline<S: OrderedStore + ?Sized> {
    store: Arc<S>,
    resolver: IndexResolver,
    read_concurrency: usize,
    write_options: WriteOptions,
}

impl<S: OrderedStore + ?Sized> Clone for IndexPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            read_concurrency: self.read_concurrency,
            write_options: self.write_options,
        }
    }
}

impl<S: OrderedStore + ?Sized + 'static> IndexPipeline<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            resolver: IndexResolver::default(),
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            write_options: WriteOptions::default(),
        }
    }

    /// Build from a validated configuration
    pub fn from_config(store: Arc<S>, config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            resolver: IndexResolver::new(config.missing_placeholder.clone()),
            read_concurrency: config.read_concurrency,
            write_options: config.write_options(),
        })
    }

    pub fn with_read_concurrency(mut self, read_concurrency: usize) -> Self {
        self.read_concurrency = read_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn resolver(&self) -> &IndexResolver {
        &self.resolver
    }

    /// Write options used by [`put`](Self::put) and [`remove`](Self::remove)
    pub fn write_options(&self) -> WriteOptions {
        self.write_options
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Write Path
    // ═══════════════════════════════════════════════════════════════════════

    /// Index and store a single document
    pub async fn put(&self, indexes: &IndexSet, doc: &Document) -> Result<WriteReceipt> {
        let ops = self.resolver.make_index_docs(doc, indexes)?;
        self.commit(
            DocumentBatch {
                key: doc.key.clone(),
                ops,
            },
            self.write_options,
        )
        .await
    }

    /// Lazily commit one batch per incoming document
    ///
    /// Yields one result per document, in input order. A failed batch does not
    /// stop the stream.
    pub fn write_stream<'a, St>(
        &'a self,
        indexes: &'a IndexSet,
        docs: St,
        options: WriteOptions,
    ) -> impl Stream<Item = Result<WriteReceipt>> + 'a
    where
        St: Stream<Item = Document> + 'a,
    {
        add_index_docs(&self.resolver, indexes, docs).then(move |prepared| async move {
            match prepared {
                Ok(batch) => self.commit(batch, options).await,
                Err(err) => Err(err),
            }
        })
    }

    /// Drain `docs`, calling `on_done` once per committed or failed batch
    pub async fn write<St, F>(
        &self,
        indexes: &IndexSet,
        docs: St,
        options: WriteOptions,
        mut on_done: F,
    ) -> WriteSummary
    where
        St: Stream<Item = Document>,
        F: FnMut(Result<WriteReceipt>),
    {
        let results = self.write_stream(indexes, docs, options);
        futures::pin_mut!(results);

        let mut summary = WriteSummary::default();
        while let Some(result) = results.next().await {
            match &result {
                Ok(receipt) => {
                    summary.committed += 1;
                    summary.operations += receipt.operations;
                }
                Err(_) => summary.failed += 1,
            }
            on_done(result);
        }

        tracing::debug!(
            "write finished: {} committed, {} failed",
            summary.committed,
            summary.failed
        );
        summary
    }

    /// Delete a document together with its index entries
    ///
    /// `$latest` entries that now point at another document are left alone.
    /// Returns `false` if the document does not exist.
    ///
    /// The `$latest` ownership check reads the store before the delete batch
    /// is committed, so it is best-effort under concurrent writers: a newer
    /// `put` landing in between can lose its `$latest` entry. Serialize writes
    /// to the same index values when that matters.
    pub async fn remove(&self, indexes: &IndexSet, key: &str) -> Result<bool> {
        let Some(value) = self.get(key).await? else {
            return Ok(false);
        };
        let doc = Document::new(key, value);

        let mut ops = Vec::with_capacity(indexes.len() + 1);
        let entries = self.resolver.entries(&doc, indexes);
        for (index, entry) in indexes.iter().zip(entries) {
            if index.is_latest() {
                let owner = self.store.get(&entry.key).await?;
                if owner.as_deref() != Some(key.as_bytes()) {
                    tracing::debug!("{} entry of {} owned by a newer document", index.name, key);
                    continue;
                }
            }
            ops.push(BatchOp::Del { key: entry.key });
        }
        ops.push(BatchOp::Del {
            key: key.as_bytes().to_vec(),
        });

        self.commit(
            DocumentBatch {
                key: key.to_string(),
                ops,
            },
            self.write_options,
        )
        .await?;
        Ok(true)
    }

    async fn commit(&self, batch: DocumentBatch, options: WriteOptions) -> Result<WriteReceipt> {
        let operations = batch.ops.len();
        match self.store.batch(batch.ops, options).await {
            Ok(()) => {
                tracing::debug!("committed {} ops for {}", operations, batch.key);
                Ok(WriteReceipt {
                    key: batch.key,
                    operations,
                })
            }
            Err(err) => {
                tracing::warn!("batch for {} failed: {}", batch.key, err);
                Err(err)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Read Path
    // ═══════════════════════════════════════════════════════════════════════

    /// Primary document by key
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.store.get(key.as_bytes()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Documents matching `query`, in index order
    ///
    /// `keys_only` is ignored: resolution needs the entry values.
    pub fn read(&self, query: &Query, options: &ScanOptions) -> BoxStream<'static, Result<ResolvedDocument>> {
        let ScanRequest { bound, mut options } = make_range(query, options);
        options.keys_only = false;

        let entries = self.store.scan(&bound, &options);
        resolve_index_docs(Arc::clone(&self.store), entries, self.read_concurrency).boxed()
    }

    /// Raw index entries matching `query`, without primary lookups
    pub fn scan_entries(&self, query: &Query, options: &ScanOptions) -> BoxStream<'static, Result<IndexEntry>> {
        let ScanRequest { bound, options } = make_range(query, options);
        self.store
            .scan(&bound, &options)
            .map(|pair| -> Result<IndexEntry> {
                let pair = pair?;
                Ok(IndexEntry {
                    value: primary_key(pair.value)?,
                    key: pair.key,
                })
            })
            .boxed()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Stream Adapters
// ═══════════════════════════════════════════════════════════════════════════

/// Documents → per-document batches
pub fn add_index_docs<'a, St>(
    resolver: &'a IndexResolver,
    indexes: &'a IndexSet,
    docs: St,
) -> impl Stream<Item = Result<DocumentBatch>> + 'a
where
    St: Stream<Item = Document> + 'a,
{
    docs.map(move |doc| -> Result<DocumentBatch> {
        let ops = resolver.make_index_docs(&doc, indexes)?;
        Ok(DocumentBatch { key: doc.key, ops })
    })
}

/// Index entries → resolved documents, order preserved
///
/// At most `concurrency` lookups are in flight.
pub fn resolve_index_docs<S, St>(
    store: Arc<S>,
    entries: St,
    concurrency: usize,
) -> impl Stream<Item = Result<ResolvedDocument>> + Send + 'static
where
    S: OrderedStore + ?Sized + 'static,
    St: Stream<Item = Result<KvPair>> + Send + 'static,
{
    entries
        .map(move |entry| lookup(Arc::clone(&store), entry))
        .buffered(concurrency.max(1))
}

async fn lookup<S: OrderedStore + ?Sized>(store: Arc<S>, entry: Result<KvPair>) -> Result<ResolvedDocument> {
    let key = primary_key(entry?.value)?;

    let value = match store.get(key.as_bytes()).await? {
        Some(bytes) => Some(serde_json::from_slice(&bytes)?),
        None => {
            tracing::debug!("dangling index entry for {}", key);
            None
        }
    };

    Ok(ResolvedDocument { key, value })
}

fn primary_key(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|err| {
        IndexError::serialization("index entry value is not a UTF-8 primary key").with_source(err)
    })
}
