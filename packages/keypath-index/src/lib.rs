//! keypath-index - Secondary indexes over an ordered key-value store
//!
//! > "Derive the index from the document, write both in one batch, read by range."
//!
//! ## Core Principles
//!
//! 1. **One batch per document**: index entries and the document are committed
//!    atomically; batches are never merged across documents
//! 2. **Order-preserving keys**: `0xFF`-framed composite keys sort by keypath
//!    set, then field values, then document key
//! 3. **Total derivation**: a keypath that does not resolve is indexed as a
//!    placeholder; building a batch never blocks the document write
//! 4. **Stale entries are not fatal**: a dangling index entry reads as
//!    `value: None`
//!
//! ## Layout
//!
//! - [`codec`]: delimiter escaping and key framing
//! - [`resolver`]: keypath resolution and batch construction
//! - [`range`]: query → scan bounds
//! - [`pipeline`]: streaming write/read over an [`OrderedStore`]
//! - [`infrastructure`]: store adapters ([`MemoryStore`])
//! - [`config`]: YAML / builder configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keypath_index::{Document, IndexConfig, IndexPipeline, MemoryStore, Query, ScanOptions};
//!
//! let config = IndexConfig::default().index("byEmail", ["value.email"]);
//! let pipeline = IndexPipeline::from_config(Arc::new(MemoryStore::new()), &config)?;
//! let indexes = config.index_set();
//!
//! pipeline.put(&indexes, &Document::new("u1", json!({ "email": "a@x.com" }))).await?;
//!
//! let docs: Vec<_> = pipeline
//!     .read(&Query::field("value.email", "a@x.com"), &ScanOptions::default())
//!     .try_collect()
//!     .await?;
//! ```

pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod pipeline;
pub mod range;
pub mod resolver;

pub use error::{ErrorKind, IndexError, Result};

pub use config::{ConfigError, IndexConfig};
pub use domain::{
    BatchOp, Document, IndexDefinition, IndexEntry, IndexSet, KvPair, OrderedStore, Query,
    QueryValue, RangeBound, ResolvedDocument, ScanOptions, ScanRequest, WriteOptions, LATEST,
};
pub use infrastructure::MemoryStore;
pub use pipeline::{
    add_index_docs, resolve_index_docs, DocumentBatch, IndexPipeline, WriteReceipt, WriteSummary,
};
pub use range::{make_bound, make_range};
pub use resolver::{make_delete_ops, make_index_doc, make_index_docs, IndexResolver};
