//! Index entry resolution
//!
//! Turns a document plus a set of index definitions into the batch written for
//! that document. Resolution is total: a keypath that does not resolve is
//! recorded as a placeholder segment so the document write always goes ahead.

use serde_json::Value;

use crate::codec;
use crate::domain::{BatchOp, Document, IndexDefinition, IndexEntry, IndexSet, LATEST};
use crate::{IndexError, Result};

/// Segment written when a keypath does not resolve
pub const MISSING_PLACEHOLDER: &str = "undefined";

/// Outcome of walking a keypath
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldLookup<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> FieldLookup<'a> {
    pub fn found(self) -> Option<&'a Value> {
        match self {
            FieldLookup::Found(v) => Some(v),
            FieldLookup::Missing => None,
        }
    }
}

/// Walk a dot-separated keypath. Numeric segments index into arrays.
pub fn resolve_path<'a>(root: &'a Value, keypath: &str) -> FieldLookup<'a> {
    if keypath.is_empty() {
        return FieldLookup::Found(root);
    }
    walk(root, keypath.split('.'))
}

fn walk<'a, 'k>(current: &'a Value, mut segments: impl Iterator<Item = &'k str>) -> FieldLookup<'a> {
    let Some(segment) = segments.next() else {
        return FieldLookup::Found(current);
    };

    let next = match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };

    match next {
        Some(value) => walk(value, segments),
        None => FieldLookup::Missing,
    }
}

/// Strict variant of [`resolve_path`]
pub fn require_path<'a>(root: &'a Value, keypath: &str) -> Result<&'a Value> {
    resolve_path(root, keypath)
        .found()
        .ok_or_else(|| IndexError::field_resolution(keypath))
}

/// String form of a field value used inside index keys
///
/// Strings are taken verbatim; everything else uses its JSON text.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds index entries for documents
#[derive(Debug, Clone)]
pub struct IndexResolver {
    placeholder: String,
}

impl Default for IndexResolver {
    fn default() -> Self {
        Self::new(MISSING_PLACEHOLDER)
    }
}

impl IndexResolver {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Index entry for a single definition
    pub fn make_index_doc(&self, doc: &Document, index: &IndexDefinition) -> IndexEntry {
        let envelope = doc.envelope();
        self.entry_for(doc, &envelope, index)
    }

    /// One put per index followed by the document's own put
    ///
    /// Derivation itself is total. The only error path is encoding the
    /// document value, which cannot fail for a `serde_json::Value`; it is
    /// still surfaced as [`ErrorKind::Serialization`](crate::ErrorKind)
    /// rather than unwrapped.
    pub fn make_index_docs(&self, doc: &Document, indexes: &IndexSet) -> Result<Vec<BatchOp>> {
        let mut batch: Vec<BatchOp> = self
            .entries(doc, indexes)
            .into_iter()
            .map(BatchOp::from)
            .collect();

        batch.push(BatchOp::Put {
            key: doc.key.clone().into_bytes(),
            value: serde_json::to_vec(&doc.value)?,
        });
        Ok(batch)
    }

    /// Deletes for every index entry of `doc`, followed by the document delete
    pub fn make_delete_ops(&self, doc: &Document, indexes: &IndexSet) -> Vec<BatchOp> {
        let mut batch: Vec<BatchOp> = self
            .entries(doc, indexes)
            .into_iter()
            .map(|entry| BatchOp::Del { key: entry.key })
            .collect();

        batch.push(BatchOp::Del {
            key: doc.key.clone().into_bytes(),
        });
        batch
    }

    /// Index entries only, in index-name order
    pub fn entries(&self, doc: &Document, indexes: &IndexSet) -> Vec<IndexEntry> {
        let envelope = doc.envelope();
        indexes
            .iter()
            .map(|index| self.entry_for(doc, &envelope, index))
            .collect()
    }

    fn entry_for(&self, doc: &Document, envelope: &Value, index: &IndexDefinition) -> IndexEntry {
        let mut segments: Vec<Vec<u8>> = Vec::with_capacity(index.keypaths.len() + 2);
        segments.push(codec::escape(index.joined_keypaths().as_bytes()));

        let mut doc_key = doc.key.as_str();
        for keypath in &index.keypaths {
            if keypath == LATEST {
                doc_key = "";
                continue;
            }

            let text = match resolve_path(envelope, keypath) {
                FieldLookup::Found(value) => coerce(value),
                FieldLookup::Missing => {
                    tracing::trace!(
                        "keypath {} missing on {}, indexing as {}",
                        keypath,
                        doc.key,
                        self.placeholder
                    );
                    self.placeholder.clone()
                }
            };
            segments.push(codec::escape(text.as_bytes()));
        }

        segments.push(doc_key.as_bytes().to_vec());

        IndexEntry {
            key: codec::build_key(&segments),
            value: doc.key.clone(),
        }
    }
}

/// [`IndexResolver::make_index_doc`] with the default placeholder
pub fn make_index_doc(doc: &Document, index: &IndexDefinition) -> IndexEntry {
    IndexResolver::default().make_index_doc(doc, index)
}

/// [`IndexResolver::make_index_docs`] with the default placeholder
pub fn make_index_docs(doc: &Document, indexes: &IndexSet) -> Result<Vec<BatchOp>> {
    IndexResolver::default().make_index_docs(doc, indexes)
}

/// [`IndexResolver::make_delete_ops`] with the default placeholder
pub fn make_delete_ops(doc: &Document, indexes: &IndexSet) -> Vec<BatchOp> {
    IndexResolver::default().make_delete_ops(doc, indexes)
}
