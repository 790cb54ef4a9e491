//! Domain Models
//!
//! Documents, index definitions, index entries, queries and the byte-level
//! batch/scan vocabulary shared with the store port.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keypath sentinel: omit the document key so the newest write wins
pub const LATEST: &str = "$latest";

// ═══════════════════════════════════════════════════════════════════════════
// Documents
// ═══════════════════════════════════════════════════════════════════════════

/// Primary document
///
/// The pipeline never mutates a document; it only derives index entries from it.
///
/// # Examples
///
/// ```rust
/// use keypath_index::Document;
///
/// let doc = Document::new("u1", serde_json::json!({ "email": "a@x.com" }));
/// assert_eq!(doc.key, "u1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary key
    pub key: String,
    /// Structured record
    pub value: Value,
}

impl Document {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Envelope the keypaths are resolved against: `{ "key": .., "value": .. }`
    pub fn envelope(&self) -> Value {
        serde_json::json!({ "key": self.key, "value": self.value })
    }
}

/// A document produced by the read path
///
/// `value` is `None` when the index entry outlived its primary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDocument {
    pub key: String,
    pub value: Option<Value>,
}

impl ResolvedDocument {
    /// True if the index entry points at a deleted document
    pub fn is_dangling(&self) -> bool {
        self.value.is_none()
    }

    /// Convert into a [`Document`], dropping dangling results
    pub fn into_document(self) -> Option<Document> {
        let key = self.key;
        self.value.map(|value| Document { key, value })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Index Definitions
// ═══════════════════════════════════════════════════════════════════════════

/// Named, ordered list of keypaths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub keypaths: Vec<String>,
}

impl IndexDefinition {
    pub fn new<I, S>(name: impl Into<String>, keypaths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keypaths: keypaths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this index keeps only the most recent document per value tuple
    pub fn is_latest(&self) -> bool {
        self.keypaths.iter().any(|k| k == LATEST)
    }

    /// Keypaths that resolve to field values (sentinel excluded)
    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.keypaths
            .iter()
            .map(String::as_str)
            .filter(|k| *k != LATEST)
    }

    /// Keypath-set name used as the first key segment
    pub fn joined_keypaths(&self) -> String {
        self.keypaths.join(",")
    }
}

/// Ordered collection of index definitions, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    definitions: BTreeMap<String, IndexDefinition>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a definition
    pub fn with(mut self, definition: IndexDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn insert(&mut self, definition: IndexDefinition) -> Option<IndexDefinition> {
        self.definitions.insert(definition.name.clone(), definition)
    }

    pub fn get(&self, name: &str) -> Option<&IndexDefinition> {
        self.definitions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<IndexDefinition> for IndexSet {
    fn from_iter<T: IntoIterator<Item = IndexDefinition>>(iter: T) -> Self {
        let mut set = Self::new();
        for definition in iter {
            set.insert(definition);
        }
        set
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Entries & Batches
// ═══════════════════════════════════════════════════════════════════════════

/// Derived index entry: composite key → primary document key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub value: String,
}

/// One operation inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Del { key: Vec<u8> },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Del { key } => key,
        }
    }

    pub fn is_put(&self) -> bool {
        matches!(self, BatchOp::Put { .. })
    }
}

impl From<IndexEntry> for BatchOp {
    fn from(entry: IndexEntry) -> Self {
        BatchOp::Put {
            key: entry.key,
            value: entry.value.into_bytes(),
        }
    }
}

/// Raw key/value pair yielded by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Queries & Options
// ═══════════════════════════════════════════════════════════════════════════

/// Per-field query value: exact match or inclusive range
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Exact(Value),
    Between(Value, Value),
}

impl QueryValue {
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        QueryValue::Between(low.into(), high.into())
    }

    /// (lower seed, upper seed)
    pub fn bounds(&self) -> (&Value, &Value) {
        match self {
            QueryValue::Exact(v) => (v, v),
            QueryValue::Between(low, high) => (low, high),
        }
    }
}

macro_rules! exact_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Exact(Value::from(value))
                }
            }
        )*
    };
}

exact_from!(Value, &str, String, bool, i32, i64, u32, u64, f64);

/// Query over one index: keypaths plus positional values
///
/// Supplying fewer values than keypaths yields a prefix query.
///
/// # Examples
///
/// ```rust
/// use keypath_index::{Query, QueryValue};
///
/// let exact = Query::new(["value.email"], ["a@x.com"]);
/// let ranged = Query::field("value.age", QueryValue::between(20, 29));
/// assert_eq!(exact.values.len(), 1);
/// assert_eq!(ranged.fields, vec!["value.age".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub fields: Vec<String>,
    pub values: Vec<QueryValue>,
}

impl Query {
    pub fn new<F, S, V, Q>(fields: F, values: V) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
        V: IntoIterator<Item = Q>,
        Q: Into<QueryValue>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-field query
    pub fn field(field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self {
            fields: vec![field.into()],
            values: vec![value.into()],
        }
    }

    /// Query every entry of an index, regardless of values
    pub fn all<F, S>(fields: F) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            values: Vec::new(),
        }
    }

    /// Query matching the keypath list of an index definition
    pub fn for_index<V, Q>(definition: &IndexDefinition, values: V) -> Self
    where
        V: IntoIterator<Item = Q>,
        Q: Into<QueryValue>,
    {
        Self::new(definition.keypaths.iter().cloned(), values)
    }
}

/// Inclusive scan bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBound {
    pub lower: Vec<u8>,
    pub upper: Vec<u8>,
}

impl RangeBound {
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.lower.as_slice() && key <= self.upper.as_slice()
    }
}

/// Caller-supplied scan options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Maximum number of entries (None = unlimited)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Iterate from upper to lower bound
    #[serde(default)]
    pub reverse: bool,
    /// Skip values (scan yields empty values)
    #[serde(default)]
    pub keys_only: bool,
}

impl ScanOptions {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Bounds merged with the caller's options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub bound: RangeBound,
    pub options: ScanOptions,
}

/// Write options forwarded to the store's batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Ask the store to flush before acknowledging
    #[serde(default)]
    pub sync: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_envelope() {
        let doc = Document::new("u1", json!({ "email": "a@x.com" }));
        assert_eq!(
            doc.envelope(),
            json!({ "key": "u1", "value": { "email": "a@x.com" } })
        );
    }

    #[test]
    fn test_resolved_document_dangling() {
        let live = ResolvedDocument {
            key: "u1".into(),
            value: Some(json!(1)),
        };
        let gone = ResolvedDocument {
            key: "u2".into(),
            value: None,
        };
        assert!(!live.is_dangling());
        assert!(gone.is_dangling());
        assert_eq!(live.into_document(), Some(Document::new("u1", json!(1))));
        assert_eq!(gone.into_document(), None);
    }

    #[test]
    fn test_index_definition_latest() {
        let plain = IndexDefinition::new("byAge", ["value.age"]);
        let latest = IndexDefinition::new("lastByEmail", ["value.email", LATEST]);

        assert!(!plain.is_latest());
        assert!(latest.is_latest());
        assert_eq!(latest.field_paths().collect::<Vec<_>>(), vec!["value.email"]);
        assert_eq!(latest.joined_keypaths(), "value.email,$latest");
    }

    #[test]
    fn test_index_set_ordered_by_name() {
        let set: IndexSet = vec![
            IndexDefinition::new("z", ["value.z"]),
            IndexDefinition::new("a", ["value.a"]),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = set.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
        assert_eq!(set.len(), 2);
        assert!(set.get("a").is_some());
    }

    #[test]
    fn test_query_value_bounds() {
        let exact = QueryValue::from(30);
        assert_eq!(exact.bounds(), (&json!(30), &json!(30)));

        let range = QueryValue::between("a", "m");
        assert_eq!(range.bounds(), (&json!("a"), &json!("m")));
    }

    #[test]
    fn test_query_for_index() {
        let def = IndexDefinition::new("loc", ["value.country", "value.city"]);
        let query = Query::for_index(&def, ["US"]);
        assert_eq!(query.fields.len(), 2);
        assert_eq!(query.values, vec![QueryValue::Exact(json!("US"))]);
    }

    #[test]
    fn test_batch_op_from_entry() {
        let entry = IndexEntry {
            key: vec![0xFF, b'a', 0xFF],
            value: "u1".into(),
        };
        let op = BatchOp::from(entry);
        assert!(op.is_put());
        assert_eq!(op.key(), &[0xFF, b'a', 0xFF]);
    }

    #[test]
    fn test_range_bound_contains() {
        let bound = RangeBound {
            lower: b"b".to_vec(),
            upper: b"d".to_vec(),
        };
        assert!(bound.contains(b"b"));
        assert!(bound.contains(b"c"));
        assert!(bound.contains(b"d"));
        assert!(!bound.contains(b"a"));
        assert!(!bound.contains(b"e"));
    }

    #[test]
    fn test_scan_options_builders() {
        let opts = ScanOptions::default().limit(5).reverse();
        assert_eq!(opts.limit, Some(5));
        assert!(opts.reverse);
        assert!(!opts.keys_only);
    }
}
