//! Range construction
//!
//! Builds the inclusive scan bounds that select exactly the index entries
//! matching a [`Query`]:
//!
//! ```text
//! lower = D fields D gte_1 D .. D gte_n D
//! upper = D fields D lte_1 D .. D lte_n D D
//! ```
//!
//! The doubled trailing delimiter on `upper` sorts after any key that shares
//! the value prefix, whatever document key or further segments follow. Keys
//! whose remaining segments are empty are runs of delimiters, so `upper` gets
//! one extra delimiter per unconstrained field after the first.
//!
//! Because of the trailing delimiters the upper value acts as an inclusive
//! prefix: `between("b", "d")` also matches `"dz"`.
//!
//! Empty trailing values are trimmed, but a query that supplies values always
//! keeps its first segment: an exact `""` query frames as `D fields D D` and
//! selects only entries whose first value is empty. A query with no values
//! selects the whole index: `lower` is then just `D fields D`.

use crate::codec::{self, DELIMITER};
use crate::domain::{Query, RangeBound, ScanOptions, ScanRequest, LATEST};
use crate::resolver::coerce;

/// Bounds for `query`
pub fn make_bound(query: &Query) -> RangeBound {
    let fields = codec::escape(query.fields.join(",").as_bytes());

    let mut gte = Vec::with_capacity(query.values.len());
    let mut lte = Vec::with_capacity(query.values.len());
    for value in &query.values {
        let (low, high) = value.bounds();
        gte.push(codec::escape(coerce(low).as_bytes()));
        lte.push(codec::escape(coerce(high).as_bytes()));
    }
    trim_empty_tail(&mut gte);
    trim_empty_tail(&mut lte);

    let lower = frame(&fields, &gte);
    let mut upper = frame(&fields, &lte);
    upper.extend(std::iter::repeat(DELIMITER).take(trailing_segments(query, lte.len())));

    RangeBound { lower, upper }
}

/// Bounds merged with a copy of the caller's scan options
pub fn make_range(query: &Query, options: &ScanOptions) -> ScanRequest {
    ScanRequest {
        bound: make_bound(query),
        options: options.clone(),
    }
}

fn frame(fields: &[u8], segments: &[Vec<u8>]) -> Vec<u8> {
    let mut key = codec::build_key([fields]);
    if !segments.is_empty() {
        key.extend_from_slice(&segments.join(&DELIMITER));
        key.push(DELIMITER);
    }
    key
}

// Segments an entry may still carry after the bound prefix: unconstrained
// fields plus the document key. Never less than one.
fn trailing_segments(query: &Query, constrained: usize) -> usize {
    let fields = query.fields.iter().filter(|f| *f != LATEST).count();
    fields.saturating_sub(constrained) + 1
}

fn trim_empty_tail(segments: &mut Vec<Vec<u8>>) {
    while segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
}
