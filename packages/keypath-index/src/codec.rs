//! Composite key codec
//!
//! Index keys live in the same key space as primary documents. They are framed
//! by the reserved [`DELIMITER`] byte:
//!
//! ```text
//! 0xFF <keypaths> 0xFF <value 1> 0xFF ... 0xFF <value n> 0xFF <doc key> 0xFF
//! ```
//!
//! # Laws
//!
//! - `escape(s)` never contains [`DELIMITER`]
//! - `unescape(escape(s)) == s` for every `s` that does not already contain
//!   [`ESCAPED_DELIMITER`]
//! - bytes other than [`DELIMITER`] pass through unchanged, so escaped segments
//!   keep the byte order of their source
//!
//! `0xFF` never occurs in UTF-8, so a primary key (always a `String`) can never
//! be mistaken for an index key, and a doubled delimiter sorts after every
//! framed suffix.

/// Reserved framing byte. Sorts above every byte of escaped content.
pub const DELIMITER: u8 = 0xFF;

/// Substitute written in place of a literal [`DELIMITER`]
pub const ESCAPED_DELIMITER: &[u8] = b"&&xff";

const _: () = {
    assert!(!ESCAPED_DELIMITER.is_empty());
    assert!(ESCAPED_DELIMITER[0] != DELIMITER);
    let mut i = 0;
    while i < ESCAPED_DELIMITER.len() {
        assert!(ESCAPED_DELIMITER[i] != DELIMITER);
        i += 1;
    }
};

/// Replace every literal delimiter byte with [`ESCAPED_DELIMITER`].
pub fn escape(value: &[u8]) -> Vec<u8> {
    let hits = value.iter().filter(|&&b| b == DELIMITER).count();
    if hits == 0 {
        return value.to_vec();
    }

    let mut out = Vec::with_capacity(value.len() + hits * (ESCAPED_DELIMITER.len() - 1));
    for &b in value {
        if b == DELIMITER {
            out.extend_from_slice(ESCAPED_DELIMITER);
        } else {
            out.push(b);
        }
    }
    out
}

/// Inverse of [`escape`].
pub fn unescape(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i..].starts_with(ESCAPED_DELIMITER) {
            out.push(DELIMITER);
            i += ESCAPED_DELIMITER.len();
        } else {
            out.push(value[i]);
            i += 1;
        }
    }
    out
}

/// Frame already-escaped segments: `D seg1 D seg2 ... D`.
pub fn build_key<I, S>(segments: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut key = vec![DELIMITER];
    for segment in segments {
        key.extend_from_slice(segment.as_ref());
        key.push(DELIMITER);
    }
    key
}

/// Split a framed key back into its (still escaped) segments.
///
/// Returns `None` if the key is not framed by the delimiter on both ends.
pub fn split_key(key: &[u8]) -> Option<Vec<&[u8]>> {
    if key.len() < 2 || !is_index_key(key) || key[key.len() - 1] != DELIMITER {
        return None;
    }
    Some(key[1..key.len() - 1].split(|&b| b == DELIMITER).collect())
}

/// Index keys start with the delimiter; primary keys never do.
pub fn is_index_key(key: &[u8]) -> bool {
    key.first() == Some(&DELIMITER)
}
