//! Decimal key strings for array indices.
//!
//! Arrays are written with keys `"0"`, `"1"`, ... so every array element needs its
//! index as text. Indices below [`MAX_BSON_INDEX`] come from a table built once on
//! first use and never mutated afterwards; larger indices are formatted on demand.

use crate::config::MAX_BSON_INDEX;
use once_cell::sync::Lazy;
use std::borrow::Cow;

static INDEX_KEYS: Lazy<Vec<String>> =
    Lazy::new(|| (0..MAX_BSON_INDEX).map(|i| i.to_string()).collect());

/// Key text for a 0-based array position
#[inline]
pub fn index_key(index: usize) -> Cow<'static, str> {
    match INDEX_KEYS.get(index) {
        Some(key) => Cow::Borrowed(key.as_str()),
        None => Cow::Owned(index.to_string()),
    }
}

/// Key text for an integer document key
#[inline]
pub fn integer_key(key: i64) -> Cow<'static, str> {
    match usize::try_from(key) {
        Ok(index) => index_key(index),
        Err(_) => Cow::Owned(key.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_and_formatted_keys_agree() {
        assert_eq!(index_key(0), "0");
        assert_eq!(index_key(1023), "1023");
        assert!(matches!(index_key(1023), Cow::Borrowed(_)));
        assert_eq!(index_key(1024), "1024");
        assert!(matches!(index_key(1024), Cow::Owned(_)));
    }

    #[test]
    fn test_integer_keys() {
        assert_eq!(integer_key(5), "5");
        assert_eq!(integer_key(-5), "-5");
        assert_eq!(integer_key(i64::MAX), i64::MAX.to_string());
    }
}
