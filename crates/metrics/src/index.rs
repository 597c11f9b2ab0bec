//! Label tuple index with explicit collision chains
//!
//! [`HashedTagIndex`] maps an ordered label-value tuple to a value (the
//! metric vector stores the current generation there). Tuples are bucketed by
//! their 64-bit hash; each bucket is a short chain compared by full tuple
//! equality, so hash collisions never merge two series.
//!
//! The index does no locking of its own. Callers serialize access.

use std::collections::HashMap;

use crate::hash::{hash_parts, TupleHashFn};

type Chain<T> = Vec<(Vec<String>, T)>;

/// Hash-bucketed map from label tuples to values
#[derive(Debug, Clone)]
pub struct HashedTagIndex<T = String> {
    buckets: HashMap<u64, Chain<T>>,
    len: usize,
    hasher: TupleHashFn,
}

impl<T> Default for HashedTagIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn tuple_eq<S: AsRef<str>>(stored: &[String], tuple: &[S]) -> bool {
    stored.len() == tuple.len() && stored.iter().zip(tuple).all(|(a, b)| a == b.as_ref())
}

impl<T> HashedTagIndex<T> {
    /// Create an empty index using FNV tuple hashing
    pub fn new() -> Self {
        Self::with_hasher(hash_parts)
    }

    /// Create an empty index with a custom tuple hash
    ///
    /// A constant hash forces every tuple into one bucket, which is how the
    /// collision paths are exercised.
    pub fn with_hasher(hasher: TupleHashFn) -> Self {
        Self { buckets: HashMap::new(), len: 0, hasher }
    }

    fn hash<S: AsRef<str>>(&self, tuple: &[S]) -> u64 {
        (self.hasher)(&mut tuple.iter().map(|value| value.as_ref()))
    }

    /// Insert or overwrite the value stored for `tuple`
    ///
    /// Returns the previous value when the tuple was already present.
    pub fn put<S: AsRef<str>>(&mut self, tuple: &[S], value: T) -> Option<T> {
        let hash = self.hash(tuple);
        let chain = self.buckets.entry(hash).or_default();

        if let Some(slot) = chain.iter_mut().find(|(stored, _)| tuple_eq(stored, tuple)) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        let owned = tuple.iter().map(|value| value.as_ref().to_owned()).collect();
        chain.push((owned, value));
        self.len += 1;
        None
    }

    /// Look up the value stored for `tuple`
    pub fn get<S: AsRef<str>>(&self, tuple: &[S]) -> Option<&T> {
        self.buckets
            .get(&self.hash(tuple))?
            .iter()
            .find(|(stored, _)| tuple_eq(stored, tuple))
            .map(|(_, value)| value)
    }

    /// Remove `tuple`, returning its value if it was present
    ///
    /// Empty buckets are dropped so churn on high-cardinality labels does not
    /// leave dead keys behind.
    pub fn delete<S: AsRef<str>>(&mut self, tuple: &[S]) -> Option<T> {
        let hash = self.hash(tuple);
        let chain = self.buckets.get_mut(&hash)?;
        let position = chain.iter().position(|(stored, _)| tuple_eq(stored, tuple))?;

        let (_, value) = chain.swap_remove(position);
        if chain.is_empty() {
            self.buckets.remove(&hash);
        }
        self.len -= 1;
        Some(value)
    }

    /// Number of stored tuples
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no tuples
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Remove every tuple
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    /// Iterate over stored tuples and their values in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &T)> {
        self.buckets.values().flatten().map(|(tuple, value)| (tuple.as_slice(), value))
    }
}
