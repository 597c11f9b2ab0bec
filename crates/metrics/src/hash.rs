//! FNV-1 hashing over ordered string tuples
//!
//! Each string is followed by a `\n` separator before the next one is folded
//! in, so `["ab", "c"]` and `["a", "bc"]` land in different buckets. The hash
//! only picks a bucket; equality is always checked on the full tuple.

/// 64-bit FNV offset basis
pub const OFFSET: u64 = 14_695_981_039_346_656_037;

/// 64-bit FNV prime
pub const PRIME: u64 = 1_099_511_628_211;

const SEPARATOR: u8 = b'\n';

/// Signature of a tuple hash function, fed one label value at a time
pub type TupleHashFn = fn(&mut dyn Iterator<Item = &str>) -> u64;

#[inline]
fn fold_byte(hash: u64, byte: u8) -> u64 {
    hash.wrapping_mul(PRIME) ^ u64::from(byte)
}

/// Fold one string and the trailing separator into `hash`
#[inline]
pub fn fold_str(hash: u64, value: &str) -> u64 {
    let hash = value.bytes().fold(hash, fold_byte);
    fold_byte(hash, SEPARATOR)
}

/// Hash a sequence of strings in order
pub fn hash_parts(parts: &mut dyn Iterator<Item = &str>) -> u64 {
    parts.fold(OFFSET, fold_str)
}

/// Hash an ordered label-value tuple
///
/// ```
/// use lifecycle_metrics::hash::hash_tuple;
///
/// assert_eq!(hash_tuple(&["a", "b"]), hash_tuple(&[String::from("a"), String::from("b")]));
/// assert_ne!(hash_tuple(&["a", "b"]), hash_tuple(&["b", "a"]));
/// ```
pub fn hash_tuple<S: AsRef<str>>(tuple: &[S]) -> u64 {
    hash_parts(&mut tuple.iter().map(|value| value.as_ref()))
}
