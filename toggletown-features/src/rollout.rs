//! Deterministic percentage rollout.
//!
//! Every ToggleTown SDK buckets identically: SHA-256 over the UTF-8 bytes of
//! `"{user_id}:{flag_key}"`, the first four digest bytes read as a big-endian
//! `u32`, reduced modulo 100. Changing any part of this moves users between
//! buckets and breaks agreement with the other SDKs.

use sha2::{Digest, Sha256};

/// Number of buckets identities are spread over.
pub const BUCKET_COUNT: u32 = 100;

/// Hash `key` into a bucket in `0..100`.
pub fn bucket(key: &str) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % BUCKET_COUNT
}

/// Bucket of `user_id` for `flag_key`.
pub fn user_bucket(user_id: &str, flag_key: &str) -> u32 {
    bucket(&format!("{user_id}:{flag_key}"))
}

/// Whether `user_id` falls inside a `percentage` rollout of `flag_key`.
///
/// `percentage <= 0` never includes anyone and `percentage >= 100` includes
/// everyone without hashing.
pub fn in_rollout(user_id: &str, flag_key: &str, percentage: i64) -> bool {
    if percentage <= 0 {
        return false;
    }
    if percentage >= i64::from(BUCKET_COUNT) {
        return true;
    }
    i64::from(user_bucket(user_id, flag_key)) < percentage
}
