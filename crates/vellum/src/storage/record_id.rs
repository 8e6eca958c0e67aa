//! Record-id generation for tables without a declared primary key.
//!
//! Ids are 128-bit lexicographically sortable identifiers: a 48-bit
//! millisecond timestamp followed by 80 bits of entropy, serialized as 26
//! characters of Crockford base32. Uniqueness is guaranteed; creation order
//! within one millisecond is only probabilistic.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ENCODED_LEN: usize = 26;

pub fn new_record_id() -> Vec<u8> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
        & 0xFFFF_FFFF_FFFF;

    let mut entropy = [0u8; 10];
    rand::thread_rng().fill_bytes(&mut entropy);

    encode(join(millis, entropy))
}

fn join(millis: u64, entropy: [u8; 10]) -> u128 {
    let mut value = (millis as u128) << 80;
    for (i, &byte) in entropy.iter().enumerate() {
        value |= u128::from(byte) << (8 * (9 - i));
    }
    value
}

/// 130 bits of base32 cover the 128-bit value; the first character only
/// ever uses 3 bits.
fn encode(value: u128) -> Vec<u8> {
    let mut out = vec![0u8; ENCODED_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 5 * (ENCODED_LEN - 1 - i) as u32;
        *slot = ALPHABET[((value >> shift) & 0x1F) as usize];
    }
    out
}
