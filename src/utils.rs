//! Identity and hashing helpers shared by the contracts and off-chain callers
use alloc::vec::Vec;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use odra::casper_types::account::AccountHash;
use odra::casper_types::bytesrepr::ToBytes;
use odra::prelude::*;

type Blake2b256 = Blake2b<U32>;

/// The null identity: the all-zero account hash.
///
/// Never a valid token, and the sink for permanently locked claim units.
pub fn zero_address() -> Address {
    Address::from(AccountHash::new([0u8; 32]))
}

/// Canonical byte encoding of an address.
pub fn address_bytes(address: &Address) -> Vec<u8> {
    // Serializing a fixed-size hash cannot fail.
    address.to_bytes().unwrap_or_default()
}

/// Blake2b-256 over the concatenation of `parts`.
pub fn blake2b256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Orders two tokens the way pairs store them.
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_tokens_is_order_independent() {
        let env = odra_test::env();
        let a = env.get_account(1);
        let b = env.get_account(2);
        assert_eq!(sort_tokens(a, b), sort_tokens(b, a));
        let (t0, t1) = sort_tokens(a, b);
        assert!(t0 < t1);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let one = blake2b256(&[b"pair", b"v1"]);
        let two = blake2b256(&[b"pair", b"v1"]);
        let other = blake2b256(&[b"pair", b"v2"]);
        assert_eq!(one, two);
        assert_ne!(one, other);
    }
}
