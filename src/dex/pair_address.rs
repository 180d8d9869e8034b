//! Deterministic pair handles
//!
//! A pair's handle depends only on the factory, the ordered token tuple and
//! the pair code fingerprint, so anyone can compute where a pair lives (or
//! will live) without reading chain state.
use alloc::format;
use odra::prelude::*;
use crate::utils::{address_bytes, blake2b256, sort_tokens};

/// Fingerprint input of the pair contract code
pub const PAIR_CODE_TAG: &[u8] = b"ectoplasm_dex::dex::pair::Pair@1";

/// Fingerprint of the pair contract code
pub fn pair_code_hash() -> [u8; 32] {
    blake2b256(&[PAIR_CODE_TAG])
}

/// `blake2b(0xff ‖ factory ‖ blake2b(token0 ‖ token1) ‖ code_hash)`
///
/// Token order does not matter; the tuple is sorted first.
pub fn derive_pair_handle(
    factory: &Address,
    token_a: &Address,
    token_b: &Address,
    code_hash: &[u8; 32],
) -> [u8; 32] {
    let (token0, token1) = sort_tokens(*token_a, *token_b);
    let salt = blake2b256(&[&address_bytes(&token0), &address_bytes(&token1)]);
    blake2b256(&[&[0xff], &address_bytes(factory), &salt, code_hash])
}

/// Name the child pair contract is installed under
pub fn pair_contract_name(handle: &[u8; 32]) -> String {
    format!("pair_{}", hex::encode(handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ignores_token_order() {
        let env = odra_test::env();
        let factory = env.get_account(0);
        let a = env.get_account(1);
        let b = env.get_account(2);
        let code = pair_code_hash();
        assert_eq!(
            derive_pair_handle(&factory, &a, &b, &code),
            derive_pair_handle(&factory, &b, &a, &code)
        );
    }

    #[test]
    fn test_handle_depends_on_every_input() {
        let env = odra_test::env();
        let factory = env.get_account(0);
        let other_factory = env.get_account(3);
        let a = env.get_account(1);
        let b = env.get_account(2);
        let c = env.get_account(4);
        let code = pair_code_hash();
        let handle = derive_pair_handle(&factory, &a, &b, &code);

        assert_ne!(handle, derive_pair_handle(&other_factory, &a, &b, &code));
        assert_ne!(handle, derive_pair_handle(&factory, &a, &c, &code));
        assert_ne!(handle, derive_pair_handle(&factory, &a, &b, &[0u8; 32]));
    }

    #[test]
    fn test_contract_name_is_prefixed_hex() {
        let name = pair_contract_name(&[0xab; 32]);
        assert!(name.starts_with("pair_abab"));
        assert_eq!(name.len(), 5 + 64);

        let mut handle = [0u8; 32];
        handle[0] = 0x0f;
        handle[31] = 0xa1;
        let name = pair_contract_name(&handle);
        assert!(name.starts_with("pair_0f00"));
        assert!(name.ends_with("00a1"));
    }
}
