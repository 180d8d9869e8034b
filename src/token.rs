//! CEP-18 token plumbing
//!
//! - [`LpToken`]: fungible ledger with signature-based approvals, used as the
//!   claim token of every pair and as the ledger of the bundled tokens
//! - [`Cep18Token`]: the interface the Pair and Router consume
//! - transfer helpers that observe balance deltas instead of trusting the
//!   requested amount
use alloc::rc::Rc;
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::{PublicKey, U256};
use odra::prelude::*;
use odra::{ContractEnv, ContractRef};
use crate::errors::DexError;
use crate::events::{Approval, Transfer};
use crate::utils::{address_bytes, blake2b256, zero_address};

/// Tag hashed into every permit struct hash
pub const PERMIT_TAG: &[u8] = b"Permit(owner,spender,value,nonce,deadline)";
/// Version hashed into the permit domain separator
pub const PERMIT_VERSION: &[u8] = b"1";

/// External interface of a CEP-18 token
#[odra::external_contract]
pub trait Cep18Token {
    fn balance_of(&self, owner: Address) -> U256;
    fn transfer(&mut self, to: Address, amount: U256) -> bool;
    fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool;
    fn approve(&mut self, spender: Address, amount: U256) -> bool;
}

/// Domain separator binding permits to one token contract.
pub fn domain_separator(name: &str, token: &Address) -> [u8; 32] {
    blake2b256(&[
        name.as_bytes(),
        PERMIT_VERSION,
        &address_bytes(token),
    ])
}

/// Digest an owner signs to approve `spender` for `value` off-chain.
pub fn permit_digest(
    name: &str,
    token: &Address,
    owner: &Address,
    spender: &Address,
    value: U256,
    nonce: u64,
    deadline: u64,
) -> [u8; 32] {
    let mut value_bytes = [0u8; 32];
    value.to_little_endian(&mut value_bytes);
    let struct_hash = blake2b256(&[
        PERMIT_TAG,
        &address_bytes(owner),
        &address_bytes(spender),
        &value_bytes,
        &nonce.to_le_bytes(),
        &deadline.to_le_bytes(),
    ]);
    blake2b256(&[
        &[0x19, 0x01],
        &domain_separator(name, token),
        &struct_hash,
    ])
}

/// Fungible ledger with permit support
#[odra::module(events = [Transfer, Approval], errors = DexError)]
pub struct LpToken {
    /// Token name
    name: Var<String>,
    /// Token symbol
    symbol: Var<String>,
    /// Token decimals
    decimals: Var<u8>,
    /// Total supply of tokens
    total_supply: Var<U256>,
    /// Balance mapping: owner -> balance
    balances: Mapping<Address, U256>,
    /// Allowance mapping: (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
    /// Next permit nonce per owner
    nonces: Mapping<Address, u64>,
}

#[odra::module]
impl LpToken {
    pub fn init(&mut self, name: String, symbol: String) {
        self.name.set(name);
        self.symbol.set(symbol);
        self.decimals.set(18);
        self.total_supply.set(U256::zero());
    }

    // ============ View Functions ============

    pub fn name(&self) -> String {
        self.name.get_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get_or_default()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or_default()
    }

    /// Nonce the next permit of `owner` must be signed with
    pub fn nonces(&self, owner: Address) -> u64 {
        self.nonces.get(&owner).unwrap_or_default()
    }

    pub fn domain_separator(&self) -> [u8; 32] {
        domain_separator(&self.name(), &self.env().self_address())
    }

    // ============ Write Functions ============

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.raw_transfer(caller, to, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.approve_internal(caller, spender, amount);
        true
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.spend_allowance(from, caller, amount);
        self.raw_transfer(from, to, amount);
        true
    }

    /// Sets an allowance from an owner's off-chain signature over
    /// [`permit_digest`].
    pub fn permit(
        &mut self,
        owner_key: PublicKey,
        spender: Address,
        value: U256,
        deadline: u64,
        signature: Bytes,
    ) {
        if self.env().get_block_time() > deadline {
            self.env().revert(DexError::ExpiredPermit);
        }
        let owner = Address::from(owner_key.to_account_hash());
        let nonce = self.nonces(owner);
        let digest = permit_digest(
            &self.name(),
            &self.env().self_address(),
            &owner,
            &spender,
            value,
            nonce,
            deadline,
        );
        let message = Bytes::from(digest.to_vec());
        if !self.env().verify_signature(&message, &signature, &owner_key) {
            self.env().revert(DexError::InvalidSignature);
        }
        self.nonces.set(&owner, nonce + 1);
        self.approve_internal(owner, spender, value);
    }
}

impl LpToken {
    pub fn mint(&mut self, to: Address, amount: U256) {
        let supply = match self.total_supply().checked_add(amount) {
            Some(supply) => supply,
            None => self.env().revert(DexError::Overflow),
        };
        self.total_supply.set(supply);
        let balance = self.balance_of(to);
        self.balances.set(&to, balance + amount);

        self.env().emit_event(Transfer {
            from: zero_address(),
            to,
            value: amount,
        });
    }

    pub fn burn(&mut self, from: Address, amount: U256) {
        let balance = self.balance_of(from);
        if balance < amount {
            self.env().revert(DexError::InsufficientBalance);
        }
        self.balances.set(&from, balance - amount);
        self.total_supply.set(self.total_supply() - amount);

        self.env().emit_event(Transfer {
            from,
            to: zero_address(),
            value: amount,
        });
    }

    /// Moves balance without touching allowances.
    pub fn raw_transfer(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(DexError::InsufficientBalance);
        }
        self.balances.set(&from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.balances.set(&to, to_balance + amount);

        self.env().emit_event(Transfer { from, to, value: amount });
    }

    /// Decrements an allowance; `U256::MAX` means unlimited.
    pub fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        let current = self.allowance(owner, spender);
        if current == U256::MAX {
            return;
        }
        if current < amount {
            self.env().revert(DexError::InsufficientAllowance);
        }
        self.allowances.set(&(owner, spender), current - amount);
    }

    fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);

        self.env().emit_event(Approval {
            owner,
            spender,
            value: amount,
        });
    }
}

// ============ Transfer Helpers ============

pub fn balance_of(env: Rc<ContractEnv>, token: Address, owner: Address) -> U256 {
    Cep18TokenContractRef::new(env, token).balance_of(owner)
}

pub fn safe_transfer(
    env: Rc<ContractEnv>,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<(), DexError> {
    let mut token_ref = Cep18TokenContractRef::new(env, token);
    if !token_ref.transfer(to, amount) {
        return Err(DexError::TransferFailed);
    }
    Ok(())
}

pub fn safe_transfer_from(
    env: Rc<ContractEnv>,
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> Result<(), DexError> {
    let mut token_ref = Cep18TokenContractRef::new(env, token);
    if !token_ref.transfer_from(from, to, amount) {
        return Err(DexError::TransferFailed);
    }
    Ok(())
}

/// What `owner` gained of `token` since its balance was `before`.
///
/// Every fee-on-transfer path measures through here. A balance that shrank
/// is an `Underflow`, never a silent zero.
pub fn received_since(
    env: Rc<ContractEnv>,
    token: Address,
    owner: Address,
    before: U256,
) -> Result<U256, DexError> {
    let after = balance_of(env, token, owner);
    after.checked_sub(before).ok_or(DexError::Underflow)
}

/// Transfers `amount` to `to` and returns what `to` actually received.
pub fn transfer_measured(
    env: Rc<ContractEnv>,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<U256, DexError> {
    let before = balance_of(env.clone(), token, to);
    safe_transfer(env.clone(), token, to, amount)?;
    received_since(env, token, to, before)
}
