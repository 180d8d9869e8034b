//! Factory contract for the DEX
//!
//! The Factory is the pair registry and the fee authority:
//! - Creates one Pair per unordered token tuple at a content-derived handle
//! - Answers "does a pair exist / where" in either token order
//! - Holds the swap fee, the protocol fee tier and the operator fee tier
//! - Counts swaps reported by the pairs it created
use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;
use crate::dex::pair::PairFactoryContractRef;
use crate::dex::pair_address::{derive_pair_handle, pair_code_hash, pair_contract_name};
use crate::errors::DexError;
use crate::events::PairCreated;
use crate::math::{DEFAULT_PROTOCOL_FEE, DEFAULT_TOTAL_FEE, MAX_OPERATOR_FEE_PERCENT};
use crate::utils::{sort_tokens, zero_address};

/// Snapshot of every governance parameter
#[odra::odra_type]
pub struct FactoryInfo {
    pub fee_to: Option<Address>,
    pub fee_to_setter: Address,
    pub operator_fee_to: Option<Address>,
    pub operator_fee_setter: Address,
    /// Share of protocol fee units routed to the operator, 0..=100
    pub operator_fee_percent: u32,
    /// Swap fee in units of 1/1000
    pub total_fee: u32,
    /// Protocol share of fee growth in units of 1/10000
    pub protocol_fee: u32,
    pub total_swaps: U256,
    pub all_pairs_length: u32,
}

/// Factory contract
#[odra::module(events = [PairCreated], errors = DexError)]
pub struct Factory {
    /// Recipient of the protocol fee, if switched on
    fee_to: Var<Option<Address>>,
    /// May change `fee_to`, the main fees and itself
    fee_to_setter: Var<Address>,
    /// Recipient of the operator tier, if any
    operator_fee_to: Var<Option<Address>>,
    /// May change the operator tier and itself
    operator_fee_setter: Var<Address>,
    operator_fee_percent: Var<u32>,
    total_fee: Var<u32>,
    protocol_fee: Var<u32>,
    total_swaps: Var<U256>,
    /// (tokenA, tokenB) -> pair, stored in both orders
    pairs: Mapping<(Address, Address), Address>,
    /// creation index -> pair
    all_pairs: Mapping<u32, Address>,
    all_pairs_length: Var<u32>,
    /// handle -> pair
    pairs_by_handle: Mapping<[u8; 32], Address>,
    /// Deployer of Pair contracts
    pair_factory: Var<Address>,
}

#[odra::module]
impl Factory {
    pub fn init(
        &mut self,
        fee_to_setter: Address,
        operator_fee_setter: Address,
        pair_factory: Address,
    ) {
        self.fee_to.set(None);
        self.fee_to_setter.set(fee_to_setter);
        self.operator_fee_to.set(None);
        self.operator_fee_setter.set(operator_fee_setter);
        self.operator_fee_percent.set(0);
        self.total_fee.set(DEFAULT_TOTAL_FEE);
        self.protocol_fee.set(DEFAULT_PROTOCOL_FEE);
        self.total_swaps.set(U256::zero());
        self.all_pairs_length.set(0);
        self.pair_factory.set(pair_factory);
    }

    // ============ View Functions ============

    /// Pair for the tuple, in either order
    pub fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.pairs.get(&(token_a, token_b))
    }

    /// Pair created at `index` (0-based)
    pub fn all_pairs(&self, index: u32) -> Option<Address> {
        self.all_pairs.get(&index)
    }

    pub fn all_pairs_length(&self) -> u32 {
        self.all_pairs_length.get_or_default()
    }

    /// Handle the tuple's pair has or will have
    pub fn pair_handle(&self, token_a: Address, token_b: Address) -> [u8; 32] {
        derive_pair_handle(
            &self.env().self_address(),
            &token_a,
            &token_b,
            &pair_code_hash(),
        )
    }

    pub fn get_pair_by_handle(&self, handle: [u8; 32]) -> Option<Address> {
        self.pairs_by_handle.get(&handle)
    }

    pub fn fee_to(&self) -> Option<Address> {
        self.fee_to.get_or_default()
    }

    pub fn fee_to_setter(&self) -> Address {
        self.fee_to_setter.get().unwrap_or_revert(&self.env())
    }

    pub fn operator_fee_to(&self) -> Option<Address> {
        self.operator_fee_to.get_or_default()
    }

    pub fn operator_fee_setter(&self) -> Address {
        self.operator_fee_setter.get().unwrap_or_revert(&self.env())
    }

    /// Deployer of the pair contracts
    pub fn pair_factory(&self) -> Address {
        self.pair_factory.get().unwrap_or_revert(&self.env())
    }

    pub fn operator_fee_percent(&self) -> u32 {
        self.operator_fee_percent.get_or_default()
    }

    pub fn total_fee(&self) -> u32 {
        self.total_fee.get_or_default()
    }

    pub fn protocol_fee(&self) -> u32 {
        self.protocol_fee.get_or_default()
    }

    pub fn total_swaps(&self) -> U256 {
        self.total_swaps.get_or_default()
    }

    pub fn all_info(&self) -> FactoryInfo {
        FactoryInfo {
            fee_to: self.fee_to(),
            fee_to_setter: self.fee_to_setter(),
            operator_fee_to: self.operator_fee_to(),
            operator_fee_setter: self.operator_fee_setter(),
            operator_fee_percent: self.operator_fee_percent(),
            total_fee: self.total_fee(),
            protocol_fee: self.protocol_fee(),
            total_swaps: self.total_swaps(),
            all_pairs_length: self.all_pairs_length(),
        }
    }

    // ============ Write Functions ============

    /// Deploys the pair for `(token_a, token_b)` and registers it.
    pub fn create_pair(&mut self, token_a: Address, token_b: Address) -> Address {
        if token_a == token_b {
            self.env().revert(DexError::IdenticalAddresses);
        }
        let (token0, token1) = sort_tokens(token_a, token_b);
        if token0 == zero_address() || token1 == zero_address() {
            self.env().revert(DexError::ZeroAddress);
        }
        if self.pairs.get(&(token0, token1)).is_some() {
            self.env().revert(DexError::PairExists);
        }

        let self_address = self.env().self_address();
        let handle = derive_pair_handle(&self_address, &token0, &token1, &pair_code_hash());
        let (pair, _) = PairFactoryContractRef::new(self.env(), self.pair_factory()).new_contract(
            pair_contract_name(&handle),
            token0,
            token1,
            self_address,
        );

        self.pairs.set(&(token0, token1), pair);
        self.pairs.set(&(token1, token0), pair);
        self.pairs_by_handle.set(&handle, pair);
        let index = self.all_pairs_length();
        self.all_pairs.set(&index, pair);
        self.all_pairs_length.set(index + 1);

        self.env().emit_event(PairCreated {
            token0,
            token1,
            pair,
            handle,
            index: index + 1,
        });
        pair
    }

    /// Counts a swap. Only the registered pair of the tuple may call this.
    pub fn increase_number_of_swaps(&mut self, token_a: Address, token_b: Address) {
        let caller = self.env().caller();
        match self.pairs.get(&(token_a, token_b)) {
            Some(pair) if pair == caller => {}
            _ => self.env().revert(DexError::Forbidden),
        }
        self.total_swaps.set(self.total_swaps() + U256::one());
    }

    // ============ Admin Functions ============

    /// `None` switches the protocol fee off
    pub fn set_fee_to(&mut self, fee_to: Option<Address>) {
        self.ensure_fee_to_setter();
        self.fee_to.set(fee_to);
    }

    pub fn set_fee_to_setter(&mut self, fee_to_setter: Address) {
        self.ensure_fee_to_setter();
        self.fee_to_setter.set(fee_to_setter);
    }

    /// Stored as given; callers are trusted to keep
    /// `total_fee <= 1000` and `protocol_fee <= 10000`.
    pub fn set_main_fees(&mut self, total_fee: u32, protocol_fee: u32) {
        self.ensure_fee_to_setter();
        self.total_fee.set(total_fee);
        self.protocol_fee.set(protocol_fee);
    }

    pub fn set_operator_fee_to(&mut self, operator_fee_to: Option<Address>) {
        self.ensure_operator_fee_setter();
        self.operator_fee_to.set(operator_fee_to);
    }

    pub fn set_operator_fee_setter(&mut self, operator_fee_setter: Address) {
        self.ensure_operator_fee_setter();
        self.operator_fee_setter.set(operator_fee_setter);
    }

    /// Range is checked before the caller
    pub fn set_operator_fee_percent(&mut self, percent: u32) {
        if percent > MAX_OPERATOR_FEE_PERCENT {
            self.env().revert(DexError::WrongPercentage);
        }
        self.ensure_operator_fee_setter();
        self.operator_fee_percent.set(percent);
    }
}

impl Factory {
    fn ensure_fee_to_setter(&self) {
        if self.env().caller() != self.fee_to_setter() {
            self.env().revert(DexError::Forbidden);
        }
    }

    fn ensure_operator_fee_setter(&self) {
        if self.env().caller() != self.operator_fee_setter() {
            self.env().revert(DexError::Forbidden);
        }
    }
}
