//! Events emitted by the DEX contracts
use odra::casper_types::U256;
use odra::prelude::*;

/// A new pair was registered by the Factory.
#[odra::event]
pub struct PairCreated {
    pub token0: Address,
    pub token1: Address,
    pub pair: Address,
    /// Content-derived handle of the pair
    pub handle: [u8; 32],
    /// 1-based position in the pair list
    pub index: u32,
}

/// Claim units were issued against new deposits.
#[odra::event]
pub struct Mint {
    pub sender: Address,
    pub amount0: U256,
    pub amount1: U256,
}

/// Claim units were redeemed for the underlying assets.
#[odra::event]
pub struct Burn {
    pub sender: Address,
    pub amount0: U256,
    pub amount1: U256,
    pub to: Address,
}

#[odra::event]
pub struct Swap {
    pub sender: Address,
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
    pub to: Address,
}

/// Reserves after any mutation.
#[odra::event]
pub struct Sync {
    pub reserve0: U256,
    pub reserve1: U256,
}

#[odra::event]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[odra::event]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
}

/// Native CSPR wrapped into WCSPR.
#[odra::event]
pub struct Deposit {
    pub owner: Address,
    pub amount: U256,
}

/// WCSPR unwrapped back to native CSPR.
#[odra::event]
pub struct Withdrawal {
    pub owner: Address,
    pub to: Address,
    pub amount: U256,
}
