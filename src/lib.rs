#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]
//! Constant-product AMM exchange contracts for Casper.
//!
//! - [`dex::Factory`]: pair registry and fee governance
//! - [`dex::Pair`]: per-pair reserves, claim token and swap invariant
//! - [`dex::Router`]: liquidity and multi-hop swap orchestration
extern crate alloc;

pub mod dex;
pub mod errors;
pub mod events;
pub mod math;
pub mod token;
pub mod tokens;
pub mod utils;
