//! DEX module containing all DEX-related contracts
//!
//! This module implements a Uniswap V2-style AMM DEX with:
//! - Pair: Individual liquidity pools for token pairs
//! - Factory: Creates pairs at deterministic handles and holds the fee settings
//! - Router: User-facing contract for swaps and liquidity management

pub mod pair;
pub mod pair_address;
pub mod factory;
pub mod router;


pub use pair::{Pair, PairFactory};
pub use factory::{Factory, FactoryInfo};
pub use router::Router;
