//! Liquidity Pair contract for the DEX
//!
//! Each Pair holds reserves of two tokens and allows:
//! - Adding liquidity (minting LP tokens)
//! - Removing liquidity (burning LP tokens)
//! - Swapping tokens under the fee-adjusted constant-product invariant
//!
//! Deposits are never passed in as arguments: `mint` and `swap` compare the
//! pair's live token balances against the last synced reserves, so whatever
//! actually arrived is what counts.
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::{PublicKey, U256};
use odra::prelude::*;
use odra::ContractRef;
use crate::dex::factory::FactoryContractRef;
use crate::errors::DexError;
use crate::events::{Approval, Burn, Mint, Swap, Sync, Transfer};
use crate::math::{max_reserve, AmmMath, SafeMath, FEE_DENOMINATOR, MINIMUM_LIQUIDITY};
use crate::token::{self, LpToken};
use crate::utils::{sort_tokens, zero_address};

/// Liquidity Pair contract
#[odra::module(
    factory = on,
    events = [Mint, Burn, Swap, Sync, Transfer, Approval],
    errors = DexError
)]
pub struct Pair {
    /// LP token for this pair
    lp_token: SubModule<LpToken>,
    /// Address of token0
    token0: Var<Address>,
    /// Address of token1
    token1: Var<Address>,
    /// Reserve of token0
    reserve0: Var<U256>,
    /// Reserve of token1
    reserve1: Var<U256>,
    /// Block timestamp of last update
    block_timestamp_last: Var<u64>,
    /// Cumulative price of token0 in token1 (UQ112.112 x milliseconds)
    price0_cumulative_last: Var<U256>,
    /// Cumulative price of token1 in token0 (UQ112.112 x milliseconds)
    price1_cumulative_last: Var<U256>,
    /// reserve0 * reserve1 right after the last liquidity event
    k_last: Var<U256>,
    /// Factory address
    factory: Var<Address>,
    /// Reentrancy lock
    locked: Var<bool>,
}

#[odra::module(factory = on)]
impl Pair {
    /// Initialize the pair with two token addresses
    pub fn init(&mut self, token0: Address, token1: Address, factory: Address) {
        let (t0, t1) = sort_tokens(token0, token1);
        self.token0.set(t0);
        self.token1.set(t1);
        self.factory.set(factory);
        self.reserve0.set(U256::zero());
        self.reserve1.set(U256::zero());
        self.locked.set(false);

        self.lp_token
            .init(String::from("DEX LP Token"), String::from("DEX-LP"));
    }

    // ============ View Functions ============

    pub fn token0(&self) -> Address {
        self.token0.get_or_revert_with(DexError::PairDoesNotExist)
    }

    pub fn token1(&self) -> Address {
        self.token1.get_or_revert_with(DexError::PairDoesNotExist)
    }

    pub fn factory(&self) -> Address {
        self.factory.get_or_revert_with(DexError::PairDoesNotExist)
    }

    /// `(reserve0, reserve1, block_timestamp_last)`
    pub fn get_reserves(&self) -> (U256, U256, u64) {
        (
            self.reserve0.get_or_default(),
            self.reserve1.get_or_default(),
            self.block_timestamp_last.get_or_default(),
        )
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.price0_cumulative_last.get_or_default()
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.price1_cumulative_last.get_or_default()
    }

    pub fn k_last(&self) -> U256 {
        self.k_last.get_or_default()
    }

    // ============ LP Token ============

    pub fn name(&self) -> String {
        self.lp_token.name()
    }

    pub fn symbol(&self) -> String {
        self.lp_token.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.lp_token.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.lp_token.total_supply()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.lp_token.balance_of(owner)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.lp_token.allowance(owner, spender)
    }

    pub fn nonces(&self, owner: Address) -> u64 {
        self.lp_token.nonces(owner)
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        self.lp_token.transfer(to, amount)
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.lp_token.approve(spender, amount)
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        self.lp_token.transfer_from(from, to, amount)
    }

    pub fn permit(
        &mut self,
        owner_key: PublicKey,
        spender: Address,
        value: U256,
        deadline: u64,
        signature: Bytes,
    ) {
        self.lp_token
            .permit(owner_key, spender, value, deadline, signature);
    }

    // ============ Liquidity and Swaps ============

    /// Mints LP tokens for whatever was deposited since the last sync.
    /// Returns the amount of LP tokens minted.
    pub fn mint(&mut self, to: Address) -> U256 {
        self.lock();
        let result = self.mint_internal(to);
        let liquidity = self.or_revert(result);
        self.unlock();
        liquidity
    }

    /// Burns the LP tokens held by the pair itself and sends both assets to
    /// `to`. Returns `(amount0, amount1)`.
    pub fn burn(&mut self, to: Address) -> (U256, U256) {
        self.lock();
        let result = self.burn_internal(to);
        let amounts = self.or_revert(result);
        self.unlock();
        amounts
    }

    /// Sends the requested outputs to `to`, then checks that the input which
    /// arrived beforehand keeps the fee-adjusted invariant.
    pub fn swap(&mut self, amount0_out: U256, amount1_out: U256, to: Address) {
        self.lock();
        let result = self.swap_internal(amount0_out, amount1_out, to);
        self.or_revert(result);
        self.unlock();
    }

    /// Sends balances above the reserves to `to`
    pub fn skim(&mut self, to: Address) {
        self.lock();
        let result = self.skim_internal(to);
        self.or_revert(result);
        self.unlock();
    }

    /// Forces reserves to match balances
    pub fn sync(&mut self) {
        self.lock();
        let (reserve0, reserve1, _) = self.get_reserves();
        let balance0 = self.token_balance(self.token0());
        let balance1 = self.token_balance(self.token1());
        let result = self.update(balance0, balance1, reserve0, reserve1);
        self.or_revert(result);
        self.unlock();
    }
}

impl Pair {
    fn mint_internal(&mut self, to: Address) -> Result<U256, DexError> {
        let (reserve0, reserve1, _) = self.get_reserves();
        let balance0 = self.token_balance(self.token0());
        let balance1 = self.token_balance(self.token1());
        let amount0 = SafeMath::sub(balance0, reserve0)?;
        let amount1 = SafeMath::sub(balance1, reserve1)?;

        let fee_on = self.mint_protocol_fee(reserve0, reserve1)?;
        let total_supply = self.total_supply();
        let liquidity = AmmMath::calculate_liquidity(
            amount0,
            amount1,
            reserve0,
            reserve1,
            total_supply,
        )?;
        if total_supply.is_zero() {
            // Permanently lock MINIMUM_LIQUIDITY tokens
            self.lp_token
                .mint(zero_address(), U256::from(MINIMUM_LIQUIDITY));
        }
        if liquidity.is_zero() {
            return Err(DexError::InsufficientLiquidityMinted);
        }
        self.lp_token.mint(to, liquidity);

        self.update(balance0, balance1, reserve0, reserve1)?;
        if fee_on {
            self.k_last.set(SafeMath::mul(balance0, balance1)?);
        }

        self.env().emit_event(Mint {
            sender: self.env().caller(),
            amount0,
            amount1,
        });
        Ok(liquidity)
    }

    fn burn_internal(&mut self, to: Address) -> Result<(U256, U256), DexError> {
        let (reserve0, reserve1, _) = self.get_reserves();
        let token0 = self.token0();
        let token1 = self.token1();
        let self_address = self.env().self_address();
        let balance0 = self.token_balance(token0);
        let balance1 = self.token_balance(token1);
        let liquidity = self.lp_token.balance_of(self_address);

        let fee_on = self.mint_protocol_fee(reserve0, reserve1)?;
        let total_supply = self.total_supply();
        let (amount0, amount1) =
            AmmMath::calculate_burn_amounts(liquidity, balance0, balance1, total_supply)?;

        self.lp_token.burn(self_address, liquidity);
        token::safe_transfer(self.env(), token0, to, amount0)?;
        token::safe_transfer(self.env(), token1, to, amount1)?;

        let balance0 = self.token_balance(token0);
        let balance1 = self.token_balance(token1);
        self.update(balance0, balance1, reserve0, reserve1)?;
        if fee_on {
            self.k_last.set(SafeMath::mul(balance0, balance1)?);
        }

        self.env().emit_event(Burn {
            sender: self.env().caller(),
            amount0,
            amount1,
            to,
        });
        Ok((amount0, amount1))
    }

    fn swap_internal(
        &mut self,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    ) -> Result<(), DexError> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount);
        }
        let (reserve0, reserve1, _) = self.get_reserves();
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(DexError::InsufficientLiquidity);
        }
        let token0 = self.token0();
        let token1 = self.token1();
        if to == token0 || to == token1 {
            return Err(DexError::InvalidTo);
        }

        // Phase 1: optimistic transfers out
        if !amount0_out.is_zero() {
            token::safe_transfer(self.env(), token0, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            token::safe_transfer(self.env(), token1, to, amount1_out)?;
        }

        // Phase 2: the invariant is checked against freshly read balances only
        let balance0 = self.token_balance(token0);
        let balance1 = self.token_balance(token1);
        let amount0_in = Self::amount_in(balance0, reserve0, amount0_out)?;
        let amount1_in = Self::amount_in(balance1, reserve1, amount1_out)?;
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }

        let total_fee = U256::from(self.factory_ref().total_fee());
        let denominator = U256::from(FEE_DENOMINATOR);
        let balance0_adjusted = SafeMath::sub(
            SafeMath::mul(balance0, denominator)?,
            SafeMath::mul(amount0_in, total_fee)?,
        )?;
        let balance1_adjusted = SafeMath::sub(
            SafeMath::mul(balance1, denominator)?,
            SafeMath::mul(amount1_in, total_fee)?,
        )?;
        let k_new = SafeMath::mul(balance0_adjusted, balance1_adjusted)?;
        let k_old = SafeMath::mul(
            SafeMath::mul(reserve0, reserve1)?,
            SafeMath::mul(denominator, denominator)?,
        )?;
        if k_new < k_old {
            return Err(DexError::KInvariantViolated);
        }

        self.update(balance0, balance1, reserve0, reserve1)?;

        self.env().emit_event(Swap {
            sender: self.env().caller(),
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            to,
        });

        self.factory_ref().increase_number_of_swaps(token0, token1);
        Ok(())
    }

    fn skim_internal(&mut self, to: Address) -> Result<(), DexError> {
        let token0 = self.token0();
        let token1 = self.token1();
        let (reserve0, reserve1, _) = self.get_reserves();
        let balance0 = self.token_balance(token0);
        let balance1 = self.token_balance(token1);

        if balance0 > reserve0 {
            token::safe_transfer(self.env(), token0, to, balance0 - reserve0)?;
        }
        if balance1 > reserve1 {
            token::safe_transfer(self.env(), token1, to, balance1 - reserve1)?;
        }
        Ok(())
    }

    /// Input that arrived on one side: `balance - (reserve - amount_out)`, or
    /// zero when nothing came in.
    fn amount_in(balance: U256, reserve: U256, amount_out: U256) -> Result<U256, DexError> {
        let untouched = SafeMath::sub(reserve, amount_out)?;
        Ok(balance.saturating_sub(untouched))
    }

    /// Writes new reserves, first accumulating prices over the time the old
    /// reserves were in force.
    fn update(
        &mut self,
        balance0: U256,
        balance1: U256,
        reserve0: U256,
        reserve1: U256,
    ) -> Result<(), DexError> {
        if balance0 > max_reserve() || balance1 > max_reserve() {
            return Err(DexError::Overflow);
        }
        let now = self.env().get_block_time();
        let elapsed = now.saturating_sub(self.block_timestamp_last.get_or_default());
        if elapsed > 0 && !reserve0.is_zero() && !reserve1.is_zero() {
            // Accumulators are meant to wrap; only differences are meaningful.
            let elapsed = U256::from(elapsed);
            let price0 = AmmMath::encode_price(reserve1, reserve0)?
                .overflowing_mul(elapsed)
                .0;
            let price1 = AmmMath::encode_price(reserve0, reserve1)?
                .overflowing_mul(elapsed)
                .0;
            self.price0_cumulative_last
                .set(self.price0_cumulative_last().overflowing_add(price0).0);
            self.price1_cumulative_last
                .set(self.price1_cumulative_last().overflowing_add(price1).0);
        }
        self.reserve0.set(balance0);
        self.reserve1.set(balance1);
        self.block_timestamp_last.set(now);

        self.env().emit_event(Sync {
            reserve0: balance0,
            reserve1: balance1,
        });
        Ok(())
    }

    /// Mints the protocol (and operator) share of fee growth since the last
    /// liquidity event. Returns whether the protocol fee is switched on.
    fn mint_protocol_fee(&mut self, reserve0: U256, reserve1: U256) -> Result<bool, DexError> {
        let info = self.factory_ref().all_info();
        let k_last = self.k_last();
        let fee_to = match info.fee_to {
            Some(fee_to) => fee_to,
            None => {
                if !k_last.is_zero() {
                    self.k_last.set(U256::zero());
                }
                return Ok(false);
            }
        };
        if k_last.is_zero() {
            return Ok(true);
        }

        let root_k = AmmMath::sqrt(SafeMath::mul(reserve0, reserve1)?);
        let root_k_last = AmmMath::sqrt(k_last);
        let liquidity = AmmMath::protocol_fee_liquidity(
            self.total_supply(),
            root_k,
            root_k_last,
            info.protocol_fee,
        )?;
        if liquidity.is_zero() {
            return Ok(true);
        }

        let (protocol_share, operator_share) = match info.operator_fee_to {
            Some(_) => AmmMath::split_operator_fee(liquidity, info.operator_fee_percent)?,
            None => (liquidity, U256::zero()),
        };
        if !protocol_share.is_zero() {
            self.lp_token.mint(fee_to, protocol_share);
        }
        if let Some(operator_fee_to) = info.operator_fee_to {
            if !operator_share.is_zero() {
                self.lp_token.mint(operator_fee_to, operator_share);
            }
        }
        Ok(true)
    }

    fn factory_ref(&self) -> FactoryContractRef {
        FactoryContractRef::new(self.env(), self.factory())
    }

    /// Get token balance of this contract
    fn token_balance(&self, token: Address) -> U256 {
        token::balance_of(self.env(), token, self.env().self_address())
    }

    fn or_revert<T>(&self, result: Result<T, DexError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => self.env().revert(err),
        }
    }

    /// Reentrancy lock
    fn lock(&mut self) {
        if self.locked.get_or_default() {
            self.env().revert(DexError::Locked);
        }
        self.locked.set(true);
    }

    /// Reentrancy unlock
    fn unlock(&mut self) {
        self.locked.set(false);
    }
}
