//! Router contract for the DEX
//!
//! The Router is the main user-facing contract that provides:
//! - Adding/removing liquidity, with CSPR and permit variants
//! - Swapping tokens (exact input and exact output)
//! - Multi-hop swaps through multiple pairs
//! - Variants that tolerate fee-on-transfer tokens
//! - Deadline protection
//!
//! The Router holds no balances between calls. Native CSPR is wrapped into
//! WCSPR on the way in and unwrapped on the way out.
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::{PublicKey, U256, U512};
use odra::prelude::*;
use odra::ContractRef;
use crate::dex::factory::FactoryContractRef;
use crate::dex::pair::PairContractRef;
use crate::errors::DexError;
use crate::math::{u256_to_u512, u512_to_u256, AmmMath};
use crate::token;
use crate::tokens::WcsprTokenContractRef;
use crate::utils::sort_tokens;

/// Router contract for user interactions
#[odra::module(errors = DexError)]
pub struct Router {
    /// Factory contract address
    factory: Var<Address>,
    /// WCSPR (Wrapped CSPR) token address for native token swaps
    wcspr: Var<Address>,
}

#[odra::module]
impl Router {
    /// Initialize the router with factory and WCSPR addresses
    pub fn init(&mut self, factory: Address, wcspr: Address) {
        self.factory.set(factory);
        self.wcspr.set(wcspr);
    }

    pub fn factory(&self) -> Address {
        self.factory.get_or_revert_with(DexError::ZeroAddress)
    }

    pub fn wcspr(&self) -> Address {
        self.wcspr.get_or_revert_with(DexError::ZeroAddress)
    }

    // ============ Liquidity Functions ============

    /// Add liquidity to a pair, creating it if needed.
    /// Returns (amount_a, amount_b, liquidity)
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> (U256, U256, U256) {
        let result = self.add_liquidity_internal(
            token_a,
            token_b,
            amount_a_desired,
            amount_b_desired,
            amount_a_min,
            amount_b_min,
            to,
            deadline,
        );
        self.or_revert(result)
    }

    /// Add liquidity against the attached CSPR. Unused CSPR is refunded.
    /// Returns (amount_token, amount_cspr, liquidity)
    #[odra(payable)]
    pub fn add_liquidity_cspr(
        &mut self,
        token: Address,
        amount_token_desired: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
    ) -> (U256, U256, U256) {
        let result = self.add_liquidity_cspr_internal(
            token,
            amount_token_desired,
            amount_token_min,
            amount_cspr_min,
            to,
            deadline,
        );
        self.or_revert(result)
    }

    /// Remove liquidity from a pair
    /// Returns (amount_a, amount_b)
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> (U256, U256) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.remove_liquidity_internal(
                token_a,
                token_b,
                liquidity,
                amount_a_min,
                amount_b_min,
                to,
            )
        });
        self.or_revert(result)
    }

    /// Remove liquidity from a token/WCSPR pair and unwrap the CSPR side.
    /// Returns (amount_token, amount_cspr)
    pub fn remove_liquidity_cspr(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
    ) -> (U256, U256) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.remove_liquidity_cspr_internal(
                token,
                liquidity,
                amount_token_min,
                amount_cspr_min,
                to,
            )
        });
        self.or_revert(result)
    }

    /// [`Router::remove_liquidity`] with the LP allowance granted by a
    /// signed permit in the same call.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity_with_permit(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
        approve_max: bool,
        owner_key: PublicKey,
        signature: Bytes,
    ) -> (U256, U256) {
        let result = self
            .ensure_deadline(deadline)
            .and_then(|_| {
                self.permit_pair(
                    token_a,
                    token_b,
                    liquidity,
                    deadline,
                    approve_max,
                    owner_key,
                    signature,
                )
            })
            .and_then(|_| {
                self.remove_liquidity_internal(
                    token_a,
                    token_b,
                    liquidity,
                    amount_a_min,
                    amount_b_min,
                    to,
                )
            });
        self.or_revert(result)
    }

    /// [`Router::remove_liquidity_cspr`] with a signed permit.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity_cspr_with_permit(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
        approve_max: bool,
        owner_key: PublicKey,
        signature: Bytes,
    ) -> (U256, U256) {
        let wcspr = self.wcspr();
        let result = self
            .ensure_deadline(deadline)
            .and_then(|_| {
                self.permit_pair(
                    token,
                    wcspr,
                    liquidity,
                    deadline,
                    approve_max,
                    owner_key,
                    signature,
                )
            })
            .and_then(|_| {
                self.remove_liquidity_cspr_internal(
                    token,
                    liquidity,
                    amount_token_min,
                    amount_cspr_min,
                    to,
                )
            });
        self.or_revert(result)
    }

    /// Remove liquidity when either token may tax transfers. The minimums are
    /// checked against the nominal burn amounts.
    /// Returns what `to` actually received as (amount_a, amount_b)
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity_supporting_fee_on_transfer_tokens(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> (U256, U256) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.remove_liquidity_fot_internal(
                token_a,
                token_b,
                liquidity,
                amount_a_min,
                amount_b_min,
                to,
            )
        });
        self.or_revert(result)
    }

    /// Remove liquidity from a taxed-token/WCSPR pair. The minimums are
    /// checked against the nominal burn amounts.
    /// Returns the amount of `token` that reached `to`.
    pub fn remove_liquidity_cspr_supporting_fee_on_transfer_tokens(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
    ) -> U256 {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.remove_liquidity_cspr_fot_internal(
                token,
                liquidity,
                amount_token_min,
                amount_cspr_min,
                to,
            )
        });
        self.or_revert(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity_cspr_with_permit_supporting_fee_on_transfer_tokens(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
        approve_max: bool,
        owner_key: PublicKey,
        signature: Bytes,
    ) -> U256 {
        let wcspr = self.wcspr();
        let result = self
            .ensure_deadline(deadline)
            .and_then(|_| {
                self.permit_pair(
                    token,
                    wcspr,
                    liquidity,
                    deadline,
                    approve_max,
                    owner_key,
                    signature,
                )
            })
            .and_then(|_| {
                self.remove_liquidity_cspr_fot_internal(
                    token,
                    liquidity,
                    amount_token_min,
                    amount_cspr_min,
                    to,
                )
            });
        self.or_revert(result)
    }

    // ============ Swap Functions ============

    /// Swap exact input amount for output tokens
    /// path is an array of token addresses representing the swap route
    pub fn swap_exact_tokens_for_tokens(
        &mut self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            let amounts = self.amounts_out(amount_in, &path)?;
            Self::ensure_min_output(&amounts, amount_out_min)?;
            self.pull_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, to)?;
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Swap tokens for exact output amount
    pub fn swap_tokens_for_exact_tokens(
        &mut self,
        amount_out: U256,
        amount_in_max: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            let amounts = self.amounts_in(amount_out, &path)?;
            if amounts[0] > amount_in_max {
                return Err(DexError::ExcessiveInputAmount);
            }
            self.pull_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, to)?;
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Swap all attached CSPR along a path starting at WCSPR
    #[odra(payable)]
    pub fn swap_exact_cspr_for_tokens(
        &mut self,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_starts_with_wcspr(&path)?;
            let amount_in = u512_to_u256(self.env().attached_value())?;
            let amounts = self.amounts_out(amount_in, &path)?;
            Self::ensure_min_output(&amounts, amount_out_min)?;
            self.wrap_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, to)?;
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Swap tokens for an exact amount of CSPR along a path ending at WCSPR
    pub fn swap_tokens_for_exact_cspr(
        &mut self,
        amount_out: U256,
        amount_in_max: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_ends_with_wcspr(&path)?;
            let amounts = self.amounts_in(amount_out, &path)?;
            if amounts[0] > amount_in_max {
                return Err(DexError::ExcessiveInputAmount);
            }
            self.pull_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, self.env().self_address())?;
            self.unwrap_to(to, amounts[amounts.len() - 1]);
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Swap exact tokens for CSPR along a path ending at WCSPR
    pub fn swap_exact_tokens_for_cspr(
        &mut self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_ends_with_wcspr(&path)?;
            let amounts = self.amounts_out(amount_in, &path)?;
            Self::ensure_min_output(&amounts, amount_out_min)?;
            self.pull_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, self.env().self_address())?;
            self.unwrap_to(to, amounts[amounts.len() - 1]);
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Swap attached CSPR for an exact output. Unused CSPR is refunded.
    #[odra(payable)]
    pub fn swap_cspr_for_exact_tokens(
        &mut self,
        amount_out: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) -> Vec<U256> {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_starts_with_wcspr(&path)?;
            let attached = u512_to_u256(self.env().attached_value())?;
            let amounts = self.amounts_in(amount_out, &path)?;
            if amounts[0] > attached {
                return Err(DexError::ExcessiveInputAmount);
            }
            self.wrap_into_first_pair(&path, amounts[0])?;
            self.execute_swap(&amounts, &path, to)?;
            self.refund(attached - amounts[0]);
            Ok(amounts)
        });
        self.or_revert(result)
    }

    /// Exact-input swap for tokens that tax transfers. Each hop prices what
    /// the pair actually received, and the minimum is checked against what
    /// `to` actually received.
    pub fn swap_exact_tokens_for_tokens_supporting_fee_on_transfer_tokens(
        &mut self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            Self::ensure_path(&path)?;
            self.pull_into_first_pair(&path, amount_in)?;
            self.swap_measured_to(&path, to, amount_out_min)?;
            Ok(())
        });
        self.or_revert(result)
    }

    #[odra(payable)]
    pub fn swap_exact_cspr_for_tokens_supporting_fee_on_transfer_tokens(
        &mut self,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_starts_with_wcspr(&path)?;
            let amount_in = u512_to_u256(self.env().attached_value())?;
            self.wrap_into_first_pair(&path, amount_in)?;
            self.swap_measured_to(&path, to, amount_out_min)?;
            Ok(())
        });
        self.or_revert(result)
    }

    pub fn swap_exact_tokens_for_cspr_supporting_fee_on_transfer_tokens(
        &mut self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        to: Address,
        deadline: u64,
    ) {
        let result = self.ensure_deadline(deadline).and_then(|_| {
            self.ensure_path_ends_with_wcspr(&path)?;
            self.pull_into_first_pair(&path, amount_in)?;
            let amount_out = self.swap_measured_to(
                &path,
                self.env().self_address(),
                amount_out_min,
            )?;
            self.unwrap_to(to, amount_out);
            Ok(())
        });
        self.or_revert(result)
    }

    // ============ Quote Functions ============

    /// Amount of token B worth `amount_a` of token A at the given reserves
    pub fn quote(&self, amount_a: U256, reserve_a: U256, reserve_b: U256) -> U256 {
        let result = AmmMath::quote(amount_a, reserve_a, reserve_b);
        self.or_revert(result)
    }

    /// Output for an exact input at the factory's current swap fee
    pub fn get_amount_out(&self, amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
        let result =
            AmmMath::get_amount_out(amount_in, reserve_in, reserve_out, self.total_fee());
        self.or_revert(result)
    }

    /// Input required for an exact output at the factory's current swap fee
    pub fn get_amount_in(&self, amount_out: U256, reserve_in: U256, reserve_out: U256) -> U256 {
        let result =
            AmmMath::get_amount_in(amount_out, reserve_in, reserve_out, self.total_fee());
        self.or_revert(result)
    }

    pub fn get_amounts_out(&self, amount_in: U256, path: Vec<Address>) -> Vec<U256> {
        let result = self.amounts_out(amount_in, &path);
        self.or_revert(result)
    }

    pub fn get_amounts_in(&self, amount_out: U256, path: Vec<Address>) -> Vec<U256> {
        let result = self.amounts_in(amount_out, &path);
        self.or_revert(result)
    }

    /// Reserves of the `(token_a, token_b)` pair, in argument order
    pub fn get_reserves(&self, token_a: Address, token_b: Address) -> (U256, U256) {
        let result = self.reserves(token_a, token_b);
        self.or_revert(result)
    }
}

impl Router {
    // ============ Liquidity ============

    /// Pull both tokens from the caller into the pair and mint to `to`
    #[allow(clippy::too_many_arguments)]
    fn add_liquidity_internal(
        &mut self,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> Result<(U256, U256, U256), DexError> {
        self.ensure_deadline(deadline)?;
        let pair = self.get_or_create_pair(token_a, token_b);
        let (amount_a, amount_b) = self.calculate_liquidity_amounts(
            token_a,
            token_b,
            amount_a_desired,
            amount_b_desired,
            amount_a_min,
            amount_b_min,
        )?;

        // Transfer tokens to pair
        let caller = self.env().caller();
        token::safe_transfer_from(self.env(), token_a, caller, pair, amount_a)?;
        token::safe_transfer_from(self.env(), token_b, caller, pair, amount_b)?;

        // Mint LP tokens
        let liquidity = PairContractRef::new(self.env(), pair).mint(to);

        Ok((amount_a, amount_b, liquidity))
    }

    /// Token side from the caller, CSPR side wrapped from the attached value
    fn add_liquidity_cspr_internal(
        &mut self,
        token: Address,
        amount_token_desired: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
        deadline: u64,
    ) -> Result<(U256, U256, U256), DexError> {
        self.ensure_deadline(deadline)?;
        let wcspr = self.wcspr();
        let attached = u512_to_u256(self.env().attached_value())?;
        let pair = self.get_or_create_pair(token, wcspr);
        let (amount_token, amount_cspr) = self.calculate_liquidity_amounts(
            token,
            wcspr,
            amount_token_desired,
            attached,
            amount_token_min,
            amount_cspr_min,
        )?;

        // Transfer token and wrapped CSPR to pair
        let caller = self.env().caller();
        token::safe_transfer_from(self.env(), token, caller, pair, amount_token)?;
        self.wrap_to(pair, amount_cspr)?;

        // Mint LP tokens, then return what was not needed
        let liquidity = PairContractRef::new(self.env(), pair).mint(to);
        self.refund(attached - amount_cspr);

        Ok((amount_token, amount_cspr, liquidity))
    }

    /// Burn and check the nominal amounts against the minimums
    fn remove_liquidity_internal(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
    ) -> Result<(U256, U256), DexError> {
        let (amount_a, amount_b) = self.burn_liquidity(token_a, token_b, liquidity, to)?;
        Self::ensure_min_amounts(amount_a, amount_b, amount_a_min, amount_b_min)?;
        Ok((amount_a, amount_b))
    }

    /// Burn to the router, then forward the token and unwrap the WCSPR
    fn remove_liquidity_cspr_internal(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
    ) -> Result<(U256, U256), DexError> {
        let wcspr = self.wcspr();
        let (amount_token, amount_cspr) = self.remove_liquidity_internal(
            token,
            wcspr,
            liquidity,
            amount_token_min,
            amount_cspr_min,
            self.env().self_address(),
        )?;
        token::safe_transfer(self.env(), token, to, amount_token)?;
        self.unwrap_to(to, amount_cspr);
        Ok((amount_token, amount_cspr))
    }

    /// Burns straight to `to`. The minimums bound the nominal burn amounts,
    /// the return value is what `to` actually received.
    fn remove_liquidity_fot_internal(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
    ) -> Result<(U256, U256), DexError> {
        let before_a = token::balance_of(self.env(), token_a, to);
        let before_b = token::balance_of(self.env(), token_b, to);
        self.remove_liquidity_internal(
            token_a,
            token_b,
            liquidity,
            amount_a_min,
            amount_b_min,
            to,
        )?;

        let received_a = token::received_since(self.env(), token_a, to, before_a)?;
        let received_b = token::received_since(self.env(), token_b, to, before_b)?;
        Ok((received_a, received_b))
    }

    /// Burns to the router, checking the minimums against the nominal
    /// amounts, then forwards whatever of `token` the router really holds.
    fn remove_liquidity_cspr_fot_internal(
        &mut self,
        token: Address,
        liquidity: U256,
        amount_token_min: U256,
        amount_cspr_min: U256,
        to: Address,
    ) -> Result<U256, DexError> {
        let wcspr = self.wcspr();
        let self_address = self.env().self_address();
        let before = token::balance_of(self.env(), token, self_address);
        let (_, amount_cspr) = self.remove_liquidity_internal(
            token,
            wcspr,
            liquidity,
            amount_token_min,
            amount_cspr_min,
            self_address,
        )?;

        // Forward the measured holding, not the nominal amount
        let held = token::received_since(self.env(), token, self_address, before)?;
        let received = token::transfer_measured(self.env(), token, to, held)?;
        self.unwrap_to(to, amount_cspr);
        Ok(received)
    }

    /// Moves the caller's LP tokens into the pair and burns them for `to`.
    /// Returns the nominal amounts in `(token_a, token_b)` order.
    fn burn_liquidity(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        to: Address,
    ) -> Result<(U256, U256), DexError> {
        let pair = self.pair_for(token_a, token_b)?;
        // Transfer LP tokens to pair
        let mut pair_ref = PairContractRef::new(self.env(), pair);
        if !pair_ref.transfer_from(self.env().caller(), pair, liquidity) {
            return Err(DexError::TransferFailed);
        }
        let (amount0, amount1) = pair_ref.burn(to);

        let (token0, _) = sort_tokens(token_a, token_b);
        if token_a == token0 {
            Ok((amount0, amount1))
        } else {
            Ok((amount1, amount0))
        }
    }

    /// Grants the router an LP allowance from the caller's signed permit.
    #[allow(clippy::too_many_arguments)]
    fn permit_pair(
        &mut self,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        deadline: u64,
        approve_max: bool,
        owner_key: PublicKey,
        signature: Bytes,
    ) -> Result<(), DexError> {
        if Address::from(owner_key.to_account_hash()) != self.env().caller() {
            return Err(DexError::InvalidSignature);
        }
        let pair = self.pair_for(token_a, token_b)?;
        let value = if approve_max { U256::MAX } else { liquidity };
        PairContractRef::new(self.env(), pair).permit(
            owner_key,
            self.env().self_address(),
            value,
            deadline,
            signature,
        );
        Ok(())
    }

    /// Optimal deposit for the current reserves
    fn calculate_liquidity_amounts(
        &self,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
    ) -> Result<(U256, U256), DexError> {
        let (reserve_a, reserve_b) = self.reserves(token_a, token_b)?;
        if reserve_a.is_zero() && reserve_b.is_zero() {
            // First liquidity provision - use desired amounts
            return Ok((amount_a_desired, amount_b_desired));
        }

        let amount_b_optimal = AmmMath::quote(amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= amount_b_desired {
            if amount_b_optimal < amount_b_min {
                return Err(DexError::InsufficientBAmount);
            }
            return Ok((amount_a_desired, amount_b_optimal));
        }

        let amount_a_optimal = AmmMath::quote(amount_b_desired, reserve_b, reserve_a)?;
        if amount_a_optimal > amount_a_desired || amount_a_optimal < amount_a_min {
            return Err(DexError::InsufficientAAmount);
        }
        Ok((amount_a_optimal, amount_b_desired))
    }

    // ============ Swaps ============

    /// Executes a multi-hop swap whose amounts were computed up front.
    /// Each pair sends its output straight into the next pair.
    fn execute_swap(
        &self,
        amounts: &[U256],
        path: &[Address],
        to: Address,
    ) -> Result<(), DexError> {
        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let (amount0_out, amount1_out) = Self::outputs(input, output, amounts[i + 1]);
            let recipient = self.hop_recipient(path, i, to)?;

            let pair = self.pair_for(input, output)?;
            PairContractRef::new(self.env(), pair).swap(amount0_out, amount1_out, recipient);
        }
        Ok(())
    }

    /// Multi-hop swap that prices every hop from the input the pair
    /// actually received. Returns what `to` received of the last token.
    fn swap_measured_to(
        &self,
        path: &[Address],
        to: Address,
        amount_out_min: U256,
    ) -> Result<U256, DexError> {
        let last = path[path.len() - 1];
        let before = token::balance_of(self.env(), last, to);
        let total_fee = self.total_fee();

        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let pair = self.pair_for(input, output)?;
            let (reserve_input, reserve_output) = self.reserves(input, output)?;
            // The pair's gain over its reserve is the input that really arrived
            let amount_input = token::received_since(self.env(), input, pair, reserve_input)?;
            let amount_output =
                AmmMath::get_amount_out(amount_input, reserve_input, reserve_output, total_fee)?;

            let (amount0_out, amount1_out) = Self::outputs(input, output, amount_output);
            let recipient = self.hop_recipient(path, i, to)?;
            PairContractRef::new(self.env(), pair).swap(amount0_out, amount1_out, recipient);
        }

        let received = token::received_since(self.env(), last, to, before)?;
        if received < amount_out_min {
            return Err(DexError::InsufficientOutputAmount);
        }
        Ok(received)
    }

    /// `(amount0_out, amount1_out)` for a hop from `input` to `output`
    fn outputs(input: Address, output: Address, amount_out: U256) -> (U256, U256) {
        let (token0, _) = sort_tokens(input, output);
        if input == token0 {
            (U256::zero(), amount_out)
        } else {
            (amount_out, U256::zero())
        }
    }

    /// The next pair for intermediate hops, `to` for the last one
    fn hop_recipient(&self, path: &[Address], hop: usize, to: Address) -> Result<Address, DexError> {
        if hop < path.len() - 2 {
            self.pair_for(path[hop + 1], path[hop + 2])
        } else {
            Ok(to)
        }
    }

    /// Transfer the caller's input tokens to the first pair
    fn pull_into_first_pair(&self, path: &[Address], amount: U256) -> Result<(), DexError> {
        let pair = self.pair_for(path[0], path[1])?;
        token::safe_transfer_from(self.env(), path[0], self.env().caller(), pair, amount)
    }

    /// Wrap attached CSPR straight into the first pair
    fn wrap_into_first_pair(&self, path: &[Address], amount: U256) -> Result<(), DexError> {
        let pair = self.pair_for(path[0], path[1])?;
        self.wrap_to(pair, amount)
    }

    /// Chain `get_amount_out` along the path
    fn amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>, DexError> {
        Self::ensure_path(path)?;
        let total_fee = self.total_fee();
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);

        for i in 0..path.len() - 1 {
            let (reserve_in, reserve_out) = self.reserves(path[i], path[i + 1])?;
            let amount_out = AmmMath::get_amount_out(amounts[i], reserve_in, reserve_out, total_fee)?;
            amounts.push(amount_out);
        }
        Ok(amounts)
    }

    /// Chain `get_amount_in` backwards along the path
    fn amounts_in(&self, amount_out: U256, path: &[Address]) -> Result<Vec<U256>, DexError> {
        Self::ensure_path(path)?;
        let total_fee = self.total_fee();
        let mut amounts = vec![U256::zero(); path.len()];
        amounts[path.len() - 1] = amount_out;

        for i in (0..path.len() - 1).rev() {
            let (reserve_in, reserve_out) = self.reserves(path[i], path[i + 1])?;
            amounts[i] = AmmMath::get_amount_in(amounts[i + 1], reserve_in, reserve_out, total_fee)?;
        }
        Ok(amounts)
    }

    // ============ CSPR ============

    /// Wraps `amount` of the router's CSPR and sends the WCSPR to `to`.
    fn wrap_to(&self, to: Address, amount: U256) -> Result<(), DexError> {
        let mut wcspr = WcsprTokenContractRef::new(self.env(), self.wcspr());
        wcspr.with_tokens(u256_to_u512(amount)).deposit();
        if !wcspr.transfer(to, amount) {
            return Err(DexError::TransferFailed);
        }
        Ok(())
    }

    /// Unwraps `amount` of the router's WCSPR and sends the CSPR to `to`.
    fn unwrap_to(&self, to: Address, amount: U256) {
        WcsprTokenContractRef::new(self.env(), self.wcspr()).withdraw_to(to, amount);
    }

    /// Returns unused attached CSPR to the caller
    fn refund(&self, amount: U256) {
        if !amount.is_zero() {
            let amount: U512 = u256_to_u512(amount);
            self.env().transfer_tokens(&self.env().caller(), &amount);
        }
    }

    // ============ Lookups and Checks ============

    /// Get factory contract reference
    fn factory_ref(&self) -> FactoryContractRef {
        FactoryContractRef::new(self.env(), self.factory())
    }

    /// Current swap fee from the factory
    fn total_fee(&self) -> u32 {
        self.factory_ref().total_fee()
    }

    /// Registered pair of the tuple
    fn pair_for(&self, token_a: Address, token_b: Address) -> Result<Address, DexError> {
        self.factory_ref()
            .get_pair(token_a, token_b)
            .ok_or(DexError::PairDoesNotExist)
    }

    /// Get the pair, creating it through the factory if missing
    fn get_or_create_pair(&mut self, token_a: Address, token_b: Address) -> Address {
        let mut factory = self.factory_ref();
        match factory.get_pair(token_a, token_b) {
            Some(pair) => pair,
            None => factory.create_pair(token_a, token_b),
        }
    }

    /// Reserves in `(token_a, token_b)` order
    fn reserves(&self, token_a: Address, token_b: Address) -> Result<(U256, U256), DexError> {
        let pair = self.pair_for(token_a, token_b)?;
        let (reserve0, reserve1, _) = PairContractRef::new(self.env(), pair).get_reserves();
        let (token0, _) = sort_tokens(token_a, token_b);
        if token_a == token0 {
            Ok((reserve0, reserve1))
        } else {
            Ok((reserve1, reserve0))
        }
    }

    /// Fails with `Expired` once the block time passed `deadline`
    fn ensure_deadline(&self, deadline: u64) -> Result<(), DexError> {
        if self.env().get_block_time() > deadline {
            return Err(DexError::Expired);
        }
        Ok(())
    }

    /// A path needs at least two tokens
    fn ensure_path(path: &[Address]) -> Result<(), DexError> {
        if path.len() < 2 {
            return Err(DexError::InvalidPath);
        }
        Ok(())
    }

    fn ensure_path_starts_with_wcspr(&self, path: &[Address]) -> Result<(), DexError> {
        Self::ensure_path(path)?;
        if path[0] != self.wcspr() {
            return Err(DexError::InvalidPath);
        }
        Ok(())
    }

    fn ensure_path_ends_with_wcspr(&self, path: &[Address]) -> Result<(), DexError> {
        Self::ensure_path(path)?;
        if path[path.len() - 1] != self.wcspr() {
            return Err(DexError::InvalidPath);
        }
        Ok(())
    }

    /// Check the final amount of a precomputed route
    fn ensure_min_output(amounts: &[U256], amount_out_min: U256) -> Result<(), DexError> {
        if amounts[amounts.len() - 1] < amount_out_min {
            return Err(DexError::InsufficientOutputAmount);
        }
        Ok(())
    }

    /// Check both sides of a removal
    fn ensure_min_amounts(
        amount_a: U256,
        amount_b: U256,
        amount_a_min: U256,
        amount_b_min: U256,
    ) -> Result<(), DexError> {
        if amount_a < amount_a_min {
            return Err(DexError::InsufficientAAmount);
        }
        if amount_b < amount_b_min {
            return Err(DexError::InsufficientBAmount);
        }
        Ok(())
    }

    /// Revert with the error of a failed internal step
    fn or_revert<T>(&self, result: Result<T, DexError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => self.env().revert(err),
        }
    }
}
