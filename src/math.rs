//! Fixed-point and constant-product arithmetic shared by the Pair and Router
use crate::errors::DexError;
use odra::casper_types::{U256, U512};

/// Claim units locked forever by the first deposit into a pair
pub const MINIMUM_LIQUIDITY: u64 = 1_000;
/// Denominator of the swap fee (`total_fee / FEE_DENOMINATOR`)
pub const FEE_DENOMINATOR: u64 = 1_000;
/// 0.3 %
pub const DEFAULT_TOTAL_FEE: u32 = 3;
/// Denominator of the protocol share of fee growth
pub const PROTOCOL_FEE_DENOMINATOR: u64 = 10_000;
/// One sixth of the fee growth goes to the protocol when it is switched on
pub const DEFAULT_PROTOCOL_FEE: u32 = 1_667;
/// Ceiling of the operator fee percentage
pub const MAX_OPERATOR_FEE_PERCENT: u32 = 100;
/// Bits of fractional precision in encoded prices
pub const PRICE_RESOLUTION_BITS: usize = 112;

/// Largest reserve a pair may hold (2^112 - 1)
pub fn max_reserve() -> U256 {
    (U256::one() << PRICE_RESOLUTION_BITS) - U256::one()
}

/// Checked arithmetic on `U256`
pub struct SafeMath;

impl SafeMath {
    pub fn add(a: U256, b: U256) -> Result<U256, DexError> {
        a.checked_add(b).ok_or(DexError::Overflow)
    }

    pub fn sub(a: U256, b: U256) -> Result<U256, DexError> {
        a.checked_sub(b).ok_or(DexError::Underflow)
    }

    pub fn mul(a: U256, b: U256) -> Result<U256, DexError> {
        a.checked_mul(b).ok_or(DexError::Overflow)
    }

    pub fn div(a: U256, b: U256) -> Result<U256, DexError> {
        a.checked_div(b).ok_or(DexError::DivisionByZero)
    }
}

/// Constant-product formulas
pub struct AmmMath;

impl AmmMath {
    /// Integer square root, rounded down (Babylonian method).
    pub fn sqrt(y: U256) -> U256 {
        if y > U256::from(3) {
            let mut z = y;
            let mut x = y / 2 + 1;
            while x < z {
                z = x;
                x = (y / x + x) / 2;
            }
            z
        } else if !y.is_zero() {
            U256::one()
        } else {
            U256::zero()
        }
    }

    /// Amount of B worth `amount_a` of A at the current reserve ratio.
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256, DexError> {
        if amount_a.is_zero() {
            return Err(DexError::InsufficientAmount);
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        SafeMath::div(SafeMath::mul(amount_a, reserve_b)?, reserve_a)
    }

    /// Maximum output for an exact input after the swap fee.
    ///
    /// `out = in * (D - fee) * r_out / (r_in * D + in * (D - fee))`
    pub fn get_amount_out(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        total_fee: u32,
    ) -> Result<U256, DexError> {
        if amount_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        let fee_numerator = Self::fee_numerator(total_fee)?;
        let amount_in_with_fee = SafeMath::mul(amount_in, fee_numerator)?;
        let numerator = SafeMath::mul(amount_in_with_fee, reserve_out)?;
        let denominator = SafeMath::add(
            SafeMath::mul(reserve_in, U256::from(FEE_DENOMINATOR))?,
            amount_in_with_fee,
        )?;
        SafeMath::div(numerator, denominator)
    }

    /// Minimum input for an exact output, rounded up by one unit.
    pub fn get_amount_in(
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
        total_fee: u32,
    ) -> Result<U256, DexError> {
        if amount_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
            return Err(DexError::InsufficientLiquidity);
        }
        let numerator = SafeMath::mul(
            SafeMath::mul(reserve_in, amount_out)?,
            U256::from(FEE_DENOMINATOR),
        )?;
        let denominator = SafeMath::mul(
            SafeMath::sub(reserve_out, amount_out)?,
            Self::fee_numerator(total_fee)?,
        )?;
        SafeMath::add(SafeMath::div(numerator, denominator)?, U256::one())
    }

    /// Claim units issued for a deposit of `(amount0, amount1)`.
    ///
    /// The first deposit gets `sqrt(amount0 * amount1) - MINIMUM_LIQUIDITY`;
    /// later ones get the smaller of the two proportional shares.
    pub fn calculate_liquidity(
        amount0: U256,
        amount1: U256,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> Result<U256, DexError> {
        if total_supply.is_zero() {
            let root = Self::sqrt(SafeMath::mul(amount0, amount1)?);
            return root
                .checked_sub(U256::from(MINIMUM_LIQUIDITY))
                .ok_or(DexError::InsufficientLiquidityMinted);
        }
        let share0 = SafeMath::div(SafeMath::mul(amount0, total_supply)?, reserve0)?;
        let share1 = SafeMath::div(SafeMath::mul(amount1, total_supply)?, reserve1)?;
        Ok(share0.min(share1))
    }

    /// Assets returned for redeeming `liquidity` claim units.
    pub fn calculate_burn_amounts(
        liquidity: U256,
        balance0: U256,
        balance1: U256,
        total_supply: U256,
    ) -> Result<(U256, U256), DexError> {
        let amount0 = SafeMath::div(SafeMath::mul(liquidity, balance0)?, total_supply)?;
        let amount1 = SafeMath::div(SafeMath::mul(liquidity, balance1)?, total_supply)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }
        Ok((amount0, amount1))
    }

    /// Claim units that hand `protocol_fee / PROTOCOL_FEE_DENOMINATOR` of the
    /// growth of `sqrt(k)` since the last liquidity event to the protocol.
    ///
    /// `L = S * (√k - √k_last) * p / (√k * (D - p) + √k_last * p)`
    pub fn protocol_fee_liquidity(
        total_supply: U256,
        root_k: U256,
        root_k_last: U256,
        protocol_fee: u32,
    ) -> Result<U256, DexError> {
        let share = U256::from(protocol_fee).min(U256::from(PROTOCOL_FEE_DENOMINATOR));
        if root_k <= root_k_last || share.is_zero() {
            return Ok(U256::zero());
        }
        let growth = SafeMath::sub(root_k, root_k_last)?;
        let numerator = SafeMath::mul(SafeMath::mul(total_supply, growth)?, share)?;
        let denominator = SafeMath::add(
            SafeMath::mul(
                root_k,
                SafeMath::sub(U256::from(PROTOCOL_FEE_DENOMINATOR), share)?,
            )?,
            SafeMath::mul(root_k_last, share)?,
        )?;
        SafeMath::div(numerator, denominator)
    }

    /// Splits protocol fee units into `(protocol, operator)` parts.
    pub fn split_operator_fee(liquidity: U256, operator_percent: u32) -> Result<(U256, U256), DexError> {
        let percent = operator_percent.min(MAX_OPERATOR_FEE_PERCENT);
        let operator = SafeMath::div(
            SafeMath::mul(liquidity, U256::from(percent))?,
            U256::from(MAX_OPERATOR_FEE_PERCENT),
        )?;
        Ok((SafeMath::sub(liquidity, operator)?, operator))
    }

    /// `numerator / denominator` as a UQ112.112 fixed-point number.
    pub fn encode_price(numerator: U256, denominator: U256) -> Result<U256, DexError> {
        SafeMath::div(numerator << PRICE_RESOLUTION_BITS, denominator)
    }

    fn fee_numerator(total_fee: u32) -> Result<U256, DexError> {
        SafeMath::sub(U256::from(FEE_DENOMINATOR), U256::from(total_fee))
    }
}

pub fn u256_to_u512(value: U256) -> U512 {
    let mut bytes = [0u8; 32];
    value.to_little_endian(&mut bytes);
    U512::from_little_endian(&bytes)
}

pub fn u512_to_u256(value: U512) -> Result<U256, DexError> {
    let mut bytes = [0u8; 64];
    value.to_little_endian(&mut bytes);
    if bytes[32..].iter().any(|b| *b != 0) {
        return Err(DexError::Overflow);
    }
    Ok(U256::from_little_endian(&bytes[..32]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(AmmMath::sqrt(u(0)), u(0));
        assert_eq!(AmmMath::sqrt(u(1)), u(1));
        assert_eq!(AmmMath::sqrt(u(3)), u(1));
        assert_eq!(AmmMath::sqrt(u(4)), u(2));
        assert_eq!(AmmMath::sqrt(u(99)), u(9));
        assert_eq!(AmmMath::sqrt(u(1_000_000)), u(1_000));
        assert_eq!(AmmMath::sqrt(U256::MAX), (U256::one() << 128) - 1);
    }

    #[test]
    fn test_quote() {
        assert_eq!(AmmMath::quote(u(1), u(100), u(200)), Ok(u(2)));
        assert_eq!(AmmMath::quote(u(2), u(200), u(100)), Ok(u(1)));
        assert_eq!(
            AmmMath::quote(u(0), u(100), u(200)),
            Err(DexError::InsufficientAmount)
        );
        assert_eq!(
            AmmMath::quote(u(1), u(0), u(200)),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            AmmMath::quote(u(1), u(100), u(0)),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_quote_is_linear() {
        let base = AmmMath::quote(u(7), u(1_000), u(3_000)).unwrap();
        for k in 1..5u64 {
            assert_eq!(AmmMath::quote(u(7 * k), u(1_000), u(3_000)).unwrap(), base * k);
        }
    }

    #[test]
    fn test_get_amount_out() {
        // 2 * 997 * 100 / (100 * 1000 + 2 * 997) = 1.955
        assert_eq!(AmmMath::get_amount_out(u(2), u(100), u(100), 3), Ok(u(1)));
        assert_eq!(
            AmmMath::get_amount_out(u(0), u(100), u(100), 3),
            Err(DexError::InsufficientInputAmount)
        );
        assert_eq!(
            AmmMath::get_amount_out(u(2), u(0), u(100), 3),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            AmmMath::get_amount_out(u(2), u(100), u(0), 3),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_get_amount_out_monotonic_and_below_feeless() {
        let (reserve_in, reserve_out) = (u(1_000_000), u(2_000_000));
        let mut previous = U256::zero();
        for amount in [1_000u64, 2_000, 5_000, 10_000, 100_000] {
            let out = AmmMath::get_amount_out(u(amount), reserve_in, reserve_out, 3).unwrap();
            let feeless = AmmMath::get_amount_out(u(amount), reserve_in, reserve_out, 0).unwrap();
            assert!(out > previous);
            assert!(out < feeless);
            previous = out;
        }
    }

    #[test]
    fn test_get_amount_in() {
        // 100 * 1 * 1000 / ((100 - 1) * 997) + 1 = 2
        assert_eq!(AmmMath::get_amount_in(u(1), u(100), u(100), 3), Ok(u(2)));
        assert_eq!(
            AmmMath::get_amount_in(u(0), u(100), u(100), 3),
            Err(DexError::InsufficientOutputAmount)
        );
        assert_eq!(
            AmmMath::get_amount_in(u(1), u(0), u(100), 3),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            AmmMath::get_amount_in(u(1), u(100), u(0), 3),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            AmmMath::get_amount_in(u(100), u(100), u(100), 3),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_amount_in_round_trip() {
        let (r0, r1) = (u(5_000_000), u(10_000_000));
        for x in [1_000u64, 12_345, 250_000] {
            let out = AmmMath::get_amount_out(u(x), r0, r1, 3).unwrap();
            let back = AmmMath::get_amount_in(out, r0, r1, 3).unwrap();
            assert!(back <= u(x + 1));
        }
    }

    #[test]
    fn test_calculate_liquidity() {
        // sqrt(4000 * 9000) = 6000
        assert_eq!(
            AmmMath::calculate_liquidity(u(4_000), u(9_000), u(0), u(0), u(0)),
            Ok(u(5_000))
        );
        assert_eq!(
            AmmMath::calculate_liquidity(u(1_000), u(1_000), u(0), u(0), u(0)),
            Ok(u(0))
        );
        assert_eq!(
            AmmMath::calculate_liquidity(u(10), u(10), u(0), u(0), u(0)),
            Err(DexError::InsufficientLiquidityMinted)
        );
        // The weaker side decides: 100 * 6000 / 4000 = 150 vs 300 * 6000 / 9000 = 200
        assert_eq!(
            AmmMath::calculate_liquidity(u(100), u(300), u(4_000), u(9_000), u(6_000)),
            Ok(u(150))
        );
    }

    #[test]
    fn test_calculate_burn_amounts() {
        assert_eq!(
            AmmMath::calculate_burn_amounts(u(500), u(4_000), u(9_000), u(6_000)),
            Ok((u(333), u(750)))
        );
        assert_eq!(
            AmmMath::calculate_burn_amounts(u(1), u(4_000), u(9_000), u(6_000_000)),
            Err(DexError::InsufficientLiquidityBurned)
        );
    }

    #[test]
    fn test_protocol_fee_liquidity() {
        // A one-sixth share tracks the classic S * d / (5 * rootK + rootKLast) formula
        let supply = u(1_000_000);
        let (root_k, root_k_last) = (u(1_100_000), u(1_000_000));
        let classic = supply * (root_k - root_k_last) / (root_k * 5 + root_k_last);
        let generic = AmmMath::protocol_fee_liquidity(
            supply,
            root_k,
            root_k_last,
            (PROTOCOL_FEE_DENOMINATOR / 6) as u32,
        )
        .unwrap();
        assert!(generic <= classic && classic - generic <= classic / 1_000);

        assert_eq!(
            AmmMath::protocol_fee_liquidity(supply, root_k_last, root_k_last, 5_000),
            Ok(U256::zero())
        );
        assert_eq!(
            AmmMath::protocol_fee_liquidity(supply, root_k, root_k_last, 0),
            Ok(U256::zero())
        );
    }

    #[test]
    fn test_split_operator_fee() {
        assert_eq!(AmmMath::split_operator_fee(u(1_000), 40), Ok((u(600), u(400))));
        assert_eq!(AmmMath::split_operator_fee(u(1_000), 0), Ok((u(1_000), u(0))));
        assert_eq!(AmmMath::split_operator_fee(u(1_000), 100), Ok((u(0), u(1_000))));
    }

    #[test]
    fn test_encode_price() {
        assert_eq!(AmmMath::encode_price(u(2), u(1)), Ok(u(2) << 112));
        assert_eq!(AmmMath::encode_price(u(1), u(0)), Err(DexError::DivisionByZero));
    }

    #[test]
    fn test_u512_conversion() {
        let value = U256::from(123_456_789u64) << 100;
        assert_eq!(u512_to_u256(u256_to_u512(value)), Ok(value));
        assert_eq!(u512_to_u256(U512::one() << 300), Err(DexError::Overflow));
    }
}
