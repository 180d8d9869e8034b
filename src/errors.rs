//! Error definitions for the DEX smart contracts
use odra::prelude::*;

/// Errors raised by the Factory, Pair, Router and the bundled tokens.
///
/// Every failure aborts the whole call, so a caller observing one of these
/// codes knows no state was changed.
#[odra::odra_error]
pub enum DexError {
    /// Caller lacks the required capability
    Forbidden = 1,
    /// Operator fee percentage above the ceiling
    WrongPercentage = 2,
    /// Swap path shorter than two assets or not matching the native asset
    InvalidPath = 3,
    /// Swap recipient is one of the pair's own assets
    InvalidTo = 4,
    /// Both tokens of a pair are the same
    IdenticalAddresses = 5,
    /// Null identity supplied as a token
    ZeroAddress = 6,

    /// Zero amount passed to `quote`
    InsufficientAmount = 10,
    /// A reserve is empty or smaller than the requested output
    InsufficientLiquidity = 11,
    /// Zero input amount
    InsufficientInputAmount = 12,
    /// Zero or below-minimum output amount
    InsufficientOutputAmount = 13,
    /// Deposit too small to issue any claim units
    InsufficientLiquidityMinted = 14,
    /// Redemption too small to return both assets
    InsufficientLiquidityBurned = 15,
    /// Token A amount below the caller's minimum
    InsufficientAAmount = 16,
    /// Token B amount below the caller's minimum
    InsufficientBAmount = 17,
    /// Required input above the caller's maximum
    ExcessiveInputAmount = 18,

    /// Pair already registered for the tuple
    PairExists = 20,
    /// No pair registered for the tuple
    PairDoesNotExist = 21,

    /// Deadline passed
    Expired = 30,
    /// Permit deadline passed
    ExpiredPermit = 31,
    /// Permit signature does not match the owner
    InvalidSignature = 32,

    /// Constant-product invariant violated by a swap
    KInvariantViolated = 40,
    /// Reentrant call into a locked pair
    Locked = 41,
    /// Arithmetic overflow
    Overflow = 42,
    /// Arithmetic underflow
    Underflow = 43,
    /// Division by zero
    DivisionByZero = 44,

    /// Holder balance too small
    InsufficientBalance = 50,
    /// Spender allowance too small
    InsufficientAllowance = 51,
    /// Token transfer reported failure
    TransferFailed = 52,
}
