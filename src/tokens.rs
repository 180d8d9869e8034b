//! Collaborator tokens used by deployments and tests
//!
//! - [`TestToken`]: plain CEP-18 token minted to the deployer
//! - [`DeflatingToken`]: burns 1% of every transfer
//! - [`CallbackToken`]: calls back into a pair while that pair pays it out
//! - [`Wcspr`]: wraps native CSPR so it can sit in a pair
use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;
use crate::dex::pair::PairContractRef;
use crate::errors::DexError;
use crate::events::{Approval, Deposit, Transfer, Withdrawal};
use crate::math::{u256_to_u512, u512_to_u256};
use crate::token::LpToken;

/// Share of each transfer a [`DeflatingToken`] destroys, in percent
pub const TRANSFER_TAX_PERCENT: u64 = 1;

/// Plain CEP-18 token
#[odra::module(events = [Transfer, Approval], errors = DexError)]
pub struct TestToken {
    ledger: SubModule<LpToken>,
}

#[odra::module]
impl TestToken {
    /// Mints `initial_supply` to the deployer
    pub fn init(&mut self, name: String, symbol: String, initial_supply: U256) {
        self.ledger.init(name, symbol);
        let caller = self.env().caller();
        self.ledger.mint(caller, initial_supply);
    }

    pub fn name(&self) -> String {
        self.ledger.name()
    }

    pub fn symbol(&self) -> String {
        self.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.ledger.balance_of(owner)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        self.ledger.transfer(to, amount)
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.ledger.approve(spender, amount)
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        self.ledger.transfer_from(from, to, amount)
    }
}

/// CEP-18 token that burns [`TRANSFER_TAX_PERCENT`] of every transfer, so the
/// recipient always gets less than was sent.
#[odra::module(events = [Transfer, Approval], errors = DexError)]
pub struct DeflatingToken {
    ledger: SubModule<LpToken>,
}

#[odra::module]
impl DeflatingToken {
    pub fn init(&mut self, initial_supply: U256) {
        self.ledger
            .init(String::from("Deflating Test Token"), String::from("DTT"));
        let caller = self.env().caller();
        self.ledger.mint(caller, initial_supply);
    }

    pub fn name(&self) -> String {
        self.ledger.name()
    }

    pub fn symbol(&self) -> String {
        self.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.ledger.balance_of(owner)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.taxed_transfer(caller, to, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.ledger.approve(spender, amount)
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.ledger.spend_allowance(from, caller, amount);
        self.taxed_transfer(from, to, amount);
        true
    }

    fn taxed_transfer(&mut self, from: Address, to: Address, amount: U256) {
        let tax = amount * U256::from(TRANSFER_TAX_PERCENT) / U256::from(100u64);
        self.ledger.burn(from, tax);
        self.ledger.raw_transfer(from, to, amount - tax);
    }
}

/// CEP-18 token that re-enters its callback pair with `sync` whenever that
/// pair transfers it out.
#[odra::module(events = [Transfer, Approval], errors = DexError)]
pub struct CallbackToken {
    ledger: SubModule<LpToken>,
    callback: Var<Address>,
}

#[odra::module]
impl CallbackToken {
    pub fn init(&mut self, initial_supply: U256) {
        self.ledger
            .init(String::from("Callback Test Token"), String::from("CBT"));
        let caller = self.env().caller();
        self.ledger.mint(caller, initial_supply);
    }

    /// Pair to call back into
    pub fn set_callback(&mut self, pair: Address) {
        self.callback.set(pair);
    }

    pub fn name(&self) -> String {
        self.ledger.name()
    }

    pub fn symbol(&self) -> String {
        self.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.ledger.balance_of(owner)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        if self.callback.get() == Some(caller) {
            PairContractRef::new(self.env(), caller).sync();
        }
        self.ledger.transfer(to, amount)
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.ledger.approve(spender, amount)
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        self.ledger.transfer_from(from, to, amount)
    }
}

/// Wrapped CSPR: one WCSPR unit per mote deposited
#[odra::module(events = [Transfer, Approval, Deposit, Withdrawal], errors = DexError)]
pub struct Wcspr {
    ledger: SubModule<LpToken>,
}

#[odra::module]
impl Wcspr {
    pub fn init(&mut self) {
        self.ledger
            .init(String::from("Wrapped CSPR"), String::from("WCSPR"));
    }

    /// Wraps the attached CSPR for the caller
    #[odra(payable)]
    pub fn deposit(&mut self) {
        let caller = self.env().caller();
        let amount = match u512_to_u256(self.env().attached_value()) {
            Ok(amount) => amount,
            Err(err) => self.env().revert(err),
        };
        self.ledger.mint(caller, amount);
        self.env().emit_event(Deposit {
            owner: caller,
            amount,
        });
    }

    /// Unwraps `amount` back to the caller
    pub fn withdraw(&mut self, amount: U256) {
        let caller = self.env().caller();
        self.withdraw_to(caller, amount);
    }

    /// Burns the caller's `amount` and sends the CSPR to `to`
    pub fn withdraw_to(&mut self, to: Address, amount: U256) {
        let caller = self.env().caller();
        self.ledger.burn(caller, amount);
        self.env().transfer_tokens(&to, &u256_to_u512(amount));
        self.env().emit_event(Withdrawal {
            owner: caller,
            to,
            amount,
        });
    }

    pub fn name(&self) -> String {
        self.ledger.name()
    }

    pub fn symbol(&self) -> String {
        self.ledger.symbol()
    }

    pub fn decimals(&self) -> u8 {
        self.ledger.decimals()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.ledger.balance_of(owner)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        self.ledger.transfer(to, amount)
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.ledger.approve(spender, amount)
    }

    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        self.ledger.transfer_from(from, to, amount)
    }
}

/// External interface of [`Wcspr`] beyond CEP-18
#[odra::external_contract]
pub trait WcsprToken {
    fn deposit(&mut self);
    fn withdraw_to(&mut self, to: Address, amount: U256);
    fn transfer(&mut self, to: Address, amount: U256) -> bool;
    fn balance_of(&self, owner: Address) -> U256;
}

#[cfg(test)]
mod tests {
    use super::*;
    use odra::casper_types::U512;
    use odra::host::{Deployer, HostEnv, NoArgs};

    fn deploy_test_token(env: &HostEnv) -> TestTokenHostRef {
        TestToken::deploy(
            env,
            TestTokenInitArgs {
                name: String::from("Test Token"),
                symbol: String::from("TT"),
                initial_supply: U256::from(1_000_000u64),
            },
        )
    }

    #[test]
    fn test_token_mints_to_deployer() {
        let env = odra_test::env();
        let token = deploy_test_token(&env);
        assert_eq!(token.balance_of(env.get_account(0)), U256::from(1_000_000u64));
        assert_eq!(token.total_supply(), U256::from(1_000_000u64));
    }

    #[test]
    fn test_transfer_from_requires_allowance() {
        let env = odra_test::env();
        let mut token = deploy_test_token(&env);
        let owner = env.get_account(0);
        let spender = env.get_account(1);

        env.set_caller(spender);
        assert_eq!(
            token.try_transfer_from(owner, spender, U256::from(10u64)),
            Err(DexError::InsufficientAllowance.into())
        );

        env.set_caller(owner);
        token.approve(spender, U256::from(10u64));
        env.set_caller(spender);
        token.transfer_from(owner, spender, U256::from(10u64));
        assert_eq!(token.balance_of(spender), U256::from(10u64));
        assert_eq!(token.allowance(owner, spender), U256::zero());
    }

    #[test]
    fn test_deflating_token_burns_on_transfer() {
        let env = odra_test::env();
        let mut token = DeflatingToken::deploy(
            &env,
            DeflatingTokenInitArgs {
                initial_supply: U256::from(10_000u64),
            },
        );
        let recipient = env.get_account(1);

        token.transfer(recipient, U256::from(1_000u64));

        assert_eq!(token.balance_of(recipient), U256::from(990u64));
        assert_eq!(token.balance_of(env.get_account(0)), U256::from(9_000u64));
        assert_eq!(token.total_supply(), U256::from(9_990u64));
    }

    #[test]
    fn test_wcspr_wraps_and_unwraps() {
        let env = odra_test::env();
        let mut wcspr = Wcspr::deploy(&env, NoArgs);
        let user = env.get_account(1);
        let recipient = env.get_account(2);

        env.set_caller(user);
        wcspr.with_tokens(U512::from(5_000u64)).deposit();
        assert_eq!(wcspr.balance_of(user), U256::from(5_000u64));

        let before = env.balance_of(&recipient);
        wcspr.withdraw_to(recipient, U256::from(2_000u64));
        assert_eq!(wcspr.balance_of(user), U256::from(3_000u64));
        assert_eq!(env.balance_of(&recipient), before + U512::from(2_000u64));
    }
}
