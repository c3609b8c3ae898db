use anchor_lang::prelude::*;

use crate::errors::ErrorCode;
use crate::round::RolloverOutcome;
use crate::state::DepositorPosition;

/// Pooled depositor capital that mirrors one trader wallet.
/// PDA of `[USERS_VAULT_SEED, trader_wallet]`; signs for its asset and share accounts.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct UsersVault {
    /// The only wallet allowed to roll this vault over or trade with it.
    pub trader_wallet: Pubkey,
    pub asset_mint: Pubkey,
    pub share_mint: Pubkey,
    pub bump: u8,
    pub share_mint_bump: u8,

    pub current_round: u64,
    /// Assets deposited this round, not yet converted to shares.
    pub pending_deposit_assets: u64,
    /// Shares escrowed this round, not yet redeemed.
    pub pending_withdraw_shares: u64,
    /// Redeemed assets waiting to be claimed.
    pub processed_withdraw_assets: u64,

    pub initial_vault_balance: u64,
    pub after_round_vault_balance: u64,
    /// Assets sitting in open positions and orders, at cost. Counted in the share price.
    pub deployed_collateral: u64,
}

impl UsersVault {
    // 8 discriminator + 32 wallet + 32 asset_mint + 32 share_mint + 1 bump + 1 share_mint_bump
    // + 8 round + 8 pending_deposit + 8 pending_withdraw + 8 processed
    // + 8 initial + 8 after_round + 8 deployed
    pub const SPACE: usize = 8 + 32 + 32 + 32 + 1 + 1 + 8 * 7;

    /// Asset balance the vault may trade with: excludes unpriced deposits and
    /// redeemed-but-unclaimed withdrawals.
    pub fn free_trading_balance(&self, asset_balance: u64) -> u64 {
        asset_balance
            .saturating_sub(self.pending_deposit_assets)
            .saturating_sub(self.processed_withdraw_assets)
    }

    fn require_started(&self) -> Result<()> {
        require!(self.current_round > 0, ErrorCode::InvalidRound);
        Ok(())
    }

    /// `deposit_price` is the price of the position's stored deposit round, when that round is closed.
    pub fn record_deposit(
        &mut self,
        position: &mut DepositorPosition,
        amount: u64,
        deposit_price: Option<u128>,
    ) -> Result<()> {
        require!(amount > 0, ErrorCode::ZeroAmount);
        position.deposit.reconcile(self.current_round, deposit_price)?;
        position.deposit.record(amount, self.current_round)?;
        self.pending_deposit_assets = self
            .pending_deposit_assets
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }

    pub fn claim_shares(
        &self,
        position: &mut DepositorPosition,
        amount: u64,
        deposit_price: Option<u128>,
    ) -> Result<()> {
        self.require_started()?;
        require!(amount > 0, ErrorCode::ZeroAmount);
        position.deposit.reconcile(self.current_round, deposit_price)?;
        position.deposit.claim(amount)
    }

    /// `held_shares` is the caller's share token balance before escrow.
    pub fn record_withdraw_request(
        &mut self,
        position: &mut DepositorPosition,
        shares: u64,
        held_shares: u64,
        withdrawal_price: Option<u128>,
    ) -> Result<()> {
        self.require_started()?;
        require!(shares > 0, ErrorCode::ZeroAmount);
        require!(shares <= held_shares, ErrorCode::InsufficientShares);
        position.withdrawal.reconcile(self.current_round, withdrawal_price)?;
        position.withdrawal.record(shares, self.current_round)?;
        self.pending_withdraw_shares = self
            .pending_withdraw_shares
            .checked_add(shares)
            .ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }

    pub fn claim_assets(
        &mut self,
        position: &mut DepositorPosition,
        amount: u64,
        withdrawal_price: Option<u128>,
    ) -> Result<()> {
        self.require_started()?;
        require!(amount > 0, ErrorCode::ZeroAmount);
        position.withdrawal.reconcile(self.current_round, withdrawal_price)?;
        position.withdrawal.claim(amount)?;
        self.processed_withdraw_assets = self
            .processed_withdraw_assets
            .checked_sub(amount)
            .ok_or(ErrorCode::InsufficientAssets)?;
        Ok(())
    }

    /// Close the current round with a settlement computed by the wallet.
    /// Returns the round that was closed.
    pub fn rollover_from_trader(
        &mut self,
        caller: &Pubkey,
        wallet_round: u64,
        outcome: &RolloverOutcome,
    ) -> Result<u64> {
        require_keys_eq!(*caller, self.trader_wallet, ErrorCode::CallerNotAllowed);
        require!(wallet_round == self.current_round, ErrorCode::RoundMismatch);

        self.after_round_vault_balance = outcome.after_round_vault_balance;
        self.initial_vault_balance = outcome.next_initial_vault_balance;
        self.processed_withdraw_assets = outcome.processed_withdraw_assets;
        self.pending_deposit_assets = 0;
        self.pending_withdraw_shares = 0;

        let closed = self.current_round;
        self.current_round = closed.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRICE_PRECISION;
    use crate::round::{settle_round, RolloverInputs};

    const ONE: u128 = PRICE_PRECISION;

    fn vault(wallet: Pubkey) -> UsersVault {
        UsersVault {
            trader_wallet: wallet,
            ..Default::default()
        }
    }

    fn position(vault: &UsersVault) -> DepositorPosition {
        DepositorPosition {
            vault: vault.trader_wallet,
            owner: Pubkey::new_unique(),
            ..Default::default()
        }
    }

    /// Settle the vault side alone, the way the wallet would with an idle trader.
    fn roll(vault: &mut UsersVault, wallet: &Pubkey, balance: u64, supply: u64) -> RolloverOutcome {
        let outcome = settle_round(&RolloverInputs {
            vault_balance: balance,
            vault_pending_deposits: vault.pending_deposit_assets,
            vault_pending_withdraw_shares: vault.pending_withdraw_shares,
            vault_processed_withdraw_assets: vault.processed_withdraw_assets,
            initial_vault_balance: vault.initial_vault_balance,
            share_supply: supply,
            ..Default::default()
        })
        .unwrap();
        vault.rollover_from_trader(wallet, vault.current_round, &outcome).unwrap();
        outcome
    }

    #[test]
    fn test_round_zero_deposit_then_rollover_prices_at_par() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        let mut alice = position(&vault);

        vault.record_deposit(&mut alice, 1_000, None).unwrap();
        assert_eq!(alice.deposit.preview(vault.current_round, None).unwrap(), 0);

        let outcome = roll(&mut vault, &wallet, 1_000, 0);
        assert_eq!(outcome.assets_per_share, ONE);
        assert_eq!(vault.current_round, 1);
        assert_eq!(
            alice.deposit.preview(vault.current_round, Some(outcome.assets_per_share)).unwrap(),
            1_000
        );
    }

    #[test]
    fn test_round_zero_blocks_claims_and_withdrawals() {
        let mut vault = vault(Pubkey::new_unique());
        let mut alice = position(&vault);
        let expected: Error = ErrorCode::InvalidRound.into();

        assert_eq!(vault.claim_shares(&mut alice, 1, None).unwrap_err(), expected);
        assert_eq!(
            vault.record_withdraw_request(&mut alice, 1, 1, None).unwrap_err(),
            expected
        );
        assert_eq!(vault.claim_assets(&mut alice, 1, None).unwrap_err(), expected);
    }

    #[test]
    fn test_zero_amounts_are_rejected() {
        let mut vault = vault(Pubkey::new_unique());
        vault.current_round = 1;
        let mut alice = position(&vault);
        let expected: Error = ErrorCode::ZeroAmount.into();

        assert_eq!(vault.record_deposit(&mut alice, 0, None).unwrap_err(), expected);
        assert_eq!(vault.claim_shares(&mut alice, 0, None).unwrap_err(), expected);
        assert_eq!(
            vault.record_withdraw_request(&mut alice, 0, 10, None).unwrap_err(),
            expected
        );
        assert_eq!(vault.claim_assets(&mut alice, 0, None).unwrap_err(), expected);
    }

    #[test]
    fn test_gain_prices_later_depositors_higher() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        let mut seed = position(&vault);
        vault.record_deposit(&mut seed, 200, None).unwrap();
        roll(&mut vault, &wallet, 200, 0);

        let mut alice = position(&vault);
        let mut bob = position(&vault);
        vault.record_deposit(&mut alice, 100, None).unwrap();
        vault.record_deposit(&mut bob, 100, None).unwrap();
        assert_eq!(vault.pending_deposit_assets, 200);

        // trading lifts the 200 pool to 220 before rollover
        let outcome = roll(&mut vault, &wallet, 420, 200);
        assert_eq!(outcome.assets_per_share, 11 * ONE / 10);

        let price = Some(outcome.assets_per_share);
        assert_eq!(alice.deposit.preview(vault.current_round, price).unwrap(), 90);
        assert_eq!(bob.deposit.preview(vault.current_round, price).unwrap(), 90);
        // individual floors never exceed what the aggregate minted
        assert!(180 <= outcome.minted_shares);
    }

    #[test]
    fn test_deposit_after_rollover_reconciles_previous_round() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        let mut alice = position(&vault);
        vault.record_deposit(&mut alice, 500, None).unwrap();
        let outcome = roll(&mut vault, &wallet, 500, 0);

        let expected: Error = ErrorCode::InvalidRoundPrice.into();
        assert_eq!(vault.record_deposit(&mut alice, 10, None).unwrap_err(), expected);

        vault
            .record_deposit(&mut alice, 10, Some(outcome.assets_per_share))
            .unwrap();
        assert_eq!(alice.deposit.round, vault.current_round);
        assert_eq!(alice.deposit.unclaimed_shares, 500);
        assert_eq!(alice.deposit.pending_assets, 10);
    }

    #[test]
    fn test_claim_shares_reconciles_and_bounds() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        let mut alice = position(&vault);
        vault.record_deposit(&mut alice, 300, None).unwrap();
        let outcome = roll(&mut vault, &wallet, 300, 0);
        let price = Some(outcome.assets_per_share);

        let expected: Error = ErrorCode::InsufficientShares.into();
        assert_eq!(vault.claim_shares(&mut alice, 301, price).unwrap_err(), expected);

        vault.claim_shares(&mut alice, 200, price).unwrap();
        assert_eq!(alice.deposit.unclaimed_shares, 100);
        assert_eq!(alice.deposit.pending_assets, 0);
        // already reconciled, no price needed any more
        vault.claim_shares(&mut alice, 100, None).unwrap();
        assert_eq!(alice.deposit.preview(vault.current_round, None).unwrap(), 0);
    }

    #[test]
    fn test_withdraw_request_for_unowned_shares_fails() {
        let mut vault = vault(Pubkey::new_unique());
        vault.current_round = 1;
        let mut mallory = position(&vault);

        let expected: Error = ErrorCode::InsufficientShares.into();
        assert_eq!(
            vault.record_withdraw_request(&mut mallory, 50, 0, None).unwrap_err(),
            expected
        );
        assert_eq!(
            vault.record_withdraw_request(&mut mallory, 50, 49, None).unwrap_err(),
            expected
        );
        assert_eq!(vault.pending_withdraw_shares, 0);
        assert_eq!(mallory.withdrawal, Default::default());
    }

    #[test]
    fn test_full_withdrawal_cycle() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        let mut alice = position(&vault);
        vault.record_deposit(&mut alice, 1_000, None).unwrap();
        let first = roll(&mut vault, &wallet, 1_000, 0);
        vault
            .claim_shares(&mut alice, 1_000, Some(first.assets_per_share))
            .unwrap();

        vault.record_withdraw_request(&mut alice, 400, 1_000, None).unwrap();
        assert_eq!(vault.pending_withdraw_shares, 400);

        // pool grows 1000 -> 1100
        let second = roll(&mut vault, &wallet, 1_100, 1_000);
        assert_eq!(second.redeemed_assets, 440);
        assert_eq!(vault.processed_withdraw_assets, 440);
        assert_eq!(vault.pending_withdraw_shares, 0);

        let price = Some(second.assets_per_share);
        assert_eq!(alice.withdrawal.preview(vault.current_round, price).unwrap(), 440);

        let expected: Error = ErrorCode::InsufficientAssets.into();
        assert_eq!(vault.claim_assets(&mut alice, 441, price).unwrap_err(), expected);
        vault.claim_assets(&mut alice, 440, price).unwrap();
        assert_eq!(vault.processed_withdraw_assets, 0);
        assert_eq!(alice.withdrawal.unclaimed_assets, 0);
    }

    #[test]
    fn test_rollover_only_from_registered_wallet() {
        let wallet = Pubkey::new_unique();
        let mut vault = vault(wallet);
        vault.pending_deposit_assets = 10;
        let outcome = settle_round(&RolloverInputs {
            vault_balance: 10,
            vault_pending_deposits: 10,
            ..Default::default()
        })
        .unwrap();

        let not_allowed: Error = ErrorCode::CallerNotAllowed.into();
        assert_eq!(
            vault
                .rollover_from_trader(&Pubkey::new_unique(), 0, &outcome)
                .unwrap_err(),
            not_allowed
        );
        let mismatch: Error = ErrorCode::RoundMismatch.into();
        assert_eq!(
            vault.rollover_from_trader(&wallet, 3, &outcome).unwrap_err(),
            mismatch
        );
        assert_eq!(vault.current_round, 0);

        assert_eq!(vault.rollover_from_trader(&wallet, 0, &outcome).unwrap(), 0);
        assert_eq!(vault.current_round, 1);
        assert_eq!(vault.pending_deposit_assets, 0);
    }

    #[test]
    fn test_free_trading_balance() {
        let vault = UsersVault {
            pending_deposit_assets: 100,
            processed_withdraw_assets: 50,
            ..Default::default()
        };
        assert_eq!(vault.free_trading_balance(1_000), 850);
        assert_eq!(vault.free_trading_balance(120), 0);
    }
}
