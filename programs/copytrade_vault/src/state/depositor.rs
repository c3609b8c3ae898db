use anchor_lang::prelude::*;

use crate::errors::ErrorCode;
use crate::math::{assets_from_shares, shares_from_assets};

/// Assets queued for share issuance.
///
/// `pending_assets` always belongs to `round`. Once that round has been rolled over the
/// amount is priced and moved into `unclaimed_shares` on the next touch.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PendingDeposit {
    pub round: u64,
    pub pending_assets: u64,
    pub unclaimed_shares: u64,
}

impl PendingDeposit {
    pub const SPACE: usize = 8 + 8 + 8;

    /// True when the pending amount was recorded in a round that already has a price.
    pub fn needs_price(&self, current_round: u64) -> bool {
        self.pending_assets > 0 && self.round < current_round
    }

    /// Shares available once the stored round is priced. `round_price` is the price of
    /// `self.round` and is only consulted when that round is already closed.
    pub fn preview(&self, current_round: u64, round_price: Option<u128>) -> Result<u64> {
        if !self.needs_price(current_round) {
            return Ok(self.unclaimed_shares);
        }
        let price = round_price.ok_or(ErrorCode::InvalidRoundPrice)?;
        self.unclaimed_shares
            .checked_add(shares_from_assets(self.pending_assets, price)?)
            .ok_or_else(|| error!(ErrorCode::MathOverflow))
    }

    /// Fold a priced pending amount into `unclaimed_shares`.
    pub fn reconcile(&mut self, current_round: u64, round_price: Option<u128>) -> Result<()> {
        if self.needs_price(current_round) {
            self.unclaimed_shares = self.preview(current_round, round_price)?;
            self.pending_assets = 0;
        }
        Ok(())
    }

    pub fn record(&mut self, amount: u64, current_round: u64) -> Result<()> {
        require!(!self.needs_price(current_round), ErrorCode::InvalidRoundPrice);
        self.pending_assets = self
            .pending_assets
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        self.round = current_round;
        Ok(())
    }

    pub fn claim(&mut self, amount: u64) -> Result<()> {
        require!(amount <= self.unclaimed_shares, ErrorCode::InsufficientShares);
        self.unclaimed_shares -= amount;
        Ok(())
    }
}

/// Shares escrowed for redemption. Mirrors [`PendingDeposit`] on the way out.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub round: u64,
    pub pending_shares: u64,
    pub unclaimed_assets: u64,
}

impl PendingWithdrawal {
    pub const SPACE: usize = 8 + 8 + 8;

    pub fn needs_price(&self, current_round: u64) -> bool {
        self.pending_shares > 0 && self.round < current_round
    }

    pub fn preview(&self, current_round: u64, round_price: Option<u128>) -> Result<u64> {
        if !self.needs_price(current_round) {
            return Ok(self.unclaimed_assets);
        }
        let price = round_price.ok_or(ErrorCode::InvalidRoundPrice)?;
        self.unclaimed_assets
            .checked_add(assets_from_shares(self.pending_shares, price)?)
            .ok_or_else(|| error!(ErrorCode::MathOverflow))
    }

    pub fn reconcile(&mut self, current_round: u64, round_price: Option<u128>) -> Result<()> {
        if self.needs_price(current_round) {
            self.unclaimed_assets = self.preview(current_round, round_price)?;
            self.pending_shares = 0;
        }
        Ok(())
    }

    pub fn record(&mut self, shares: u64, current_round: u64) -> Result<()> {
        require!(!self.needs_price(current_round), ErrorCode::InvalidRoundPrice);
        self.pending_shares = self
            .pending_shares
            .checked_add(shares)
            .ok_or(ErrorCode::MathOverflow)?;
        self.round = current_round;
        Ok(())
    }

    pub fn claim(&mut self, amount: u64) -> Result<()> {
        require!(amount <= self.unclaimed_assets, ErrorCode::InsufficientAssets);
        self.unclaimed_assets -= amount;
        Ok(())
    }
}

/// Per-depositor book in one users vault, PDA of `[DEPOSITOR_SEED, vault, owner]`.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct DepositorPosition {
    pub vault: Pubkey,
    pub owner: Pubkey,
    pub bump: u8,
    pub deposit: PendingDeposit,
    pub withdrawal: PendingWithdrawal,
}

impl DepositorPosition {
    // 8 discriminator + 32 vault + 32 owner + 1 bump + deposit + withdrawal
    pub const SPACE: usize = 8 + 32 + 32 + 1 + PendingDeposit::SPACE + PendingWithdrawal::SPACE;
}
