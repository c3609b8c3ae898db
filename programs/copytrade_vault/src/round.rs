//! Rollover settlement shared by the trader wallet and the users vault.
//!
//! [`settle_round`] is pure: it takes the balances and counters of both sides at the
//! end of a round and returns everything the rollover handler has to write and move.
//! Nothing is applied unless the whole computation succeeds.

use anchor_lang::prelude::*;

use crate::errors::ErrorCode;
use crate::math::{apply_bps, assets_from_shares, price_per_share, ratio, shares_from_assets};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RolloverInputs {
    /// Asset balance held by the trader wallet, pending deposits included.
    pub wallet_balance: u64,
    pub wallet_pending_deposits: u64,
    pub wallet_pending_withdrawals: u64,
    /// Trading capital of the wallet when the round opened.
    pub initial_trader_balance: u64,
    /// Wallet assets held in open positions and orders, at cost.
    pub wallet_deployed_collateral: u64,
    /// Asset balance held by the users vault, pending deposits and claimable withdrawals included.
    pub vault_balance: u64,
    pub vault_pending_deposits: u64,
    pub vault_pending_withdraw_shares: u64,
    pub vault_processed_withdraw_assets: u64,
    /// Trading capital of the vault when the round opened.
    pub initial_vault_balance: u64,
    /// Vault assets held in open positions and orders, at cost.
    pub vault_deployed_collateral: u64,
    /// Share supply before this rollover mints or burns anything.
    pub share_supply: u64,
    pub performance_fee_bps: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RolloverOutcome {
    pub after_round_trader_balance: u64,
    pub after_round_vault_balance: u64,
    pub trader_profit: i64,
    pub vault_profit: i64,
    /// Performance fee moved from the vault to the wallet.
    pub performance_fee: u64,
    /// Price recorded for the closing round.
    pub assets_per_share: u128,
    pub minted_shares: u64,
    pub burned_shares: u64,
    pub redeemed_assets: u64,
    /// Claimable withdrawal pool after this rollover.
    pub processed_withdraw_assets: u64,
    /// Assets sent to the trader.
    pub trader_payout: u64,
    pub next_initial_trader_balance: u64,
    pub next_initial_vault_balance: u64,
    /// Vault/wallet capital ratio for the next round, 1e18 fixed-point.
    pub ratio_proportions: u128,
}

/// Trading capital is the liquid balance that belongs to the round plus collateral
/// deployed at cost. Only the liquid part can pay the fee and the trader.
pub fn settle_round(inputs: &RolloverInputs) -> Result<RolloverOutcome> {
    let liquid_trader = inputs
        .wallet_balance
        .checked_sub(inputs.wallet_pending_deposits)
        .ok_or(ErrorCode::InsufficientAssets)?;
    let liquid_vault = inputs
        .vault_balance
        .checked_sub(inputs.vault_pending_deposits)
        .and_then(|b| b.checked_sub(inputs.vault_processed_withdraw_assets))
        .ok_or(ErrorCode::InsufficientAssets)?;
    let after_trader = liquid_trader
        .checked_add(inputs.wallet_deployed_collateral)
        .ok_or(ErrorCode::MathOverflow)?;
    let after_vault = liquid_vault
        .checked_add(inputs.vault_deployed_collateral)
        .ok_or(ErrorCode::MathOverflow)?;

    let trader_pnl = after_trader as i128 - inputs.initial_trader_balance as i128;
    let vault_pnl = after_vault as i128 - inputs.initial_vault_balance as i128;

    require!(
        inputs.wallet_pending_deposits > 0
            || inputs.wallet_pending_withdrawals > 0
            || inputs.vault_pending_deposits > 0
            || inputs.vault_pending_withdraw_shares > 0
            || trader_pnl != 0
            || vault_pnl != 0,
        ErrorCode::InvalidRollover
    );

    let (trader_profit, vault_profit) = split_profit(
        trader_pnl + vault_pnl,
        inputs.initial_trader_balance,
        inputs.initial_vault_balance,
    )?;

    let performance_fee = if vault_pnl > 0 {
        apply_bps(vault_pnl as u64, inputs.performance_fee_bps)?.min(liquid_vault)
    } else {
        0
    };
    let vault_pool = after_vault - performance_fee;

    let assets_per_share = price_per_share(vault_pool, inputs.share_supply)?;
    if inputs.share_supply > 0 || inputs.vault_pending_deposits > 0 {
        require!(assets_per_share > 0, ErrorCode::ZeroPricePerShare);
    }
    let minted_shares = shares_from_assets(inputs.vault_pending_deposits, assets_per_share)?;
    let redeemed_assets = if inputs.vault_pending_withdraw_shares > 0 {
        assets_from_shares(inputs.vault_pending_withdraw_shares, assets_per_share)?
    } else {
        0
    };
    let processed_withdraw_assets = inputs
        .vault_processed_withdraw_assets
        .checked_add(redeemed_assets)
        .ok_or(ErrorCode::MathOverflow)?;

    let trader_available = after_trader
        .checked_add(performance_fee)
        .ok_or(ErrorCode::MathOverflow)?;
    let trader_payout = if inputs.wallet_pending_withdrawals > 0 {
        let profit = trader_profit.max(0) as u64;
        inputs
            .wallet_pending_withdrawals
            .saturating_add(profit)
            .min(liquid_trader + performance_fee)
    } else {
        0
    };

    let next_initial_trader_balance = (trader_available - trader_payout)
        .checked_add(inputs.wallet_pending_deposits)
        .ok_or(ErrorCode::MathOverflow)?;
    let next_initial_vault_balance = vault_pool
        .checked_add(inputs.vault_pending_deposits)
        .and_then(|b| b.checked_sub(redeemed_assets))
        .ok_or(ErrorCode::MathOverflow)?;

    Ok(RolloverOutcome {
        after_round_trader_balance: after_trader,
        after_round_vault_balance: after_vault,
        trader_profit,
        vault_profit,
        performance_fee,
        assets_per_share,
        minted_shares,
        burned_shares: inputs.vault_pending_withdraw_shares,
        redeemed_assets,
        processed_withdraw_assets,
        trader_payout,
        next_initial_trader_balance,
        next_initial_vault_balance,
        ratio_proportions: ratio(next_initial_vault_balance, next_initial_trader_balance)?,
    })
}

/// Split the combined P&L by each side's capital at the start of the round.
fn split_profit(combined: i128, trader_base: u64, vault_base: u64) -> Result<(i64, i64)> {
    let total_base = trader_base as i128 + vault_base as i128;
    let trader_share = if total_base == 0 {
        0
    } else {
        combined
            .checked_mul(trader_base as i128)
            .ok_or(ErrorCode::MathOverflow)?
            / total_base
    };
    let vault_share = combined - trader_share;
    Ok((to_i64(trader_share)?, to_i64(vault_share)?))
}

fn to_i64(value: i128) -> Result<i64> {
    i64::try_from(value).map_err(|_| error!(ErrorCode::MathOverflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INITIAL_PRICE_PER_SHARE, PRICE_PRECISION};

    const ONE: u128 = PRICE_PRECISION;

    #[test]
    fn test_empty_round_is_rejected() {
        let expected: Error = ErrorCode::InvalidRollover.into();
        assert_eq!(settle_round(&RolloverInputs::default()).unwrap_err(), expected);

        // capital in place but nothing moved
        let idle = RolloverInputs {
            wallet_balance: 1_000,
            initial_trader_balance: 1_000,
            vault_balance: 5_000,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            ..Default::default()
        };
        assert_eq!(settle_round(&idle).unwrap_err(), expected);
    }

    #[test]
    fn test_first_round_prices_at_par() {
        // 1000 deposited by the trader, 5000 by depositors, no trading yet
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 1_000,
            wallet_pending_deposits: 1_000,
            vault_balance: 5_000,
            vault_pending_deposits: 5_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.assets_per_share, INITIAL_PRICE_PER_SHARE);
        assert_eq!(outcome.minted_shares, 5_000);
        assert_eq!(outcome.next_initial_trader_balance, 1_000);
        assert_eq!(outcome.next_initial_vault_balance, 5_000);
        assert_eq!(outcome.ratio_proportions, 5 * ONE);
        assert_eq!(outcome.trader_profit, 0);
        assert_eq!(outcome.vault_profit, 0);
    }

    #[test]
    fn test_gain_raises_price_for_new_deposits() {
        // 200 shares outstanding backed by 200, trading lifts the pool to 220,
        // and two depositors queue 100 each in the same round.
        let outcome = settle_round(&RolloverInputs {
            vault_balance: 420,
            vault_pending_deposits: 200,
            initial_vault_balance: 200,
            share_supply: 200,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.assets_per_share, 11 * ONE / 10);
        // 100 / 1.1 = 90.9 each, minted as one aggregate
        assert_eq!(outcome.minted_shares, 181);
        assert_eq!(outcome.after_round_vault_balance, 220);
        assert_eq!(outcome.vault_profit, 20);
        assert_eq!(outcome.next_initial_vault_balance, 420);
    }

    #[test]
    fn test_withdrawals_redeem_at_new_price() {
        let outcome = settle_round(&RolloverInputs {
            vault_balance: 330,
            initial_vault_balance: 300,
            vault_pending_withdraw_shares: 100,
            share_supply: 300,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.assets_per_share, 11 * ONE / 10);
        assert_eq!(outcome.burned_shares, 100);
        assert_eq!(outcome.redeemed_assets, 110);
        assert_eq!(outcome.processed_withdraw_assets, 110);
        assert_eq!(outcome.next_initial_vault_balance, 220);
    }

    #[test]
    fn test_claimable_withdrawals_are_excluded_from_pool() {
        // 110 already processed and waiting to be claimed, must not inflate the price
        let outcome = settle_round(&RolloverInputs {
            vault_balance: 330,
            vault_processed_withdraw_assets: 110,
            initial_vault_balance: 200,
            vault_pending_deposits: 10,
            share_supply: 200,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.after_round_vault_balance, 210);
        assert_eq!(outcome.assets_per_share, 21 * ONE / 20);
        assert_eq!(outcome.processed_withdraw_assets, 110);
    }

    #[test]
    fn test_profit_split_follows_capital() {
        // trader 1000 / vault 5000, combined gain 600
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 1_100,
            initial_trader_balance: 1_000,
            vault_balance: 5_500,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.trader_profit, 100);
        assert_eq!(outcome.vault_profit, 500);
        assert_eq!(outcome.trader_payout, 0);
        assert_eq!(outcome.next_initial_trader_balance, 1_100);
    }

    #[test]
    fn test_losses_split_as_well() {
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 900,
            initial_trader_balance: 1_000,
            vault_balance: 4_500,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            performance_fee_bps: 2_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.trader_profit, -100);
        assert_eq!(outcome.vault_profit, -500);
        assert_eq!(outcome.performance_fee, 0);
        assert_eq!(outcome.assets_per_share, 9 * ONE / 10);
    }

    #[test]
    fn test_performance_fee_moves_to_wallet() {
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 1_000,
            initial_trader_balance: 1_000,
            vault_balance: 5_500,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            performance_fee_bps: 2_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.performance_fee, 100);
        assert_eq!(outcome.assets_per_share, 108 * ONE / 100);
        assert_eq!(outcome.next_initial_vault_balance, 5_400);
        assert_eq!(outcome.next_initial_trader_balance, 1_100);
    }

    #[test]
    fn test_trader_withdrawal_takes_profit_along() {
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 1_100,
            initial_trader_balance: 1_000,
            wallet_pending_withdrawals: 300,
            vault_balance: 5_500,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.trader_payout, 400);
        assert_eq!(outcome.next_initial_trader_balance, 700);
        assert_eq!(outcome.ratio_proportions, 5_500 * ONE / 700);
    }

    #[test]
    fn test_trader_payout_is_capped_by_balance() {
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 600,
            initial_trader_balance: 1_000,
            wallet_pending_withdrawals: 1_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.trader_payout, 600);
        assert_eq!(outcome.next_initial_trader_balance, 0);
        assert_eq!(outcome.ratio_proportions, 0);
    }

    #[test]
    fn test_wiped_out_pool_cannot_price_deposits() {
        let inputs = RolloverInputs {
            vault_balance: 50,
            vault_pending_deposits: 50,
            initial_vault_balance: 100,
            share_supply: 100,
            ..Default::default()
        };
        let expected: Error = ErrorCode::ZeroPricePerShare.into();
        assert_eq!(settle_round(&inputs).unwrap_err(), expected);
    }

    #[test]
    fn test_conservation_across_rounds() {
        // Chain three rollovers and check shares * price never exceeds the pool.
        let mut supply = 0u64;
        let mut initial_vault = 0u64;
        let mut processed = 0u64;
        let mut balance = 0u64;

        let rounds: [(u64, i64, u64); 3] = [(1_000, 0, 0), (333, 170, 0), (0, -45, 400)];
        for (deposit, pnl, withdraw_shares) in rounds {
            balance = (balance as i64 + pnl) as u64 + deposit;
            let outcome = settle_round(&RolloverInputs {
                vault_balance: balance,
                vault_pending_deposits: deposit,
                vault_pending_withdraw_shares: withdraw_shares,
                vault_processed_withdraw_assets: processed,
                initial_vault_balance: initial_vault,
                share_supply: supply,
                ..Default::default()
            })
            .unwrap();

            supply = supply + outcome.minted_shares - outcome.burned_shares;
            processed = outcome.processed_withdraw_assets;
            initial_vault = outcome.next_initial_vault_balance;

            let backing = assets_from_shares(supply, outcome.assets_per_share).unwrap();
            assert!(backing <= initial_vault);
            // dust is bounded by one unit per conversion in this round
            assert!(initial_vault - backing <= 2);
        }
    }

    #[test]
    fn test_open_positions_count_at_cost_in_share_price() {
        // 5000 shares, 1500 of the 5000 pool sits in an open position, 1000 queued
        let outcome = settle_round(&RolloverInputs {
            vault_balance: 4_500,
            vault_pending_deposits: 1_000,
            vault_deployed_collateral: 1_500,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.assets_per_share, ONE);
        assert_eq!(outcome.minted_shares, 1_000);
        assert_eq!(outcome.vault_profit, 0);
        assert_eq!(outcome.next_initial_vault_balance, 6_000);
    }

    #[test]
    fn test_fully_deployed_vault_still_rolls_over() {
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 100,
            wallet_pending_deposits: 100,
            vault_balance: 0,
            vault_deployed_collateral: 5_000,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            performance_fee_bps: 2_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.assets_per_share, ONE);
        assert_eq!(outcome.performance_fee, 0);
        assert_eq!(outcome.next_initial_trader_balance, 100);
    }

    #[test]
    fn test_fee_and_payout_come_from_liquid_assets_only() {
        // vault gained 500 but only 50 is liquid, the trader's capital is all deployed
        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 0,
            wallet_deployed_collateral: 1_000,
            initial_trader_balance: 1_000,
            wallet_pending_withdrawals: 400,
            vault_balance: 50,
            vault_deployed_collateral: 5_450,
            initial_vault_balance: 5_000,
            share_supply: 5_000,
            performance_fee_bps: 2_000,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(outcome.performance_fee, 50);
        assert_eq!(outcome.trader_payout, 50);
        assert_eq!(outcome.next_initial_trader_balance, 1_000);
        assert_eq!(outcome.assets_per_share, 109 * ONE / 100);
    }

    #[test]
    fn test_spent_pending_deposits_are_reported() {
        let inputs = RolloverInputs {
            wallet_balance: 300,
            wallet_pending_deposits: 500,
            initial_trader_balance: 1_000,
            ..Default::default()
        };
        let expected: Error = ErrorCode::InsufficientAssets.into();
        assert_eq!(settle_round(&inputs).unwrap_err(), expected);
    }
}
