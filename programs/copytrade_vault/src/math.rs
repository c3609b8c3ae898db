//! Fixed-point share/asset conversions.
//!
//! Prices are assets-per-share scaled by [`PRICE_PRECISION`]. Every conversion
//! floors, so rounding dust always stays with the vault.

use anchor_lang::prelude::*;

use crate::constants::{BPS_DENOMINATOR, INITIAL_PRICE_PER_SHARE, PRICE_PRECISION};
use crate::errors::ErrorCode;

pub fn shares_from_assets(assets: u64, price_per_share: u128) -> Result<u64> {
    require!(price_per_share > 0, ErrorCode::ZeroPricePerShare);
    let shares = (assets as u128)
        .checked_mul(PRICE_PRECISION)
        .ok_or(ErrorCode::MathOverflow)?
        .checked_div(price_per_share)
        .ok_or(ErrorCode::ZeroPricePerShare)?;
    to_u64(shares)
}

pub fn assets_from_shares(shares: u64, price_per_share: u128) -> Result<u64> {
    require!(price_per_share > 0, ErrorCode::ZeroPricePerShare);
    let assets = (shares as u128)
        .checked_mul(price_per_share)
        .ok_or(ErrorCode::MathOverflow)?
        / PRICE_PRECISION;
    to_u64(assets)
}

/// Price of one share given the assets backing the pool.
/// With no shares outstanding the pool is priced at par.
pub fn price_per_share(pool_assets: u64, shares_outstanding: u64) -> Result<u128> {
    if shares_outstanding == 0 {
        return Ok(INITIAL_PRICE_PER_SHARE);
    }
    (pool_assets as u128)
        .checked_mul(PRICE_PRECISION)
        .ok_or(ErrorCode::MathOverflow)?
        .checked_div(shares_outstanding as u128)
        .ok_or_else(|| error!(ErrorCode::MathOverflow))
}

/// `numerator / denominator` as a 1e18 fixed-point ratio; zero when there is nothing to divide by.
pub fn ratio(numerator: u64, denominator: u64) -> Result<u128> {
    if denominator == 0 {
        return Ok(0);
    }
    Ok((numerator as u128)
        .checked_mul(PRICE_PRECISION)
        .ok_or(ErrorCode::MathOverflow)?
        / denominator as u128)
}

pub fn scale_by_ratio(amount: u64, ratio: u128) -> Result<u64> {
    let scaled = (amount as u128)
        .checked_mul(ratio)
        .ok_or(ErrorCode::MathOverflow)?
        / PRICE_PRECISION;
    to_u64(scaled)
}

pub fn apply_bps(amount: u64, bps: u16) -> Result<u64> {
    let value = (amount as u128)
        .checked_mul(bps as u128)
        .ok_or(ErrorCode::MathOverflow)?
        / BPS_DENOMINATOR as u128;
    to_u64(value)
}

fn to_u64(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| error!(ErrorCode::MathOverflow))
}
