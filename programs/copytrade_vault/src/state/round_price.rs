use anchor_lang::prelude::*;

use crate::errors::ErrorCode;

/// Assets-per-share of a closed round, written once at rollover.
/// PDA of `[ROUND_PRICE_SEED, vault, round.to_le_bytes()]`.
#[account]
pub struct RoundPrice {
    pub vault: Pubkey,
    pub round: u64,
    /// 1e18 fixed-point.
    pub assets_per_share: u128,
    pub bump: u8,
}

impl RoundPrice {
    // 8 discriminator + 32 vault + 8 round + 16 price + 1 bump
    pub const SPACE: usize = 8 + 32 + 8 + 16 + 1;

    /// Price for `round` of `vault`, if the caller supplied the matching account.
    /// A supplied account for another vault or round is an error, not a silent miss.
    pub fn lookup(price: Option<&RoundPrice>, vault: &Pubkey, round: u64) -> Result<Option<u128>> {
        match price {
            None => Ok(None),
            Some(p) => {
                require!(
                    p.vault == *vault && p.round == round,
                    ErrorCode::InvalidRoundPrice
                );
                Ok(Some(p.assets_per_share))
            }
        }
    }
}
