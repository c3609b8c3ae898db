use anchor_lang::prelude::*;

use crate::constants::MAX_PERFORMANCE_FEE_BPS;
use crate::errors::ErrorCode;

/// Global configuration for the protocol.
/// Admin-controlled settings for fees.
#[account]
pub struct GlobalConfig {
    pub admin: Pubkey,
    /// Share of the users vault's positive round P&L paid to the trader wallet.
    pub performance_fee_bps: u16,
    pub bump: u8,
}

impl GlobalConfig {
    // 8 discriminator + 32 admin + 2 performance_fee + 1 bump
    pub const SPACE: usize = 8 + 32 + 2 + 1;

    pub fn set_performance_fee(&mut self, fee_bps: u16) -> Result<()> {
        require!(fee_bps <= MAX_PERFORMANCE_FEE_BPS, ErrorCode::FeeRateError);
        self.performance_fee_bps = fee_bps;
        Ok(())
    }
}
