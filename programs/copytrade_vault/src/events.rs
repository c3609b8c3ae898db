use anchor_lang::prelude::*;

use crate::state::Role;

#[event]
pub struct DepositRecorded {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub amount: u64,
    pub round: u64,
}

#[event]
pub struct WithdrawRequested {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub shares: u64,
    pub round: u64,
}

#[event]
pub struct SharesClaimed {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub shares: u64,
    pub receiver: Pubkey,
}

#[event]
pub struct AssetsClaimed {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub assets: u64,
    pub receiver: Pubkey,
}

#[event]
pub struct TraderDepositRecorded {
    pub wallet: Pubkey,
    pub trader: Pubkey,
    pub amount: u64,
    pub round: u64,
}

#[event]
pub struct TraderWithdrawRequested {
    pub wallet: Pubkey,
    pub trader: Pubkey,
    pub amount: u64,
    pub round: u64,
}

/// Emitted once per closed round, after both sides were updated.
#[event]
pub struct RolloverExecuted {
    pub wallet: Pubkey,
    pub vault: Pubkey,
    pub closed_round: u64,
    pub assets_per_share: u128,
    pub minted_shares: u64,
    pub burned_shares: u64,
    pub trader_profit: i64,
    pub vault_profit: i64,
    pub performance_fee: u64,
    pub trader_payout: u64,
}

#[event]
pub struct AdapterAdded {
    pub wallet: Pubkey,
    pub protocol_id: u8,
}

#[event]
pub struct AdapterRemoved {
    pub wallet: Pubkey,
    pub protocol_id: u8,
}

#[event]
pub struct AdapterRegistered {
    pub protocol_id: u8,
    pub program: Pubkey,
    pub allowed: bool,
}

#[event]
pub struct AllowanceUpdated {
    pub role: Role,
    pub address: Pubkey,
    pub allowed: bool,
}

#[event]
pub struct TraderChanged {
    pub wallet: Pubkey,
    pub previous: Pubkey,
    pub trader: Pubkey,
}

#[event]
pub struct AdminChanged {
    pub previous: Pubkey,
    pub admin: Pubkey,
}

#[event]
pub struct PerformanceFeeUpdated {
    pub previous_bps: u16,
    pub fee_bps: u16,
}

#[event]
pub struct OperationExecuted {
    pub wallet: Pubkey,
    pub protocol_id: u8,
    pub operation_id: u8,
    pub replicate: bool,
    pub trader_delta: i64,
    pub vault_delta: i64,
}
