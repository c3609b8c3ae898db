use anchor_lang::prelude::*;

pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod math;
pub mod replicator;
pub mod round;
pub mod state;

pub use constants::*;
pub use instructions::*;
pub use replicator::{AdapterOperation, AdapterResponse};
pub use state::*;

declare_id!("CTvau1tRep1icaXAu5HqF8v9oVZGq3kBfVh8hPdmQm2B");

#[program]
pub mod copytrade_vault {
    use super::*;

    // Admin

    pub fn initialize_global_config(ctx: Context<InitializeGlobalConfig>) -> Result<()> {
        instructions::admin::handle_initialize_global_config(ctx)
    }

    pub fn set_admin(ctx: Context<AdminGlobalConfig>, new_admin: Pubkey) -> Result<()> {
        instructions::admin::handle_set_admin(ctx, new_admin)
    }

    pub fn set_performance_fee(ctx: Context<AdminGlobalConfig>, fee_bps: u16) -> Result<()> {
        instructions::admin::handle_set_performance_fee(ctx, fee_bps)
    }

    pub fn initialize_adapters_registry(ctx: Context<InitializeAdaptersRegistry>) -> Result<()> {
        instructions::admin::handle_initialize_adapters_registry(ctx)
    }

    pub fn register_adapter(ctx: Context<ManageAdapters>, protocol_id: u8, program: Pubkey) -> Result<()> {
        instructions::admin::handle_register_adapter(ctx, protocol_id, program)
    }

    pub fn set_adapter_allowed(ctx: Context<ManageAdapters>, protocol_id: u8, allowed: bool) -> Result<()> {
        instructions::admin::handle_set_adapter_allowed(ctx, protocol_id, allowed)
    }

    pub fn set_allowance(ctx: Context<SetAllowance>, role: Role, address: Pubkey, allowed: bool) -> Result<()> {
        instructions::admin::handle_set_allowance(ctx, role, address, allowed)
    }

    // Trader wallet

    pub fn initialize_trader_wallet(ctx: Context<InitializeTraderWallet>) -> Result<()> {
        instructions::wallet::handle_initialize_trader_wallet(ctx)
    }

    pub fn initialize_users_vault(ctx: Context<InitializeUsersVault>) -> Result<()> {
        instructions::wallet::handle_initialize_users_vault(ctx)
    }

    pub fn set_trader(ctx: Context<SetTrader>, new_trader: Pubkey) -> Result<()> {
        instructions::wallet::handle_set_trader(ctx, new_trader)
    }

    pub fn add_adapter_to_use(ctx: Context<ManageWalletAdapters>, protocol_id: u8) -> Result<()> {
        instructions::wallet::handle_add_adapter_to_use(ctx, protocol_id)
    }

    pub fn remove_adapter_to_use(ctx: Context<ManageWalletAdapters>, protocol_id: u8) -> Result<()> {
        instructions::wallet::handle_remove_adapter_to_use(ctx, protocol_id)
    }

    pub fn trader_deposit(ctx: Context<TraderDeposit>, amount: u64) -> Result<()> {
        instructions::wallet::handle_trader_deposit(ctx, amount)
    }

    pub fn trader_withdraw_request(ctx: Context<TraderWithdrawRequest>, amount: u64) -> Result<()> {
        instructions::wallet::handle_trader_withdraw_request(ctx, amount)
    }

    pub fn execute_on_protocol<'info>(
        ctx: Context<'_, '_, 'info, 'info, ExecuteOnProtocol<'info>>,
        protocol_id: u8,
        operation: AdapterOperation,
        replicate: bool,
        trader_accounts_len: u8,
    ) -> Result<()> {
        instructions::execute::handle_execute_on_protocol(
            ctx,
            protocol_id,
            operation,
            replicate,
            trader_accounts_len,
        )
    }

    pub fn rollover(ctx: Context<Rollover>) -> Result<()> {
        instructions::wallet::handle_rollover(ctx)
    }

    // Users vault

    pub fn user_deposit(ctx: Context<UserDeposit>, amount: u64) -> Result<()> {
        instructions::vault::handle_user_deposit(ctx, amount)
    }

    pub fn preview_shares(ctx: Context<PreviewPosition>) -> Result<u64> {
        instructions::vault::handle_preview_shares(ctx)
    }

    pub fn claim_shares(ctx: Context<ClaimShares>, amount: u64) -> Result<()> {
        instructions::vault::handle_claim_shares(ctx, amount)
    }

    pub fn withdraw_request(ctx: Context<WithdrawRequest>, shares: u64) -> Result<()> {
        instructions::vault::handle_withdraw_request(ctx, shares)
    }

    pub fn preview_assets(ctx: Context<PreviewPosition>) -> Result<u64> {
        instructions::vault::handle_preview_assets(ctx)
    }

    pub fn claim_assets(ctx: Context<ClaimAssets>, amount: u64) -> Result<()> {
        instructions::vault::handle_claim_assets(ctx, amount)
    }
}
