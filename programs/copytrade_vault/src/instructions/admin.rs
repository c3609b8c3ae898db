use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::events::*;
use crate::state::*;

pub fn handle_initialize_global_config(ctx: Context<InitializeGlobalConfig>) -> Result<()> {
    let config = &mut ctx.accounts.global_config;
    config.admin = ctx.accounts.admin.key();
    config.performance_fee_bps = 0;
    config.bump = ctx.bumps.global_config;
    msg!("Global Config initialized. Admin: {}", config.admin);
    Ok(())
}

pub fn handle_set_admin(ctx: Context<AdminGlobalConfig>, new_admin: Pubkey) -> Result<()> {
    require!(new_admin != Pubkey::default(), ErrorCode::ZeroAddress);
    let config = &mut ctx.accounts.global_config;
    let previous = config.admin;
    config.admin = new_admin;
    msg!("Admin changed from {} to {}", previous, new_admin);

    emit!(AdminChanged {
        previous,
        admin: new_admin,
    });
    Ok(())
}

pub fn handle_set_performance_fee(ctx: Context<AdminGlobalConfig>, fee_bps: u16) -> Result<()> {
    let config = &mut ctx.accounts.global_config;
    let previous_bps = config.performance_fee_bps;
    config.set_performance_fee(fee_bps)?;
    msg!("Performance fee set to {} bps", fee_bps);

    emit!(PerformanceFeeUpdated {
        previous_bps,
        fee_bps,
    });
    Ok(())
}

pub fn handle_initialize_adapters_registry(ctx: Context<InitializeAdaptersRegistry>) -> Result<()> {
    let registry = &mut ctx.accounts.adapters_registry;
    registry.bump = ctx.bumps.adapters_registry;
    registry.entries = Vec::new();
    msg!("Adapters registry initialized");
    Ok(())
}

pub fn handle_register_adapter(ctx: Context<ManageAdapters>, protocol_id: u8, program: Pubkey) -> Result<()> {
    ctx.accounts.adapters_registry.register(protocol_id, program)?;
    msg!("Registered adapter {} for protocol {}", program, protocol_id);

    emit!(AdapterRegistered {
        protocol_id,
        program,
        allowed: true,
    });
    Ok(())
}

pub fn handle_set_adapter_allowed(ctx: Context<ManageAdapters>, protocol_id: u8, allowed: bool) -> Result<()> {
    let program = ctx.accounts.adapters_registry.set_allowed(protocol_id, allowed)?;
    msg!("Protocol {} allowed: {}", protocol_id, allowed);

    emit!(AdapterRegistered {
        protocol_id,
        program,
        allowed,
    });
    Ok(())
}

pub fn handle_set_allowance(ctx: Context<SetAllowance>, role: Role, address: Pubkey, allowed: bool) -> Result<()> {
    require!(address != Pubkey::default(), ErrorCode::ZeroAddress);
    let entry = &mut ctx.accounts.allow_list_entry;
    entry.role = role;
    entry.address = address;
    entry.allowed = allowed;
    entry.bump = ctx.bumps.allow_list_entry;
    msg!("Allowance for {:?} {} set to {}", role, address, allowed);

    emit!(AllowanceUpdated {
        role,
        address,
        allowed,
    });
    Ok(())
}

#[derive(Accounts)]
pub struct InitializeGlobalConfig<'info> {
    #[account(
        init,
        payer = admin,
        space = GlobalConfig::SPACE,
        seeds = [GLOBAL_CONFIG_SEED],
        bump
    )]
    pub global_config: Account<'info, GlobalConfig>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct AdminGlobalConfig<'info> {
    #[account(
        mut,
        seeds = [GLOBAL_CONFIG_SEED],
        bump = global_config.bump,
        has_one = admin @ ErrorCode::Unauthorized
    )]
    pub global_config: Account<'info, GlobalConfig>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct InitializeAdaptersRegistry<'info> {
    #[account(
        seeds = [GLOBAL_CONFIG_SEED],
        bump = global_config.bump,
        has_one = admin @ ErrorCode::Unauthorized
    )]
    pub global_config: Account<'info, GlobalConfig>,
    #[account(
        init,
        payer = admin,
        space = AdaptersRegistry::SPACE,
        seeds = [ADAPTERS_REGISTRY_SEED],
        bump
    )]
    pub adapters_registry: Account<'info, AdaptersRegistry>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ManageAdapters<'info> {
    #[account(
        seeds = [GLOBAL_CONFIG_SEED],
        bump = global_config.bump,
        has_one = admin @ ErrorCode::Unauthorized
    )]
    pub global_config: Account<'info, GlobalConfig>,
    #[account(
        mut,
        seeds = [ADAPTERS_REGISTRY_SEED],
        bump = adapters_registry.bump
    )]
    pub adapters_registry: Account<'info, AdaptersRegistry>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
#[instruction(role: Role, address: Pubkey)]
pub struct SetAllowance<'info> {
    #[account(
        seeds = [GLOBAL_CONFIG_SEED],
        bump = global_config.bump,
        has_one = admin @ ErrorCode::Unauthorized
    )]
    pub global_config: Account<'info, GlobalConfig>,
    #[account(
        init_if_needed,
        payer = admin,
        space = AllowListEntry::SPACE,
        seeds = [ALLOW_LIST_SEED, &[role as u8], address.as_ref()],
        bump
    )]
    pub allow_list_entry: Account<'info, AllowListEntry>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}
