use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::events::*;
use crate::instructions::transfers::transfer_tokens;
use crate::state::*;

/// Price of the stored round of a pending entry, only when that round is already closed.
fn stored_round_price(
    price: &Option<Account<RoundPrice>>,
    vault: &Pubkey,
    needs_price: bool,
    round: u64,
) -> Result<Option<u128>> {
    if !needs_price {
        return Ok(None);
    }
    RoundPrice::lookup(price.as_deref(), vault, round)
}

fn open_position(position: &mut DepositorPosition, vault: Pubkey, owner: Pubkey, bump: u8) {
    if position.owner == Pubkey::default() {
        position.vault = vault;
        position.owner = owner;
        position.bump = bump;
    }
}

pub fn handle_user_deposit(ctx: Context<UserDeposit>, amount: u64) -> Result<()> {
    let depositor = ctx.accounts.depositor.key();
    require!(
        AllowListEntry::is_allowed(&ctx.accounts.investor_allowance, Role::Investor, &depositor),
        ErrorCode::UserNotAllowed
    );

    let vault_key = ctx.accounts.users_vault.key();
    let position_bump = ctx.bumps.position;
    let accounts = &mut *ctx.accounts;
    open_position(&mut accounts.position, vault_key, depositor, position_bump);

    let current_round = accounts.users_vault.current_round;
    let deposit = accounts.position.deposit;
    let price = stored_round_price(
        &accounts.deposit_round_price,
        &vault_key,
        deposit.needs_price(current_round),
        deposit.round,
    )?;
    accounts
        .users_vault
        .record_deposit(&mut accounts.position, amount, price)?;

    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.depositor_asset_account.to_account_info(),
        accounts.vault_asset_account.to_account_info(),
        accounts.depositor.to_account_info(),
        &[],
        amount,
    )?;

    msg!("Deposited {} into round {}", amount, current_round);
    emit!(DepositRecorded {
        vault: vault_key,
        depositor,
        amount,
        round: current_round,
    });
    Ok(())
}

pub fn handle_preview_shares(ctx: Context<PreviewPosition>) -> Result<u64> {
    let vault = &ctx.accounts.users_vault;
    let deposit = ctx.accounts.position.deposit;
    let price = stored_round_price(
        &ctx.accounts.round_price,
        &vault.key(),
        deposit.needs_price(vault.current_round),
        deposit.round,
    )?;
    deposit.preview(vault.current_round, price)
}

pub fn handle_claim_shares(ctx: Context<ClaimShares>, amount: u64) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.users_vault.key();
    let deposit = accounts.position.deposit;
    let price = stored_round_price(
        &accounts.deposit_round_price,
        &vault_key,
        deposit.needs_price(accounts.users_vault.current_round),
        deposit.round,
    )?;
    accounts
        .users_vault
        .claim_shares(&mut accounts.position, amount, price)?;

    let wallet_key = accounts.users_vault.trader_wallet;
    let vault_bump = [accounts.users_vault.bump];
    let vault_seeds: &[&[u8]] = &[USERS_VAULT_SEED, wallet_key.as_ref(), &vault_bump];
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.vault_share_account.to_account_info(),
        accounts.receiver_share_account.to_account_info(),
        accounts.users_vault.to_account_info(),
        &[vault_seeds],
        amount,
    )?;

    msg!("Claimed {} shares", amount);
    emit!(SharesClaimed {
        vault: vault_key,
        depositor: accounts.depositor.key(),
        shares: amount,
        receiver: accounts.receiver_share_account.key(),
    });
    Ok(())
}

pub fn handle_withdraw_request(ctx: Context<WithdrawRequest>, shares: u64) -> Result<()> {
    let depositor = ctx.accounts.depositor.key();
    let vault_key = ctx.accounts.users_vault.key();
    let position_bump = ctx.bumps.position;
    let accounts = &mut *ctx.accounts;
    open_position(&mut accounts.position, vault_key, depositor, position_bump);

    let current_round = accounts.users_vault.current_round;
    let withdrawal = accounts.position.withdrawal;
    let price = stored_round_price(
        &accounts.withdrawal_round_price,
        &vault_key,
        withdrawal.needs_price(current_round),
        withdrawal.round,
    )?;
    let held_shares = accounts.depositor_share_account.amount;
    accounts.users_vault.record_withdraw_request(
        &mut accounts.position,
        shares,
        held_shares,
        price,
    )?;

    // escrowed in the vault until the next rollover burns them
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.depositor_share_account.to_account_info(),
        accounts.vault_share_account.to_account_info(),
        accounts.depositor.to_account_info(),
        &[],
        shares,
    )?;

    msg!("Requested withdrawal of {} shares in round {}", shares, current_round);
    emit!(WithdrawRequested {
        vault: vault_key,
        depositor,
        shares,
        round: current_round,
    });
    Ok(())
}

pub fn handle_preview_assets(ctx: Context<PreviewPosition>) -> Result<u64> {
    let vault = &ctx.accounts.users_vault;
    let withdrawal = ctx.accounts.position.withdrawal;
    let price = stored_round_price(
        &ctx.accounts.round_price,
        &vault.key(),
        withdrawal.needs_price(vault.current_round),
        withdrawal.round,
    )?;
    withdrawal.preview(vault.current_round, price)
}

pub fn handle_claim_assets(ctx: Context<ClaimAssets>, amount: u64) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    let vault_key = accounts.users_vault.key();
    let withdrawal = accounts.position.withdrawal;
    let price = stored_round_price(
        &accounts.withdrawal_round_price,
        &vault_key,
        withdrawal.needs_price(accounts.users_vault.current_round),
        withdrawal.round,
    )?;
    accounts
        .users_vault
        .claim_assets(&mut accounts.position, amount, price)?;

    let wallet_key = accounts.users_vault.trader_wallet;
    let vault_bump = [accounts.users_vault.bump];
    let vault_seeds: &[&[u8]] = &[USERS_VAULT_SEED, wallet_key.as_ref(), &vault_bump];
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.vault_asset_account.to_account_info(),
        accounts.receiver_asset_account.to_account_info(),
        accounts.users_vault.to_account_info(),
        &[vault_seeds],
        amount,
    )?;

    msg!("Claimed {} assets", amount);
    emit!(AssetsClaimed {
        vault: vault_key,
        depositor: accounts.depositor.key(),
        assets: amount,
        receiver: accounts.receiver_asset_account.key(),
    });
    Ok(())
}

#[derive(Accounts)]
pub struct UserDeposit<'info> {
    #[account(mut)]
    pub depositor: Signer<'info>,

    /// CHECK: allow-list PDA for (Investor, depositor); read by AllowListEntry::is_allowed.
    pub investor_allowance: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        init_if_needed,
        payer = depositor,
        space = DepositorPosition::SPACE,
        seeds = [DEPOSITOR_SEED, users_vault.key().as_ref(), depositor.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, DepositorPosition>>,

    /// Price of the round the pending deposit was recorded in, when that round is closed.
    pub deposit_round_price: Option<Account<'info, RoundPrice>>,

    #[account(
        mut,
        token::mint = users_vault.asset_mint,
        token::authority = depositor
    )]
    pub depositor_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = users_vault.asset_mint,
        associated_token::authority = users_vault
    )]
    pub vault_asset_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct PreviewPosition<'info> {
    #[account(
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Account<'info, UsersVault>,

    #[account(
        seeds = [DEPOSITOR_SEED, users_vault.key().as_ref(), position.owner.as_ref()],
        bump = position.bump
    )]
    pub position: Account<'info, DepositorPosition>,

    pub round_price: Option<Account<'info, RoundPrice>>,
}

#[derive(Accounts)]
pub struct ClaimShares<'info> {
    pub depositor: Signer<'info>,

    #[account(
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        mut,
        seeds = [DEPOSITOR_SEED, users_vault.key().as_ref(), depositor.key().as_ref()],
        bump = position.bump
    )]
    pub position: Box<Account<'info, DepositorPosition>>,

    pub deposit_round_price: Option<Account<'info, RoundPrice>>,

    #[account(
        mut,
        associated_token::mint = users_vault.share_mint,
        associated_token::authority = users_vault
    )]
    pub vault_share_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = users_vault.share_mint
    )]
    pub receiver_share_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct WithdrawRequest<'info> {
    #[account(mut)]
    pub depositor: Signer<'info>,

    #[account(
        mut,
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        init_if_needed,
        payer = depositor,
        space = DepositorPosition::SPACE,
        seeds = [DEPOSITOR_SEED, users_vault.key().as_ref(), depositor.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, DepositorPosition>>,

    pub withdrawal_round_price: Option<Account<'info, RoundPrice>>,

    #[account(
        mut,
        token::mint = users_vault.share_mint,
        token::authority = depositor
    )]
    pub depositor_share_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = users_vault.share_mint,
        associated_token::authority = users_vault
    )]
    pub vault_share_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ClaimAssets<'info> {
    pub depositor: Signer<'info>,

    #[account(
        mut,
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        mut,
        seeds = [DEPOSITOR_SEED, users_vault.key().as_ref(), depositor.key().as_ref()],
        bump = position.bump
    )]
    pub position: Box<Account<'info, DepositorPosition>>,

    pub withdrawal_round_price: Option<Account<'info, RoundPrice>>,

    #[account(
        mut,
        associated_token::mint = users_vault.asset_mint,
        associated_token::authority = users_vault
    )]
    pub vault_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = users_vault.asset_mint
    )]
    pub receiver_asset_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}
