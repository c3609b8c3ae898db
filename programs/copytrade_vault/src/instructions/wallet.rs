use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::events::*;
use crate::instructions::transfers::{burn_shares, mint_shares, transfer_tokens};
use crate::round::{settle_round, RolloverInputs};
use crate::state::*;

pub fn handle_initialize_trader_wallet(ctx: Context<InitializeTraderWallet>) -> Result<()> {
    let trader = ctx.accounts.trader.key();
    require!(
        AllowListEntry::is_allowed(&ctx.accounts.trader_allowance, Role::Trader, &trader),
        ErrorCode::TraderNotAllowed
    );

    let wallet = &mut ctx.accounts.trader_wallet;
    wallet.trader = trader;
    wallet.seed = trader;
    wallet.asset_mint = ctx.accounts.asset_mint.key();
    wallet.users_vault = Pubkey::default();
    wallet.bump = ctx.bumps.trader_wallet;
    wallet.current_round = 0;
    wallet.adapters = AdapterSet::default();

    msg!("Trader wallet created for {} with asset {}", trader, wallet.asset_mint);
    Ok(())
}

pub fn handle_initialize_users_vault(ctx: Context<InitializeUsersVault>) -> Result<()> {
    ctx.accounts
        .trader_wallet
        .require_trader(&ctx.accounts.trader.key())?;

    let wallet_key = ctx.accounts.trader_wallet.key();
    let vault_key = ctx.accounts.users_vault.key();

    let vault = &mut ctx.accounts.users_vault;
    vault.trader_wallet = wallet_key;
    vault.asset_mint = ctx.accounts.asset_mint.key();
    vault.share_mint = ctx.accounts.share_mint.key();
    vault.bump = ctx.bumps.users_vault;
    vault.share_mint_bump = ctx.bumps.share_mint;
    // joins the wallet's round so rollovers stay in lockstep
    vault.current_round = ctx.accounts.trader_wallet.current_round;

    ctx.accounts.trader_wallet.users_vault = vault_key;

    msg!("Users vault {} linked to wallet {}", vault_key, wallet_key);
    Ok(())
}

pub fn handle_set_trader(ctx: Context<SetTrader>, new_trader: Pubkey) -> Result<()> {
    ctx.accounts.validate(new_trader)?;

    let wallet = &mut ctx.accounts.trader_wallet;
    let previous = wallet.trader;
    wallet.trader = new_trader;
    msg!("Trader changed from {} to {}", previous, new_trader);

    emit!(TraderChanged {
        wallet: wallet.key(),
        previous,
        trader: new_trader,
    });
    Ok(())
}

pub fn handle_add_adapter_to_use(ctx: Context<ManageWalletAdapters>, protocol_id: u8) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    accounts.trader_wallet.require_trader(&accounts.trader.key())?;
    accounts
        .trader_wallet
        .add_adapter_to_use(protocol_id, &*accounts.adapters_registry)?;
    msg!("Adapter {} added", protocol_id);

    emit!(AdapterAdded {
        wallet: accounts.trader_wallet.key(),
        protocol_id,
    });
    Ok(())
}

pub fn handle_remove_adapter_to_use(ctx: Context<ManageWalletAdapters>, protocol_id: u8) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    accounts.trader_wallet.require_trader(&accounts.trader.key())?;
    accounts.trader_wallet.remove_adapter_to_use(protocol_id)?;
    msg!("Adapter {} removed", protocol_id);

    emit!(AdapterRemoved {
        wallet: accounts.trader_wallet.key(),
        protocol_id,
    });
    Ok(())
}

pub fn handle_trader_deposit(ctx: Context<TraderDeposit>, amount: u64) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    accounts.trader_wallet.require_trader(&accounts.trader.key())?;
    accounts.trader_wallet.record_deposit(amount)?;

    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.trader_asset_account.to_account_info(),
        accounts.wallet_asset_account.to_account_info(),
        accounts.trader.to_account_info(),
        &[],
        amount,
    )?;

    let round = accounts.trader_wallet.current_round;
    msg!("Trader deposited {} into round {}", amount, round);
    emit!(TraderDepositRecorded {
        wallet: accounts.trader_wallet.key(),
        trader: accounts.trader.key(),
        amount,
        round,
    });
    Ok(())
}

pub fn handle_trader_withdraw_request(ctx: Context<TraderWithdrawRequest>, amount: u64) -> Result<()> {
    let wallet = &mut ctx.accounts.trader_wallet;
    wallet.require_trader(&ctx.accounts.trader.key())?;
    wallet.record_withdraw_request(amount)?;

    msg!("Trader requested {} in round {}", amount, wallet.current_round);
    emit!(TraderWithdrawRequested {
        wallet: wallet.key(),
        trader: wallet.trader,
        amount,
        round: wallet.current_round,
    });
    Ok(())
}

/// Close the current round on both the wallet and its users vault.
pub fn handle_rollover(ctx: Context<Rollover>) -> Result<()> {
    let price_bump = ctx.bumps.round_price;
    let accounts = &mut *ctx.accounts;
    accounts.trader_wallet.require_trader(&accounts.trader.key())?;

    let wallet_key = accounts.trader_wallet.key();
    let vault_key = accounts.users_vault.key();
    let closing_round = accounts.trader_wallet.current_round;
    require!(
        closing_round == accounts.users_vault.current_round,
        ErrorCode::RoundMismatch
    );

    let wallet = &accounts.trader_wallet;
    let vault = &accounts.users_vault;
    let outcome = settle_round(&RolloverInputs {
        wallet_balance: accounts.wallet_asset_account.amount,
        wallet_pending_deposits: wallet.cumulative_pending_deposits,
        wallet_pending_withdrawals: wallet.cumulative_pending_withdrawals,
        initial_trader_balance: wallet.initial_trader_balance,
        wallet_deployed_collateral: wallet.deployed_collateral,
        vault_balance: accounts.vault_asset_account.amount,
        vault_pending_deposits: vault.pending_deposit_assets,
        vault_pending_withdraw_shares: vault.pending_withdraw_shares,
        vault_processed_withdraw_assets: vault.processed_withdraw_assets,
        initial_vault_balance: vault.initial_vault_balance,
        vault_deployed_collateral: vault.deployed_collateral,
        share_supply: accounts.share_mint.supply,
        performance_fee_bps: accounts.global_config.performance_fee_bps,
    })?;

    let round_price = &mut accounts.round_price;
    round_price.vault = vault_key;
    round_price.round = closing_round;
    round_price.assets_per_share = outcome.assets_per_share;
    round_price.bump = price_bump;

    accounts
        .users_vault
        .rollover_from_trader(&wallet_key, closing_round, &outcome)?;
    accounts.trader_wallet.apply_rollover(&outcome)?;

    let vault_bump = [accounts.users_vault.bump];
    let vault_seeds: &[&[u8]] = &[USERS_VAULT_SEED, wallet_key.as_ref(), &vault_bump];
    let wallet_seed = accounts.trader_wallet.seed;
    let wallet_bump = [accounts.trader_wallet.bump];
    let wallet_seeds: &[&[u8]] = &[TRADER_WALLET_SEED, wallet_seed.as_ref(), &wallet_bump];

    mint_shares(
        accounts.token_program.to_account_info(),
        accounts.share_mint.to_account_info(),
        accounts.vault_share_account.to_account_info(),
        accounts.users_vault.to_account_info(),
        &[vault_seeds],
        outcome.minted_shares,
    )?;
    burn_shares(
        accounts.token_program.to_account_info(),
        accounts.share_mint.to_account_info(),
        accounts.vault_share_account.to_account_info(),
        accounts.users_vault.to_account_info(),
        &[vault_seeds],
        outcome.burned_shares,
    )?;
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.vault_asset_account.to_account_info(),
        accounts.wallet_asset_account.to_account_info(),
        accounts.users_vault.to_account_info(),
        &[vault_seeds],
        outcome.performance_fee,
    )?;
    transfer_tokens(
        accounts.token_program.to_account_info(),
        accounts.wallet_asset_account.to_account_info(),
        accounts.trader_asset_account.to_account_info(),
        accounts.trader_wallet.to_account_info(),
        &[wallet_seeds],
        outcome.trader_payout,
    )
    .map_err(|_| error!(ErrorCode::SendToTraderFailed))?;

    msg!(
        "Round {} closed at {} assets/share. Minted {}, burned {}, fee {}, payout {}",
        closing_round,
        outcome.assets_per_share,
        outcome.minted_shares,
        outcome.burned_shares,
        outcome.performance_fee,
        outcome.trader_payout
    );
    emit!(RolloverExecuted {
        wallet: wallet_key,
        vault: vault_key,
        closed_round: closing_round,
        assets_per_share: outcome.assets_per_share,
        minted_shares: outcome.minted_shares,
        burned_shares: outcome.burned_shares,
        trader_profit: outcome.trader_profit,
        vault_profit: outcome.vault_profit,
        performance_fee: outcome.performance_fee,
        trader_payout: outcome.trader_payout,
    });
    Ok(())
}

#[derive(Accounts)]
pub struct InitializeTraderWallet<'info> {
    #[account(mut)]
    pub trader: Signer<'info>,

    /// CHECK: allow-list PDA for (Trader, trader); read by AllowListEntry::is_allowed.
    pub trader_allowance: UncheckedAccount<'info>,

    pub asset_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = trader,
        space = TraderWallet::SPACE,
        seeds = [TRADER_WALLET_SEED, trader.key().as_ref()],
        bump
    )]
    pub trader_wallet: Account<'info, TraderWallet>,

    #[account(
        init,
        payer = trader,
        associated_token::mint = asset_mint,
        associated_token::authority = trader_wallet
    )]
    pub wallet_asset_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeUsersVault<'info> {
    #[account(mut)]
    pub trader: Signer<'info>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump,
        has_one = asset_mint
    )]
    pub trader_wallet: Box<Account<'info, TraderWallet>>,

    pub asset_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = trader,
        space = UsersVault::SPACE,
        seeds = [USERS_VAULT_SEED, trader_wallet.key().as_ref()],
        bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        init,
        payer = trader,
        seeds = [SHARE_MINT_SEED, users_vault.key().as_ref()],
        bump,
        mint::decimals = asset_mint.decimals,
        mint::authority = users_vault
    )]
    pub share_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = trader,
        associated_token::mint = asset_mint,
        associated_token::authority = users_vault
    )]
    pub vault_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        payer = trader,
        associated_token::mint = share_mint,
        associated_token::authority = users_vault
    )]
    pub vault_share_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetTrader<'info> {
    pub trader: Signer<'info>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump
    )]
    pub trader_wallet: Account<'info, TraderWallet>,

    /// CHECK: allow-list PDA for (Trader, new_trader); read by AllowListEntry::is_allowed.
    pub new_trader_allowance: UncheckedAccount<'info>,
}

impl<'info> SetTrader<'info> {
    pub fn validate(&self, new_trader: Pubkey) -> Result<()> {
        self.trader_wallet.require_trader(&self.trader.key())?;
        require!(new_trader != Pubkey::default(), ErrorCode::ZeroAddress);
        require!(
            AllowListEntry::is_allowed(&self.new_trader_allowance, Role::Trader, &new_trader),
            ErrorCode::TraderNotAllowed
        );
        Ok(())
    }
}

#[derive(Accounts)]
pub struct ManageWalletAdapters<'info> {
    pub trader: Signer<'info>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump
    )]
    pub trader_wallet: Account<'info, TraderWallet>,

    #[account(
        seeds = [ADAPTERS_REGISTRY_SEED],
        bump = adapters_registry.bump
    )]
    pub adapters_registry: Account<'info, AdaptersRegistry>,
}

#[derive(Accounts)]
pub struct TraderDeposit<'info> {
    pub trader: Signer<'info>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump
    )]
    pub trader_wallet: Account<'info, TraderWallet>,

    #[account(
        mut,
        token::mint = trader_wallet.asset_mint,
        token::authority = trader
    )]
    pub trader_asset_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        associated_token::mint = trader_wallet.asset_mint,
        associated_token::authority = trader_wallet
    )]
    pub wallet_asset_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct TraderWithdrawRequest<'info> {
    pub trader: Signer<'info>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump
    )]
    pub trader_wallet: Account<'info, TraderWallet>,
}

#[derive(Accounts)]
pub struct Rollover<'info> {
    #[account(mut)]
    pub trader: Signer<'info>,

    #[account(
        seeds = [GLOBAL_CONFIG_SEED],
        bump = global_config.bump
    )]
    pub global_config: Account<'info, GlobalConfig>,

    #[account(
        mut,
        seeds = [TRADER_WALLET_SEED, trader_wallet.seed.as_ref()],
        bump = trader_wallet.bump
    )]
    pub trader_wallet: Box<Account<'info, TraderWallet>>,

    #[account(
        mut,
        seeds = [USERS_VAULT_SEED, users_vault.trader_wallet.as_ref()],
        bump = users_vault.bump
    )]
    pub users_vault: Box<Account<'info, UsersVault>>,

    #[account(
        mut,
        address = users_vault.share_mint
    )]
    pub share_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = trader,
        space = RoundPrice::SPACE,
        seeds = [ROUND_PRICE_SEED, users_vault.key().as_ref(), &users_vault.current_round.to_le_bytes()],
        bump
    )]
    pub round_price: Box<Account<'info, RoundPrice>>,

    #[account(
        mut,
        associated_token::mint = trader_wallet.asset_mint,
        associated_token::authority = trader_wallet
    )]
    pub wallet_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = users_vault.asset_mint,
        associated_token::authority = users_vault
    )]
    pub vault_asset_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = users_vault.share_mint,
        associated_token::authority = users_vault
    )]
    pub vault_share_account: Box<Account<'info, TokenAccount>>,

    /// Receives the trader payout.
    #[account(
        mut,
        token::mint = trader_wallet.asset_mint,
        token::authority = trader
    )]
    pub trader_asset_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}
