use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program::{get_return_data, invoke_signed};
use anchor_spl::token::{Token, TokenAccount};

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::events::OperationExecuted;
use crate::replicator::{
    execute_plan, track_deployed, AdapterOperation, AdapterResponse, FreeBalances, Leg,
    LegExecutor, LegResult, ReplicationPlan,
};
use crate::state::*;

/// Run `operation` through the wallet's adapter for `protocol_id`, and mirror it on the
/// users vault when `replicate` is set.
///
/// `remaining_accounts[..trader_accounts_len]` are the adapter accounts of the wallet leg,
/// the rest belong to the vault leg.
pub fn handle_execute_on_protocol<'info>(
    ctx: Context<'_, '_, 'info, 'info, ExecuteOnProtocol<'info>>,
    protocol_id: u8,
    operation: AdapterOperation,
    replicate: bool,
    trader_accounts_len: u8,
) -> Result<()> {
    let accounts = &mut *ctx.accounts;
    accounts.trader_wallet.require_trader(&accounts.trader.key())?;

    let wallet_key = accounts.trader_wallet.key();
    let vault_key = accounts.users_vault.key();
    require_keys_eq!(
        accounts.users_vault.trader_wallet,
        wallet_key,
        ErrorCode::CallerNotAllowed
    );

    let adapter = accounts
        .trader_wallet
        .resolve_adapter(protocol_id, &**accounts.adapters_registry)?;
    require_keys_eq!(adapter, accounts.adapter_program.key(), ErrorCode::InvalidAdapter);

    // sized from the round-start snapshot before anything moves
    let free = FreeBalances {
        trader: accounts
            .trader_wallet
            .free_trading_balance(accounts.wallet_asset_account.amount),
        vault: accounts
            .users_vault
            .free_trading_balance(accounts.vault_asset_account.amount),
    };
    let plan = ReplicationPlan::new(
        adapter,
        operation,
        replicate,
        accounts.trader_wallet.ratio_proportions,
        free,
    )?;

    let split = trader_accounts_len as usize;
    require!(
        split <= ctx.remaining_accounts.len(),
        ErrorCode::InvalidOperation
    );
    let (wallet_leg_accounts, vault_leg_accounts) = ctx.remaining_accounts.split_at(split);

    let wallet_seed = accounts.trader_wallet.seed;
    let wallet_bump = [accounts.trader_wallet.bump];
    let wallet_seeds: &[&[u8]] = &[TRADER_WALLET_SEED, wallet_seed.as_ref(), &wallet_bump];
    let vault_bump = [accounts.users_vault.bump];
    let vault_seeds: &[&[u8]] = &[USERS_VAULT_SEED, wallet_key.as_ref(), &vault_bump];

    let mut executor = CpiLegExecutor {
        adapter_program: accounts.adapter_program.to_account_info(),
        wallet: LegAccounts {
            authority: wallet_key,
            asset_account: &mut accounts.wallet_asset_account,
            accounts: wallet_leg_accounts,
            signer_seeds: wallet_seeds,
        },
        vault: LegAccounts {
            authority: vault_key,
            asset_account: &mut accounts.vault_asset_account,
            accounts: vault_leg_accounts,
            signer_seeds: vault_seeds,
        },
    };
    let report = execute_plan(&plan, &mut executor)?;

    accounts.trader_wallet.deployed_collateral = track_deployed(
        accounts.trader_wallet.deployed_collateral,
        &plan.trader_operation,
        report.trader_delta,
    )?;
    if let Some(vault_operation) = &plan.vault_operation {
        accounts.users_vault.deployed_collateral = track_deployed(
            accounts.users_vault.deployed_collateral,
            vault_operation,
            report.vault_delta,
        )?;
    }

    msg!(
        "Protocol {} op {} executed. Wallet delta {}, vault delta {}",
        protocol_id,
        plan.trader_operation.operation_id,
        report.trader_delta,
        report.vault_delta
    );
    emit!(OperationExecuted {
        wallet: wallet_key,
        protocol_id,
        operation_id: plan.trader_operation.operation_id,
        replicate,
        trader_delta: report.trader_delta,
        vault_delta: report.vault_delta,
    });
    Ok(())
}

struct LegAccounts<'a, 'info> {
    authority: Pubkey,
    asset_account: &'a mut Account<'info, TokenAccount>,
    accounts: &'a [AccountInfo<'info>],
    signer_seeds: &'a [&'a [u8]],
}

/// Invokes the adapter's `execute_operation` with the leg's PDA as signer.
struct CpiLegExecutor<'a, 'info> {
    adapter_program: AccountInfo<'info>,
    wallet: LegAccounts<'a, 'info>,
    vault: LegAccounts<'a, 'info>,
}

impl<'a, 'info> LegExecutor for CpiLegExecutor<'a, 'info> {
    fn execute(
        &mut self,
        leg: Leg,
        adapter: &Pubkey,
        operation: &AdapterOperation,
    ) -> Result<LegResult> {
        let adapter_program = self.adapter_program.clone();
        let leg_accounts = match leg {
            Leg::Trader => &mut self.wallet,
            Leg::Vault => &mut self.vault,
        };

        let data = operation.instruction_data()?;

        // The leg PDA signs through invoke_signed, so its meta must be marked as signer.
        let metas = leg_accounts
            .accounts
            .iter()
            .map(|acc| {
                let is_signer = acc.is_signer || *acc.key == leg_accounts.authority;
                if acc.is_writable {
                    AccountMeta::new(*acc.key, is_signer)
                } else {
                    AccountMeta::new_readonly(*acc.key, is_signer)
                }
            })
            .collect();
        let ix = Instruction {
            program_id: *adapter,
            accounts: metas,
            data,
        };

        let mut infos = leg_accounts.accounts.to_vec();
        infos.push(adapter_program);

        let balance_before = leg_accounts.asset_account.amount;
        invoke_signed(&ix, &infos, &[leg_accounts.signer_seeds])?;
        leg_accounts.asset_account.reload()?;
        let balance_after = leg_accounts.asset_account.amount;

        let response = match get_return_data() {
            Some((program_id, bytes)) if program_id == *adapter => {
                AdapterResponse::try_from_slice(&bytes).map_err(|_| Error::from(leg.failure()))?
            }
            _ => {
                msg!("Adapter returned no response on {} leg", leg);
                return Err(leg.failure().into());
            }
        };

        let balance_delta = balance_after as i128 - balance_before as i128;
        Ok(LegResult {
            response,
            balance_delta: i64::try_from(balance_delta).map_err(|_| error!(ErrorCode::MathOverflow))?,
        })
    }
}

#[derive(Accounts)]
pub struct ExecuteOnProtocol<'info> {
    pub trader: Signer<'info>,

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
        seeds = [ADAPTERS_REGISTRY_SEED],
        bump = adapters_registry.bump
    )]
    pub adapters_registry: Box<Account<'info, AdaptersRegistry>>,

    /// CHECK: compared against the adapters registry entry for the protocol.
    #[account(executable)]
    pub adapter_program: UncheckedAccount<'info>,

    #[account(
        mut,
        associated_token::mint = trader_wallet.asset_mint,
        associated_token::authority = trader_wallet
    )]
    pub wallet_asset_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        associated_token::mint = users_vault.asset_mint,
        associated_token::authority = users_vault
    )]
    pub vault_asset_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}
