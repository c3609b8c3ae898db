use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

declare_id!("2sybVt6NBmCyEPjnK1rj8tCqCAHYcGqEQ4gMATfqEvAs");

pub const POOL_AUTHORITY_SEED: &[u8] = b"pool_authority";

#[program]
pub mod mock_adapter {
    use super::*;

    /// Mock DEX adapter for Localnet verification.
    ///
    /// Opening operations move `amount` from the caller into the pool. Closing
    /// operations and order cancels pay `amount` back out of it. Order updates do nothing.
    /// An opening operation the caller cannot fund answers `success = false`
    /// instead of failing, so callers see the return-value failure path.
    ///
    /// NOTE: This is for LOCALNET TESTING ONLY. Both token accounts use one mint.
    pub fn execute_operation(
        ctx: Context<ExecuteOperation>,
        operation: AdapterOperation,
    ) -> Result<AdapterResponse> {
        require!(
            ctx.accounts.caller_token_account.mint == ctx.accounts.pool_token_account.mint,
            MockAdapterError::MintMismatch
        );

        let amount = operation.amount;
        let response = match operation.operation_id {
            // increase position, create limit order, swap exact-in
            0 | 2 | 5 => {
                if ctx.accounts.caller_token_account.amount < amount {
                    msg!("MockAdapter: caller holds less than {}", amount);
                    return Ok(AdapterResponse::failed());
                }
                let cpi_accounts = Transfer {
                    from: ctx.accounts.caller_token_account.to_account_info(),
                    to: ctx.accounts.pool_token_account.to_account_info(),
                    authority: ctx.accounts.caller.to_account_info(),
                };
                let cpi_ctx = CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts);
                token::transfer(cpi_ctx, amount)?;
                AdapterResponse::filled(amount)
            }
            // decrease position, cancel limit order, swap exact-out
            1 | 4 | 6 => {
                if ctx.accounts.pool_token_account.amount < amount {
                    msg!("MockAdapter: pool holds less than {}", amount);
                    return Ok(AdapterResponse::failed());
                }
                let bump = [ctx.bumps.pool_authority];
                let seeds: &[&[u8]] = &[POOL_AUTHORITY_SEED, &bump];
                let signer = &[seeds];
                let cpi_accounts = Transfer {
                    from: ctx.accounts.pool_token_account.to_account_info(),
                    to: ctx.accounts.caller_token_account.to_account_info(),
                    authority: ctx.accounts.pool_authority.to_account_info(),
                };
                let cpi_ctx = CpiContext::new_with_signer(
                    ctx.accounts.token_program.to_account_info(),
                    cpi_accounts,
                    signer,
                );
                token::transfer(cpi_ctx, amount)?;
                AdapterResponse::filled(amount)
            }
            // update limit order
            3 => AdapterResponse::filled(operation.min_amount_out),
            _ => return err!(MockAdapterError::UnknownOperation),
        };

        msg!(
            "MockAdapter: op={}, amount={}, success={}",
            operation.operation_id,
            amount,
            response.success
        );
        Ok(response)
    }
}

/// Same layout as the vault program's adapter operation.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterOperation {
    pub operation_id: u8,
    pub amount: u64,
    pub min_amount_out: u64,
    pub data: Vec<u8>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterResponse {
    pub success: bool,
    pub amount_out: u64,
    pub data: Vec<u8>,
}

impl AdapterResponse {
    fn filled(amount_out: u64) -> Self {
        Self {
            success: true,
            amount_out,
            data: Vec::new(),
        }
    }

    fn failed() -> Self {
        Self::default()
    }
}

#[derive(Accounts)]
pub struct ExecuteOperation<'info> {
    /// The calling PDA (trader wallet or users vault), signed via invoke_signed.
    pub caller: Signer<'info>,

    #[account(
        mut,
        token::authority = caller
    )]
    pub caller_token_account: Account<'info, TokenAccount>,

    /// CHECK: PDA that owns the pool token account.
    #[account(
        seeds = [POOL_AUTHORITY_SEED],
        bump
    )]
    pub pool_authority: UncheckedAccount<'info>,

    #[account(
        mut,
        token::authority = pool_authority
    )]
    pub pool_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[error_code]
pub enum MockAdapterError {
    #[msg("Caller and pool token accounts must share a mint.")]
    MintMismatch,
    #[msg("Unknown operation id.")]
    UnknownOperation,
}
