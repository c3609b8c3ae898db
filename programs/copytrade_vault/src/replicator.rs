//! Mirrors a trader wallet operation onto the users vault.
//!
//! The vault leg is sized from the round-start `ratio_proportions` snapshot and
//! pre-flighted before the wallet leg runs. Legs run wallet first, then vault; any
//! failure is returned as an error so the enclosing transaction reverts both.

use anchor_lang::prelude::*;

use crate::constants::EXECUTE_OPERATION_DISCRIMINATOR;
use crate::errors::ErrorCode;
use crate::math::scale_by_ratio;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    IncreasePosition,
    DecreasePosition,
    CreateLimitOrder,
    UpdateLimitOrder,
    CancelLimitOrder,
    SwapExactIn,
    SwapExactOut,
}

impl OperationKind {
    /// Operations that spend the caller's asset balance up front.
    pub fn spends_collateral(&self) -> bool {
        matches!(
            self,
            OperationKind::IncreasePosition
                | OperationKind::CreateLimitOrder
                | OperationKind::SwapExactIn
        )
    }

    /// Operations that return collateral opened by an earlier operation.
    pub fn releases_collateral(&self) -> bool {
        matches!(
            self,
            OperationKind::DecreasePosition
                | OperationKind::CancelLimitOrder
                | OperationKind::SwapExactOut
        )
    }
}

impl TryFrom<u8> for OperationKind {
    type Error = anchor_lang::error::Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => OperationKind::IncreasePosition,
            1 => OperationKind::DecreasePosition,
            2 => OperationKind::CreateLimitOrder,
            3 => OperationKind::UpdateLimitOrder,
            4 => OperationKind::CancelLimitOrder,
            5 => OperationKind::SwapExactIn,
            6 => OperationKind::SwapExactOut,
            _ => return err!(ErrorCode::InvalidOperation),
        })
    }
}

/// One adapter call. `data` is the adapter-specific payload and is forwarded untouched.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterOperation {
    pub operation_id: u8,
    pub amount: u64,
    pub min_amount_out: u64,
    pub data: Vec<u8>,
}

impl AdapterOperation {
    pub fn kind(&self) -> Result<OperationKind> {
        OperationKind::try_from(self.operation_id)
    }

    /// Same operation with sizes scaled by a 1e18 fixed-point ratio.
    pub fn scaled(&self, ratio: u128) -> Result<AdapterOperation> {
        Ok(AdapterOperation {
            operation_id: self.operation_id,
            amount: scale_by_ratio(self.amount, ratio)?,
            min_amount_out: scale_by_ratio(self.min_amount_out, ratio)?,
            data: self.data.clone(),
        })
    }

    /// Instruction data for the adapter's `execute_operation`.
    pub fn instruction_data(&self) -> Result<Vec<u8>> {
        let mut data = EXECUTE_OPERATION_DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|_| error!(ErrorCode::InvalidOperation))?;
        Ok(data)
    }
}

/// What an adapter returns through return data.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterResponse {
    pub success: bool,
    pub amount_out: u64,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Trader,
    Vault,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Trader => write!(f, "trader"),
            Leg::Vault => write!(f, "vault"),
        }
    }
}

impl Leg {
    /// Error reported when the adapter answers `success = false` or nothing at all.
    pub fn failure(&self) -> ErrorCode {
        match self {
            Leg::Trader => ErrorCode::TraderAdapterOperationFailed,
            Leg::Vault => ErrorCode::VaultAdapterOperationFailed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegResult {
    pub response: AdapterResponse,
    /// Change of the leg's asset balance caused by the call.
    pub balance_delta: i64,
}

/// Runs one leg against an adapter. CPI on chain, fakes in tests.
pub trait LegExecutor {
    fn execute(
        &mut self,
        leg: Leg,
        adapter: &Pubkey,
        operation: &AdapterOperation,
    ) -> Result<LegResult>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicationPlan {
    pub adapter: Pubkey,
    pub trader_operation: AdapterOperation,
    pub vault_operation: Option<AdapterOperation>,
}

/// Balances each leg may spend: the asset balance minus what belongs to the next round
/// or to claimants. Read before any leg runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FreeBalances {
    pub trader: u64,
    pub vault: u64,
}

impl ReplicationPlan {
    /// `ratio_proportions` is the round-start snapshot.
    pub fn new(
        adapter: Pubkey,
        operation: AdapterOperation,
        replicate: bool,
        ratio_proportions: u128,
        free: FreeBalances,
    ) -> Result<Self> {
        let kind = operation.kind()?;
        if kind.spends_collateral() {
            require!(operation.amount <= free.trader, ErrorCode::InsufficientAssets);
        }
        let vault_operation = if replicate {
            let scaled = operation
                .scaled(ratio_proportions)
                .map_err(|_| error!(ErrorCode::UsersVaultOperationFailed))?;
            if operation.amount > 0 {
                require!(scaled.amount > 0, ErrorCode::UsersVaultOperationFailed);
            }
            if kind.spends_collateral() {
                require!(
                    scaled.amount <= free.vault,
                    ErrorCode::UsersVaultOperationFailed
                );
            }
            Some(scaled)
        } else {
            None
        };

        Ok(Self {
            adapter,
            trader_operation: operation,
            vault_operation,
        })
    }

    pub fn replicates(&self) -> bool {
        self.vault_operation.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub trader_delta: i64,
    pub vault_delta: i64,
}

pub fn execute_plan<E: LegExecutor>(
    plan: &ReplicationPlan,
    executor: &mut E,
) -> Result<ExecutionReport> {
    let trader_delta = run_leg(executor, Leg::Trader, &plan.adapter, &plan.trader_operation)?;
    let vault_delta = match &plan.vault_operation {
        Some(operation) => run_leg(executor, Leg::Vault, &plan.adapter, operation)?,
        None => 0,
    };
    Ok(ExecutionReport {
        trader_delta,
        vault_delta,
    })
}

fn run_leg<E: LegExecutor>(
    executor: &mut E,
    leg: Leg,
    adapter: &Pubkey,
    operation: &AdapterOperation,
) -> Result<i64> {
    let result = executor.execute(leg, adapter, operation)?;
    if !result.response.success {
        msg!("Adapter operation {} failed on {} leg", operation.operation_id, leg);
        return Err(leg.failure().into());
    }
    require!(
        result.response.amount_out >= operation.min_amount_out,
        ErrorCode::InvalidSlippage
    );
    Ok(result.balance_delta)
}

/// Collateral a leg keeps in open positions and orders, at cost, after `operation`
/// moved its asset balance by `balance_delta`.
///
/// Opening operations add what left the balance. Closing operations release up to
/// `operation.amount`, whatever came back; the difference is realized P&L.
pub fn track_deployed(
    deployed: u64,
    operation: &AdapterOperation,
    balance_delta: i64,
) -> Result<u64> {
    let kind = operation.kind()?;
    if kind.spends_collateral() && balance_delta < 0 {
        let spent = balance_delta.unsigned_abs();
        return Ok(deployed.checked_add(spent).ok_or(ErrorCode::MathOverflow)?);
    }
    if kind.releases_collateral() {
        return Ok(deployed.saturating_sub(operation.amount));
    }
    Ok(deployed)
}
