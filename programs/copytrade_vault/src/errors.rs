use anchor_lang::prelude::*;

#[error_code]
pub enum ErrorCode {
    // Authorization
    #[msg("You are not authorized to perform this action.")]
    Unauthorized,
    #[msg("Caller is not the registered trader wallet of this vault.")]
    CallerNotAllowed,
    #[msg("Depositor is not allow-listed as an investor.")]
    UserNotAllowed,
    #[msg("Trader is not allow-listed.")]
    TraderNotAllowed,

    // Validation
    #[msg("Address must not be the default public key.")]
    ZeroAddress,
    #[msg("Amount must be greater than zero.")]
    ZeroAmount,
    #[msg("Operation not allowed in the current round.")]
    InvalidRound,
    #[msg("Nothing to settle: no pending amounts and no balance change this round.")]
    InvalidRollover,
    #[msg("Protocol id is unknown or not allowed by the adapters registry.")]
    InvalidProtocol,
    #[msg("Adapter is not registered, not allowed, or not selected by the trader.")]
    InvalidAdapter,
    #[msg("Adapter already selected.")]
    AdapterPresent,
    #[msg("Adapter not selected.")]
    AdapterNotPresent,
    #[msg("Unknown adapter operation id.")]
    InvalidOperation,
    #[msg("Round price account missing or does not match the stored round.")]
    InvalidRoundPrice,
    #[msg("Trader wallet and users vault rounds diverged.")]
    RoundMismatch,
    #[msg("Adapters registry is full.")]
    RegistryFull,

    // Economic
    #[msg("Requested shares exceed the available amount.")]
    InsufficientShares,
    #[msg("Requested assets exceed the available amount.")]
    InsufficientAssets,
    #[msg("Fee rate exceeds the configured maximum.")]
    FeeRateError,
    #[msg("Amount received is less than min_amount_out.")]
    InvalidSlippage,

    // Collaborators
    #[msg("Token transfer failed.")]
    TokenTransferFailed,
    #[msg("Adapter operation failed on the trader leg.")]
    TraderAdapterOperationFailed,
    #[msg("Adapter operation failed on the users vault leg.")]
    VaultAdapterOperationFailed,
    #[msg("Users vault rejected the replicated operation.")]
    UsersVaultOperationFailed,
    #[msg("Sending funds to the trader failed.")]
    SendToTraderFailed,

    // Internal
    #[msg("Price per share is zero.")]
    ZeroPricePerShare,
    #[msg("Math overflow.")]
    MathOverflow,
}
