use anchor_lang::prelude::*;

/// PDA Seeds
#[constant]
pub const GLOBAL_CONFIG_SEED: &[u8] = b"global_config";
#[constant]
pub const ADAPTERS_REGISTRY_SEED: &[u8] = b"adapters_registry";
#[constant]
pub const ALLOW_LIST_SEED: &[u8] = b"allow_list";
#[constant]
pub const TRADER_WALLET_SEED: &[u8] = b"trader_wallet";
#[constant]
pub const USERS_VAULT_SEED: &[u8] = b"users_vault";
#[constant]
pub const SHARE_MINT_SEED: &[u8] = b"share_mint";
#[constant]
pub const DEPOSITOR_SEED: &[u8] = b"depositor";
#[constant]
pub const ROUND_PRICE_SEED: &[u8] = b"round_price";

/// Fixed-point denominator for prices and ratios (1e18).
pub const PRICE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Price of round 0, before any trading: one asset per share.
pub const INITIAL_PRICE_PER_SHARE: u128 = PRICE_PRECISION;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Performance fee ceiling: 50%.
pub const MAX_PERFORMANCE_FEE_BPS: u16 = 5_000;

/// Protocol ids live in `0..MAX_PROTOCOL_ID` so selection can use a fixed slot table.
pub const MAX_PROTOCOL_ID: usize = 64;

pub const MAX_REGISTERED_ADAPTERS: usize = 16;

/// Anchor discriminator of the adapter entry point: `sha256("global:execute_operation")[..8]`.
pub const EXECUTE_OPERATION_DISCRIMINATOR: [u8; 8] = [0x69, 0xf0, 0xfa, 0x9f, 0x41, 0x84, 0x6f, 0xb9];
