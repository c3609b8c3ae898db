use anchor_lang::prelude::*;

use crate::constants::MAX_PROTOCOL_ID;
use crate::errors::ErrorCode;
use crate::round::RolloverOutcome;
use crate::state::AdapterDirectory;

/// Protocol ids selected by the trader.
///
/// `ordered` keeps insertion order for enumeration, `slots[id]` holds the position in
/// `ordered` plus one (zero means absent). Removal swaps the last id into the freed
/// position, so the order of the remaining ids is not stable.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AdapterSet {
    pub ordered: Vec<u8>,
    pub slots: [u8; 64],
}

const _: () = assert!(MAX_PROTOCOL_ID == 64);

impl Default for AdapterSet {
    fn default() -> Self {
        Self {
            ordered: Vec::new(),
            slots: [0; 64],
        }
    }
}

impl AdapterSet {
    pub const SPACE: usize = 4 + MAX_PROTOCOL_ID + MAX_PROTOCOL_ID;

    pub fn contains(&self, protocol_id: u8) -> bool {
        self.slots
            .get(protocol_id as usize)
            .is_some_and(|slot| *slot != 0)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn insert(&mut self, protocol_id: u8) -> Result<()> {
        require!((protocol_id as usize) < MAX_PROTOCOL_ID, ErrorCode::InvalidProtocol);
        require!(!self.contains(protocol_id), ErrorCode::AdapterPresent);
        self.ordered.push(protocol_id);
        self.slots[protocol_id as usize] = self.ordered.len() as u8;
        Ok(())
    }

    pub fn remove(&mut self, protocol_id: u8) -> Result<()> {
        require!(self.contains(protocol_id), ErrorCode::AdapterNotPresent);
        let index = self.slots[protocol_id as usize] as usize - 1;
        self.ordered.swap_remove(index);
        if let Some(moved) = self.ordered.get(index) {
            self.slots[*moved as usize] = index as u8 + 1;
        }
        self.slots[protocol_id as usize] = 0;
        Ok(())
    }
}

/// The trader's own capital and round bookkeeping.
/// PDA of `[TRADER_WALLET_SEED, seed]`, where `seed` is the creating trader and never changes.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct TraderWallet {
    pub trader: Pubkey,
    pub seed: Pubkey,
    pub asset_mint: Pubkey,
    /// Default until `initialize_users_vault` links one.
    pub users_vault: Pubkey,
    pub bump: u8,

    pub current_round: u64,
    pub cumulative_pending_deposits: u64,
    pub cumulative_pending_withdrawals: u64,

    pub initial_vault_balance: u64,
    pub after_round_vault_balance: u64,
    pub initial_trader_balance: u64,
    pub after_round_trader_balance: u64,
    pub trader_profit: i64,
    pub vault_profit: i64,
    /// Vault capital per unit of wallet capital at the start of the round, 1e18 fixed-point.
    pub ratio_proportions: u128,
    /// Assets sitting in open positions and orders, at cost.
    pub deployed_collateral: u64,

    pub adapters: AdapterSet,
}

impl TraderWallet {
    // 8 discriminator + 32 trader + 32 seed + 32 asset_mint + 32 users_vault + 1 bump
    // + 8 round + 8 pending_deposits + 8 pending_withdrawals
    // + 8 * 4 balances + 8 * 2 profits + 16 ratio + 8 deployed
    // + adapters
    pub const SPACE: usize =
        8 + 32 * 4 + 1 + 8 * 3 + 8 * 4 + 8 * 2 + 16 + 8 + AdapterSet::SPACE;

    pub fn require_trader(&self, signer: &Pubkey) -> Result<()> {
        require_keys_eq!(*signer, self.trader, ErrorCode::Unauthorized);
        Ok(())
    }

    /// Asset balance the wallet may trade with: excludes this round's deposits.
    pub fn free_trading_balance(&self, asset_balance: u64) -> u64 {
        asset_balance.saturating_sub(self.cumulative_pending_deposits)
    }

    pub fn add_adapter_to_use(
        &mut self,
        protocol_id: u8,
        directory: &impl AdapterDirectory,
    ) -> Result<()> {
        require!(directory.is_adapter_allowed(protocol_id), ErrorCode::InvalidProtocol);
        self.adapters.insert(protocol_id)
    }

    pub fn remove_adapter_to_use(&mut self, protocol_id: u8) -> Result<()> {
        self.adapters.remove(protocol_id)
    }

    /// Program id of an adapter that is both registered and selected by the trader.
    pub fn resolve_adapter(
        &self,
        protocol_id: u8,
        directory: &impl AdapterDirectory,
    ) -> Result<Pubkey> {
        require!(self.adapters.contains(protocol_id), ErrorCode::InvalidAdapter);
        directory
            .adapter_address(protocol_id)
            .ok_or_else(|| error!(ErrorCode::InvalidAdapter))
    }

    pub fn record_deposit(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, ErrorCode::ZeroAmount);
        self.cumulative_pending_deposits = self
            .cumulative_pending_deposits
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }

    pub fn record_withdraw_request(&mut self, amount: u64) -> Result<()> {
        require!(self.current_round > 0, ErrorCode::InvalidRound);
        require!(amount > 0, ErrorCode::ZeroAmount);
        let requested = self
            .cumulative_pending_withdrawals
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        require!(requested <= self.initial_trader_balance, ErrorCode::InsufficientAssets);
        self.cumulative_pending_withdrawals = requested;
        Ok(())
    }

    /// Write the settlement and open the next round. Returns the round that was closed.
    pub fn apply_rollover(&mut self, outcome: &RolloverOutcome) -> Result<u64> {
        self.after_round_trader_balance = outcome.after_round_trader_balance;
        self.after_round_vault_balance = outcome.after_round_vault_balance;
        self.initial_trader_balance = outcome.next_initial_trader_balance;
        self.initial_vault_balance = outcome.next_initial_vault_balance;
        self.trader_profit = outcome.trader_profit;
        self.vault_profit = outcome.vault_profit;
        self.ratio_proportions = outcome.ratio_proportions;
        self.cumulative_pending_deposits = 0;
        self.cumulative_pending_withdrawals = 0;

        let closed = self.current_round;
        self.current_round = closed.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PRICE_PRECISION;
    use crate::round::{settle_round, RolloverInputs};
    use crate::state::UsersVault;

    struct FakeDirectory(Vec<(u8, Pubkey)>);

    impl AdapterDirectory for FakeDirectory {
        fn is_adapter_allowed(&self, protocol_id: u8) -> bool {
            self.0.iter().any(|(id, _)| *id == protocol_id)
        }

        fn adapter_address(&self, protocol_id: u8) -> Option<Pubkey> {
            self.0.iter().find(|(id, _)| *id == protocol_id).map(|(_, p)| *p)
        }
    }

    #[test]
    fn test_adapter_set_insert_and_lookup() {
        let mut set = AdapterSet::default();
        set.insert(1).unwrap();
        set.insert(7).unwrap();
        set.insert(63).unwrap();

        assert_eq!(set.ordered, vec![1, 7, 63]);
        assert!(set.contains(7));
        assert!(!set.contains(2));
        assert!(!set.contains(200));

        let present: Error = ErrorCode::AdapterPresent.into();
        assert_eq!(set.insert(7).unwrap_err(), present);
        let invalid: Error = ErrorCode::InvalidProtocol.into();
        assert_eq!(set.insert(64).unwrap_err(), invalid);
    }

    #[test]
    fn test_adapter_set_swap_remove_keeps_index_consistent() {
        let mut set = AdapterSet::default();
        for id in [4, 5, 6, 9] {
            set.insert(id).unwrap();
        }
        set.remove(5).unwrap();

        assert!(!set.contains(5));
        assert_eq!(set.len(), 3);
        for id in [4, 6, 9] {
            assert!(set.contains(id));
            let slot = set.slots[id as usize] as usize;
            assert_eq!(set.ordered[slot - 1], id);
        }

        let missing: Error = ErrorCode::AdapterNotPresent.into();
        assert_eq!(set.remove(5).unwrap_err(), missing);

        set.remove(9).unwrap();
        set.remove(4).unwrap();
        set.remove(6).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.slots, [0; MAX_PROTOCOL_ID]);
    }

    #[test]
    fn test_add_adapter_requires_registry() {
        let directory = FakeDirectory(vec![(1, Pubkey::new_unique())]);
        let mut wallet = TraderWallet::default();

        let invalid: Error = ErrorCode::InvalidProtocol.into();
        assert_eq!(wallet.add_adapter_to_use(2, &directory).unwrap_err(), invalid);

        wallet.add_adapter_to_use(1, &directory).unwrap();
        let present: Error = ErrorCode::AdapterPresent.into();
        assert_eq!(wallet.add_adapter_to_use(1, &directory).unwrap_err(), present);
    }

    #[test]
    fn test_resolve_adapter_needs_selection_and_registry() {
        let gmx = Pubkey::new_unique();
        let directory = FakeDirectory(vec![(1, gmx), (2, Pubkey::new_unique())]);
        let mut wallet = TraderWallet::default();
        wallet.add_adapter_to_use(1, &directory).unwrap();

        assert_eq!(wallet.resolve_adapter(1, &directory).unwrap(), gmx);

        let invalid: Error = ErrorCode::InvalidAdapter.into();
        assert_eq!(wallet.resolve_adapter(2, &directory).unwrap_err(), invalid);
        // selected, but the registry no longer allows it
        assert_eq!(
            wallet.resolve_adapter(1, &FakeDirectory(vec![])).unwrap_err(),
            invalid
        );
    }

    #[test]
    fn test_require_trader() {
        let trader = Pubkey::new_unique();
        let wallet = TraderWallet {
            trader,
            ..Default::default()
        };
        wallet.require_trader(&trader).unwrap();
        let expected: Error = ErrorCode::Unauthorized.into();
        assert_eq!(wallet.require_trader(&Pubkey::new_unique()).unwrap_err(), expected);
    }

    #[test]
    fn test_trader_withdraw_request_bounds() {
        let mut wallet = TraderWallet::default();
        let round: Error = ErrorCode::InvalidRound.into();
        assert_eq!(wallet.record_withdraw_request(10).unwrap_err(), round);

        wallet.current_round = 1;
        wallet.initial_trader_balance = 1_000;
        let zero: Error = ErrorCode::ZeroAmount.into();
        assert_eq!(wallet.record_withdraw_request(0).unwrap_err(), zero);

        wallet.record_withdraw_request(600).unwrap();
        let insufficient: Error = ErrorCode::InsufficientAssets.into();
        assert_eq!(wallet.record_withdraw_request(401).unwrap_err(), insufficient);
        wallet.record_withdraw_request(400).unwrap();
        assert_eq!(wallet.cumulative_pending_withdrawals, 1_000);
    }

    #[test]
    fn test_coupled_rollover_keeps_rounds_in_lockstep() {
        let wallet_key = Pubkey::new_unique();
        let mut wallet = TraderWallet::default();
        let mut vault = UsersVault {
            trader_wallet: wallet_key,
            ..Default::default()
        };

        for round in 0..3u64 {
            wallet.record_deposit(100).unwrap();
            vault.pending_deposit_assets += 500;
            let outcome = settle_round(&RolloverInputs {
                wallet_balance: wallet.initial_trader_balance + 100,
                wallet_pending_deposits: wallet.cumulative_pending_deposits,
                initial_trader_balance: wallet.initial_trader_balance,
                vault_balance: vault.initial_vault_balance + 500,
                vault_pending_deposits: vault.pending_deposit_assets,
                initial_vault_balance: vault.initial_vault_balance,
                share_supply: vault.initial_vault_balance,
                ..Default::default()
            })
            .unwrap();

            let closed_vault = vault
                .rollover_from_trader(&wallet_key, wallet.current_round, &outcome)
                .unwrap();
            let closed_wallet = wallet.apply_rollover(&outcome).unwrap();

            assert_eq!(closed_vault, round);
            assert_eq!(closed_wallet, round);
            assert_eq!(wallet.current_round, round + 1);
            assert_eq!(vault.current_round, wallet.current_round);
            assert_eq!(wallet.ratio_proportions, 5 * PRICE_PRECISION);
            assert_eq!(wallet.cumulative_pending_deposits, 0);
        }
    }

    #[test]
    fn test_open_positions_do_not_skew_next_ratio() {
        let wallet_key = Pubkey::new_unique();
        let mut wallet = TraderWallet {
            current_round: 1,
            initial_trader_balance: 1_000,
            deployed_collateral: 600,
            ..Default::default()
        };
        let mut vault = UsersVault {
            trader_wallet: wallet_key,
            current_round: 1,
            initial_vault_balance: 5_000,
            deployed_collateral: 3_000,
            ..Default::default()
        };
        wallet.record_deposit(100).unwrap();
        // 400 liquid plus this round's 100
        assert_eq!(wallet.free_trading_balance(500), 400);

        let outcome = settle_round(&RolloverInputs {
            wallet_balance: 500,
            wallet_pending_deposits: wallet.cumulative_pending_deposits,
            initial_trader_balance: wallet.initial_trader_balance,
            wallet_deployed_collateral: wallet.deployed_collateral,
            vault_balance: 2_000,
            initial_vault_balance: vault.initial_vault_balance,
            vault_deployed_collateral: vault.deployed_collateral,
            share_supply: 5_000,
            ..Default::default()
        })
        .unwrap();
        vault
            .rollover_from_trader(&wallet_key, wallet.current_round, &outcome)
            .unwrap();
        wallet.apply_rollover(&outcome).unwrap();

        assert_eq!(outcome.trader_profit, 0);
        assert_eq!(wallet.initial_trader_balance, 1_100);
        assert_eq!(vault.initial_vault_balance, 5_000);
        assert_eq!(wallet.ratio_proportions, 5_000 * PRICE_PRECISION / 1_100);
        // positions stay open across the rollover
        assert_eq!(wallet.deployed_collateral, 600);
        assert_eq!(vault.deployed_collateral, 3_000);
    }
}
