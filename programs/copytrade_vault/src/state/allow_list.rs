use anchor_lang::prelude::*;

use crate::constants::ALLOW_LIST_SEED;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Trader,
    Investor,
}

/// One allow-list decision for a principal, PDA of `[ALLOW_LIST_SEED, role, address]`.
#[account]
pub struct AllowListEntry {
    pub role: Role,
    pub address: Pubkey,
    pub allowed: bool,
    pub bump: u8,
}

impl AllowListEntry {
    // 8 discriminator + 1 role + 32 address + 1 allowed + 1 bump
    pub const SPACE: usize = 8 + 1 + 32 + 1 + 1;

    pub fn address_for(role: Role, address: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[ALLOW_LIST_SEED, &[role as u8], address.as_ref()],
            &crate::ID,
        )
        .0
    }

    /// True when `info` is the program-owned allow-list PDA for `(role, address)` and it is set.
    /// A missing or foreign account counts as not allowed.
    pub fn is_allowed(info: &AccountInfo, role: Role, address: &Pubkey) -> bool {
        if info.key() != Self::address_for(role, address) || info.owner != &crate::ID {
            return false;
        }
        let Ok(data) = info.try_borrow_data() else {
            return false;
        };
        let mut slice: &[u8] = &data;
        match AllowListEntry::try_deserialize(&mut slice) {
            Ok(entry) => entry.role == role && entry.address == *address && entry.allowed,
            Err(_) => false,
        }
    }
}
