use anchor_lang::prelude::*;

use crate::constants::{MAX_PROTOCOL_ID, MAX_REGISTERED_ADAPTERS};
use crate::errors::ErrorCode;

/// Lookup of adapter programs by protocol id.
///
/// Wallet logic only sees this trait, so tests can hand it a fake directory.
pub trait AdapterDirectory {
    fn is_adapter_allowed(&self, protocol_id: u8) -> bool;
    fn adapter_address(&self, protocol_id: u8) -> Option<Pubkey>;
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdapterEntry {
    pub protocol_id: u8,
    pub program: Pubkey,
    pub allowed: bool,
}

impl AdapterEntry {
    pub const SPACE: usize = 1 + 32 + 1;
}

/// Directory of DEX adapter programs, managed by the global config admin.
#[account]
pub struct AdaptersRegistry {
    pub bump: u8,
    pub entries: Vec<AdapterEntry>,
}

impl AdaptersRegistry {
    // 8 discriminator + 1 bump + 4 vec_len + entries
    pub const SPACE: usize = 8 + 1 + 4 + AdapterEntry::SPACE * MAX_REGISTERED_ADAPTERS;

    /// Insert or replace the program registered for `protocol_id`. New entries start allowed.
    pub fn register(&mut self, protocol_id: u8, program: Pubkey) -> Result<()> {
        require!((protocol_id as usize) < MAX_PROTOCOL_ID, ErrorCode::InvalidProtocol);
        require!(program != Pubkey::default(), ErrorCode::ZeroAddress);

        if let Some(entry) = self.entries.iter_mut().find(|e| e.protocol_id == protocol_id) {
            entry.program = program;
            entry.allowed = true;
            return Ok(());
        }
        require!(self.entries.len() < MAX_REGISTERED_ADAPTERS, ErrorCode::RegistryFull);
        self.entries.push(AdapterEntry {
            protocol_id,
            program,
            allowed: true,
        });
        Ok(())
    }

    /// Returns the program registered for `protocol_id`.
    pub fn set_allowed(&mut self, protocol_id: u8, allowed: bool) -> Result<Pubkey> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.protocol_id == protocol_id)
            .ok_or(ErrorCode::InvalidProtocol)?;
        entry.allowed = allowed;
        Ok(entry.program)
    }
}

impl AdapterDirectory for AdaptersRegistry {
    fn is_adapter_allowed(&self, protocol_id: u8) -> bool {
        self.entries
            .iter()
            .any(|e| e.protocol_id == protocol_id && e.allowed)
    }

    fn adapter_address(&self, protocol_id: u8) -> Option<Pubkey> {
        self.entries
            .iter()
            .find(|e| e.protocol_id == protocol_id && e.allowed)
            .map(|e| e.program)
    }
}
