//! Address role lookup

use crate::config::load_address_list;
use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use std::collections::HashSet;
use std::path::Path;

/// Role of an address relative to the configured sets.
///
/// Derived, never stored. Exchange membership wins over tracked-user
/// membership, but overlapping inputs are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    Exchange,
    TrackedUser,
    Unknown,
}

/// Constant-time role lookup built once from the two input lists.
///
/// Addresses are held as raw 20-byte values, so lookups are case-insensitive
/// by construction. Read-only after construction; safe to share across
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct RoleBook {
    exchanges: HashSet<Address>,
    tracked_users: HashSet<Address>,
}

impl RoleBook {
    /// Build from deduplicated sets, rejecting overlap.
    ///
    /// An address in both lists would silently mislabel trades, so it fails
    /// fast before any network call.
    pub fn new(exchanges: HashSet<Address>, tracked_users: HashSet<Address>) -> Result<Self> {
        if let Some(overlap) = exchanges.intersection(&tracked_users).next() {
            return Err(ConfigError::OverlappingRole(format!("{:#x}", overlap)).into());
        }

        Ok(Self {
            exchanges,
            tracked_users,
        })
    }

    /// Build from the two address-list files.
    pub fn from_files(exchange_path: &Path, tracked_user_path: &Path) -> Result<Self> {
        let exchanges = load_address_list(exchange_path, "exchange")?;
        let tracked_users = load_address_list(tracked_user_path, "tracked-user")?;
        Self::new(exchanges, tracked_users)
    }

    pub fn role_of(&self, address: Address) -> AddressRole {
        if self.exchanges.contains(&address) {
            AddressRole::Exchange
        } else if self.tracked_users.contains(&address) {
            AddressRole::TrackedUser
        } else {
            AddressRole::Unknown
        }
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn tracked_user_count(&self) -> usize {
        self.tracked_users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn book() -> RoleBook {
        let exchanges = HashSet::from([addr("0x1111111111111111111111111111111111111111")]);
        let users = HashSet::from([addr("0x2222222222222222222222222222222222222222")]);
        RoleBook::new(exchanges, users).unwrap()
    }

    #[test]
    fn test_role_lookup() {
        let book = book();
        assert_eq!(
            book.role_of(addr("0x1111111111111111111111111111111111111111")),
            AddressRole::Exchange
        );
        assert_eq!(
            book.role_of(addr("0x2222222222222222222222222222222222222222")),
            AddressRole::TrackedUser
        );
        assert_eq!(
            book.role_of(addr("0x3333333333333333333333333333333333333333")),
            AddressRole::Unknown
        );
    }

    #[test]
    fn test_role_lookup_is_case_insensitive() {
        let exchanges =
            HashSet::from([addr("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")]);
        let users = HashSet::new();
        let book = RoleBook::new(exchanges, users).unwrap();

        // Same address, different case on the way in.
        assert_eq!(
            book.role_of(addr("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")),
            AddressRole::Exchange
        );
        assert_eq!(
            book.role_of(addr("0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48")),
            AddressRole::Exchange
        );
    }

    #[test]
    fn test_overlap_is_config_error() {
        let both = addr("0x1111111111111111111111111111111111111111");
        let result = RoleBook::new(HashSet::from([both]), HashSet::from([both]));
        assert!(result.is_err());
    }
}
