//! Address parsing and list loading
//!
//! Role inputs arrive as plain text files, one address per line. Lines are
//! trimmed; blank lines and `#` comments are skipped; duplicates collapse.

use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use std::collections::HashSet;
use std::path::Path;

/// Parse a single address, accepting mixed case.
///
/// Parsing into the 20-byte [`Address`] type is what makes every downstream
/// comparison case-insensitive: role lookups, dedup keys and report rows all
/// operate on raw bytes, never on hex strings.
pub fn parse_address(s: &str) -> Result<Address> {
    s.trim()
        .parse::<Address>()
        .map_err(|_| ConfigError::InvalidAddress(s.trim().to_string()).into())
}

/// Load and deduplicate an address list file.
///
/// `label` names the list in error messages (e.g. "exchange", "tracked-user").
pub fn load_address_list(path: &Path, label: &str) -> Result<HashSet<Address>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::InvalidFile(format!("{} list {}: {}", label, path.display(), e))
    })?;

    let mut addresses = HashSet::new();
    for line in content.lines() {
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        addresses.insert(parse_address(entry)?);
    }

    if addresses.is_empty() {
        return Err(ConfigError::EmptyAddressList(label.to_string()).into());
    }

    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_address_mixed_case() {
        let lower = parse_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        let upper = parse_address("0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_load_list_skips_comments_and_dedups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# known routers").unwrap();
        writeln!(file, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();

        let set = load_address_list(file.path(), "exchange").unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_load_list_rejects_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();

        let result = load_address_list(file.path(), "tracked-user");
        assert!(result.is_err());
    }
}
