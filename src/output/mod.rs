//! Report writers

mod csv;

pub use csv::{HolderWriter, LedgerWriter, SnapshotMetadata};

use alloy::primitives::{utils::format_units, U256};

/// Render a raw token amount in token units.
///
/// Fixed-point string conversion via alloy's unit formatting; trailing
/// fractional zeros are trimmed for report readability.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(s) => {
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
        Err(_) => amount.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token_amount() {
        let one_and_a_half = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(format_token_amount(one_and_a_half, 18), "1.5");

        let whole = U256::from(2_000_000u64);
        assert_eq!(format_token_amount(whole, 6), "2");

        assert_eq!(format_token_amount(U256::ZERO, 18), "0");

        let wei = U256::from(1u64);
        assert_eq!(format_token_amount(wei, 18), "0.000000000000000001");
    }
}
