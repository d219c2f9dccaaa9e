//! Transfer labeling
//!
//! A deterministic rule table maps the `(sender role, receiver role)` pair of
//! each transfer to a trade label. Events touching neither a tracked user nor
//! an exchange are filtered out before classification.

use crate::event::TransferEvent;
use crate::roles::{AddressRole, RoleBook};
use alloy::primitives::{Address, U256};

/// Trade label relative to the known exchange and tracked-user sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeLabel {
    Buy,
    Sell,
    TransferWithin,
    InputUnknown,
    OutputUnknown,
}

impl TradeLabel {
    /// Rule table, first match wins.
    ///
    /// Exchange rules are checked before the tracked-user rules so an
    /// exchange-involving transfer is never labeled as an internal one.
    /// The both-unknown pair has no label; callers filter those upstream.
    pub fn from_roles(from: AddressRole, to: AddressRole) -> Option<TradeLabel> {
        match (from, to) {
            (AddressRole::Exchange, _) => Some(TradeLabel::Buy),
            (_, AddressRole::Exchange) => Some(TradeLabel::Sell),
            (AddressRole::TrackedUser, AddressRole::TrackedUser) => {
                Some(TradeLabel::TransferWithin)
            }
            (AddressRole::Unknown, AddressRole::TrackedUser) => Some(TradeLabel::InputUnknown),
            (AddressRole::TrackedUser, AddressRole::Unknown) => Some(TradeLabel::OutputUnknown),
            (AddressRole::Unknown, AddressRole::Unknown) => None,
        }
    }

    /// Display form used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeLabel::Buy => "Buy",
            TradeLabel::Sell => "Sell",
            TradeLabel::TransferWithin => "Transfer within",
            TradeLabel::InputUnknown => "Input unknown",
            TradeLabel::OutputUnknown => "Output unknown",
        }
    }
}

/// A transfer annotated with its trade label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTransfer {
    pub label: TradeLabel,
    pub amount: U256,
    pub from: Address,
    pub to: Address,
}

/// Label a single pre-filtered event.
pub fn classify(event: &TransferEvent, roles: &RoleBook) -> Option<ClassifiedTransfer> {
    let label = TradeLabel::from_roles(roles.role_of(event.from), roles.role_of(event.to))?;
    Some(ClassifiedTransfer {
        label,
        amount: event.amount,
        from: event.from,
        to: event.to,
    })
}

/// The ledger path: drop events involving neither set, label the rest.
///
/// Event order is preserved; the output row count equals the input count
/// minus the filtered both-unknown events — the only drop this path makes.
pub fn ledger(events: &[TransferEvent], roles: &RoleBook) -> Vec<ClassifiedTransfer> {
    events
        .iter()
        .filter_map(|event| classify(event, roles))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use std::collections::HashSet;

    use AddressRole::{Exchange, TrackedUser, Unknown};

    #[test]
    fn test_rule_table_all_pairs() {
        // Full precedence table, first match wins.
        assert_eq!(TradeLabel::from_roles(Exchange, Exchange), Some(TradeLabel::Buy));
        assert_eq!(TradeLabel::from_roles(Exchange, TrackedUser), Some(TradeLabel::Buy));
        assert_eq!(TradeLabel::from_roles(Exchange, Unknown), Some(TradeLabel::Buy));
        assert_eq!(TradeLabel::from_roles(TrackedUser, Exchange), Some(TradeLabel::Sell));
        assert_eq!(TradeLabel::from_roles(Unknown, Exchange), Some(TradeLabel::Sell));
        assert_eq!(
            TradeLabel::from_roles(TrackedUser, TrackedUser),
            Some(TradeLabel::TransferWithin)
        );
        assert_eq!(
            TradeLabel::from_roles(Unknown, TrackedUser),
            Some(TradeLabel::InputUnknown)
        );
        assert_eq!(
            TradeLabel::from_roles(TrackedUser, Unknown),
            Some(TradeLabel::OutputUnknown)
        );
        assert_eq!(TradeLabel::from_roles(Unknown, Unknown), None);
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn event(tx: u8, from: Address, to: Address, amount: u64) -> TransferEvent {
        TransferEvent {
            tx_hash: B256::repeat_byte(tx),
            log_index: 0,
            block_number: 1,
            from,
            to,
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_ledger_scenario() {
        let dex1 = addr(0xde);
        let a = addr(0xa1);
        let b = addr(0xb2);
        let stranger = addr(0x99);

        let roles = RoleBook::new(HashSet::from([dex1]), HashSet::from([a, b])).unwrap();

        let events = vec![
            event(1, a, dex1, 100),
            event(2, dex1, b, 50),
            event(3, a, b, 10),
            event(4, a, stranger, 5),
        ];

        let rows = ledger(&events, &roles);
        let labels: Vec<_> = rows.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec![
                TradeLabel::Sell,
                TradeLabel::Buy,
                TradeLabel::TransferWithin,
                TradeLabel::OutputUnknown,
            ]
        );
    }

    #[test]
    fn test_ledger_filters_only_uninvolved_events() {
        let dex = addr(0xde);
        let user = addr(0xa1);
        let s1 = addr(0x91);
        let s2 = addr(0x92);

        let roles = RoleBook::new(HashSet::from([dex]), HashSet::from([user])).unwrap();

        let events = vec![
            event(1, s1, s2, 1),   // both unknown: filtered
            event(2, s1, dex, 2),  // exchange involved: kept
            event(3, user, s1, 3), // tracked user involved: kept
        ];

        let rows = ledger(&events, &roles);
        assert_eq!(rows.len(), events.len() - 1);
        assert_eq!(rows[0].label, TradeLabel::Sell);
        assert_eq!(rows[1].label, TradeLabel::OutputUnknown);
    }

    #[test]
    fn test_labels_render_like_reports() {
        assert_eq!(TradeLabel::Buy.as_str(), "Buy");
        assert_eq!(TradeLabel::TransferWithin.as_str(), "Transfer within");
        assert_eq!(TradeLabel::InputUnknown.as_str(), "Input unknown");
    }
}
