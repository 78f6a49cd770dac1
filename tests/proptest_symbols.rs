//! Property-Based Tests — Symbol Translation Invariants
//!
//! Uses `proptest` to verify that pair and channel maps stay
//! injective and round-trip losslessly across random vocabularies.

use std::collections::HashSet;

use proptest::prelude::*;

use marketfeed::domain::error::ConfigError;
use marketfeed::domain::event::{Side, Trade};
use marketfeed::domain::symbols::{Channel, ChannelMap, PairMap};
use rust_decimal::Decimal;

/// Canonical-looking pair names: "AAA-BBB".
fn canonical_pair() -> impl Strategy<Value = String> {
    ("[A-Z]{2,5}", "[A-Z]{2,5}").prop_map(|(base, quote)| format!("{base}-{quote}"))
}

/// Wire-looking symbols: lowercase alphanumerics.
fn wire_symbol() -> impl Strategy<Value = String> {
    "[a-z0-9]{4,12}".prop_map(String::from)
}

/// A set of (canonical, wire) entries unique in both directions.
fn injective_entries() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((canonical_pair(), wire_symbol()), 1..24).prop_filter(
        "entries must be unique in both directions",
        |entries| {
            let canonicals: HashSet<_> = entries.iter().map(|(c, _)| c).collect();
            let wires: HashSet<_> = entries.iter().map(|(_, w)| w).collect();
            canonicals.len() == entries.len() && wires.len() == entries.len()
        },
    )
}

// ── Pair Map Properties ─────────────────────────────────────

proptest! {
    /// canonical → wire → canonical is the identity for every entry.
    #[test]
    fn pair_map_round_trips_every_entry(entries in injective_entries()) {
        let map = PairMap::new("TEST", entries.clone()).unwrap();
        for (canonical, wire) in &entries {
            let w = map.to_wire(canonical).unwrap();
            prop_assert_eq!(w, wire.as_str());
            prop_assert_eq!(map.to_canonical(w), Some(canonical.as_str()));
        }
    }

    /// A lookup for anything outside the map is an UnmappedPair error,
    /// never a silent fallback.
    #[test]
    fn pair_map_rejects_unknown_canonicals(
        entries in injective_entries(),
        lookup in canonical_pair(),
    ) {
        let known = entries.iter().any(|(c, _)| c == &lookup);
        let map = PairMap::new("TEST", entries).unwrap();
        match map.to_wire(&lookup) {
            Ok(_) => prop_assert!(known),
            Err(ConfigError::UnmappedPair { .. }) => prop_assert!(!known),
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    /// Re-using a wire symbol for a second canonical pair is rejected
    /// at construction, whatever the rest of the vocabulary looks like.
    #[test]
    fn pair_map_rejects_duplicate_wire_values(
        entries in injective_entries(),
        extra in canonical_pair(),
    ) {
        prop_assume!(!entries.iter().any(|(c, _)| c == &extra));
        let clash = entries[0].1.clone();
        let mut entries = entries;
        entries.push((extra, clash));
        let rejected = matches!(
            PairMap::new("TEST", entries),
            Err(ConfigError::DuplicateMapping { .. })
        );
        prop_assert!(rejected);
    }

    /// canonical_pairs() enumerates exactly the configured canonicals.
    #[test]
    fn pair_map_enumerates_all_canonicals(entries in injective_entries()) {
        let expected: HashSet<String> =
            entries.iter().map(|(c, _)| c.clone()).collect();
        let map = PairMap::new("TEST", entries).unwrap();
        let got: HashSet<String> =
            map.canonical_pairs().map(str::to_string).collect();
        prop_assert_eq!(got, expected);
    }
}

// ── Channel Map Properties ──────────────────────────────────

proptest! {
    /// Channel names round-trip for any injective wire vocabulary.
    #[test]
    fn channel_map_round_trips(
        wires in prop::collection::hash_set("[a-z.]{3,16}", 3),
    ) {
        let wires: Vec<String> = wires.into_iter().collect();
        let entries = vec![
            (Channel::Trades, wires[0].clone()),
            (Channel::Ticker, wires[1].clone()),
            (Channel::Book, wires[2].clone()),
        ];
        let map = ChannelMap::new("TEST", entries.clone()).unwrap();
        for (channel, wire) in &entries {
            let w = map.to_wire(*channel).unwrap();
            prop_assert_eq!(w, wire.as_str());
            prop_assert_eq!(map.to_canonical(w), Some(*channel));
        }
    }
}

// ── Canonical Event Properties ──────────────────────────────

proptest! {
    /// Trade construction accepts exactly the positive amounts.
    #[test]
    fn trade_amount_must_be_positive(
        mantissa in -1_000_000_000i64..1_000_000_000,
        scale in 0u32..9,
    ) {
        let amount = Decimal::new(mantissa, scale);
        let result = Trade::new(
            "TEST",
            "BTC-USD".to_string(),
            1_549_757_127_140,
            "1".to_string(),
            Side::Buy,
            amount,
            Decimal::ONE,
        );
        prop_assert_eq!(result.is_ok(), amount > Decimal::ZERO);
    }
}
