// File: src/services/ticker_sync/reconciler.rs
use super::models::{
    Change, InstrumentRecord, InstrumentStatus, IssueReason, NaturalKey, SyncIssue,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of diffing a fetch against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// One entry per natural key in the union of both sides, ordered by key.
    pub changes: Vec<Change>,
    /// Data-quality findings, ordered by the position of the offending entry.
    pub issues: Vec<SyncIssue>,
}

/// Classifies every natural key seen in `fetched` or `stored`.
///
/// Duplicate keys in `fetched` resolve to the last occurrence; each earlier
/// occurrence is reported as `duplicate_key`. The order of `stored` has no
/// effect on the result.
pub fn reconcile(fetched: Vec<InstrumentRecord>, stored: Vec<InstrumentRecord>) -> Reconciliation {
    let mut latest: BTreeMap<NaturalKey, (usize, InstrumentRecord)> = BTreeMap::new();
    let mut duplicates: Vec<(usize, SyncIssue)> = Vec::new();

    for (position, record) in fetched.into_iter().enumerate() {
        if let Some((earlier_position, earlier)) = latest.insert(record.key(), (position, record)) {
            warn!(
                "Duplicate catalog key {}; keeping the later entry",
                earlier.key()
            );
            duplicates.push((
                earlier_position,
                SyncIssue {
                    symbol: earlier.symbol,
                    reason: IssueReason::DuplicateKey,
                },
            ));
        }
    }
    duplicates.sort_by_key(|(position, _)| *position);

    let mut current: BTreeMap<NaturalKey, InstrumentRecord> = BTreeMap::new();
    for record in stored {
        let key = record.normalized_key();
        // Rows differing only in case or padding: the canonical one wins,
        // otherwise the lowest stored key, so store order never matters
        let replace = match current.get(&key) {
            None => true,
            Some(kept) => {
                let wins = kept.key() != key && (record.key() == key || record.key() < kept.key());
                warn!(
                    "Stored rows {} and {} share key {}; ignoring the former",
                    if wins { kept.key() } else { record.key() },
                    if wins { record.key() } else { kept.key() },
                    key
                );
                wins
            }
        };
        if replace {
            current.insert(key, record);
        }
    }

    let mut changes = Vec::with_capacity(latest.len() + current.len());

    for (key, (_, record)) in latest {
        let existing = current.remove(&key);
        changes.push(classify(record, existing));
    }

    for (key, existing) in current {
        changes.push(match existing.status {
            InstrumentStatus::Active => Change::Retire(existing.retired()),
            InstrumentStatus::Delisted => Change::Unchanged(key),
        });
    }

    changes.sort_by_key(Change::key);

    debug!(
        "Reconciled {} keys with {} duplicate entries",
        changes.len(),
        duplicates.len()
    );

    Reconciliation {
        changes,
        issues: duplicates.into_iter().map(|(_, issue)| issue).collect(),
    }
}

/// Classifies one fetched record against its stored counterpart, if any.
/// A stored row whose key is not in normalized form is rewritten to it.
pub fn classify(fetched: InstrumentRecord, existing: Option<InstrumentRecord>) -> Change {
    match existing {
        None => Change::Insert(fetched),
        Some(before)
            if before.key() != fetched.key() || before.mutable_fields_differ(&fetched) =>
        {
            Change::Update {
                before,
                after: fetched,
            }
        }
        Some(_) => Change::Unchanged(fetched.key()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ticker_sync::models::AssetClass;
    use crate::services::ticker_sync::testing::record;

    #[test]
    fn test_each_classification() {
        let fetched = vec![
            record("AAPL", "NASDAQ", "Apple Inc"),
            record("MSFT", "NASDAQ", "Microsoft Corporation"),
            record("IBM", "NYSE", "IBM"),
        ];
        let stored = vec![
            record("MSFT", "NASDAQ", "Microsoft Corp"),
            record("IBM", "NYSE", "IBM"),
            record("TWTR", "NYSE", "Twitter"),
        ];

        let result = reconcile(fetched, stored);

        assert!(result.issues.is_empty());
        assert_eq!(
            result.changes,
            vec![
                Change::Insert(record("AAPL", "NASDAQ", "Apple Inc")),
                Change::Unchanged(NaturalKey::new("IBM", "NYSE")),
                Change::Update {
                    before: record("MSFT", "NASDAQ", "Microsoft Corp"),
                    after: record("MSFT", "NASDAQ", "Microsoft Corporation"),
                },
                Change::Retire(record("TWTR", "NYSE", "Twitter").retired()),
            ]
        );
    }

    #[test]
    fn test_asset_class_and_status_flips_are_updates() {
        let mut etf = record("QQQ", "NASDAQ", "Invesco QQQ");
        etf.asset_class = AssetClass::Etf;
        let relisted = record("GME", "NYSE", "GameStop");

        let result = reconcile(
            vec![etf.clone(), relisted.clone()],
            vec![record("QQQ", "NASDAQ", "Invesco QQQ"), relisted.retired()],
        );

        assert_eq!(result.changes.len(), 2);
        assert!(result.changes.iter().all(|c| matches!(c, Change::Update { .. })));
    }

    #[test]
    fn test_already_delisted_rows_stay_unchanged() {
        let gone = record("ENRN", "NYSE", "Enron").retired();
        let result = reconcile(Vec::new(), vec![gone.clone()]);
        assert_eq!(result.changes, vec![Change::Unchanged(gone.key())]);
    }

    #[test]
    fn test_retire_preserves_last_known_fields() {
        let mut stored = record("SPY", "NYSEARCA", "SPDR S&P 500 ETF");
        stored.asset_class = AssetClass::Etf;

        let result = reconcile(Vec::new(), vec![stored.clone()]);

        match &result.changes[0] {
            Change::Retire(retired) => {
                assert_eq!(retired.display_name, stored.display_name);
                assert_eq!(retired.asset_class, AssetClass::Etf);
                assert_eq!(retired.status, InstrumentStatus::Delisted);
            }
            other => panic!("expected retire, got {:?}", other),
        }
    }

    #[test]
    fn test_last_duplicate_wins() {
        let fetched = vec![
            record("AAPL", "NASDAQ", "Apple Computer"),
            record("IBM", "NYSE", "IBM"),
            record("AAPL", "NASDAQ", "Apple Inc"),
        ];

        let result = reconcile(fetched, Vec::new());

        assert_eq!(result.changes.len(), 2);
        assert_eq!(
            result.changes[0],
            Change::Insert(record("AAPL", "NASDAQ", "Apple Inc"))
        );
        assert_eq!(
            result.issues,
            vec![SyncIssue {
                symbol: "AAPL".into(),
                reason: IssueReason::DuplicateKey,
            }]
        );
    }

    #[test]
    fn test_duplicate_issues_follow_fetch_order() {
        let fetched = vec![
            record("MSFT", "NASDAQ", "Microsoft 1"),
            record("AAPL", "NASDAQ", "Apple 1"),
            record("AAPL", "NASDAQ", "Apple 2"),
            record("MSFT", "NASDAQ", "Microsoft 2"),
            record("AAPL", "NASDAQ", "Apple 3"),
        ];

        let result = reconcile(fetched, Vec::new());

        let symbols: Vec<&str> = result.issues.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "AAPL", "AAPL"]);
    }

    #[test]
    fn test_same_symbol_on_two_exchanges_is_two_keys() {
        let result = reconcile(
            vec![record("SHOP", "NYSE", "Shopify"), record("SHOP", "TSX", "Shopify")],
            Vec::new(),
        );
        assert!(result.issues.is_empty());
        assert_eq!(result.changes.len(), 2);
    }

    #[test]
    fn test_stored_keys_compare_normalized() {
        let lowercase = record("aapl", "nasdaq", "Apple Inc");

        let result = reconcile(vec![record("AAPL", "NASDAQ", "Apple Inc")], vec![lowercase.clone()]);

        assert_eq!(
            result.changes,
            vec![Change::Update {
                before: lowercase,
                after: record("AAPL", "NASDAQ", "Apple Inc"),
            }]
        );
    }

    #[test]
    fn test_padded_stored_row_is_retired_in_place() {
        let padded = record(" ko ", "NYSE", "Coca-Cola");

        let result = reconcile(Vec::new(), vec![padded.clone()]);

        match &result.changes[..] {
            [Change::Retire(retired)] => {
                assert_eq!(retired.key(), padded.key());
                assert_eq!(result.changes[0].key(), NaturalKey::new("KO", "NYSE"));
            }
            other => panic!("expected one retire, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_stored_row_shadows_variant() {
        let result = reconcile(
            vec![record("AAPL", "NASDAQ", "Apple Inc")],
            vec![
                record("AAPL", "NASDAQ", "Apple Inc"),
                record("aapl", "NASDAQ", "Apple Inc"),
            ],
        );
        assert_eq!(
            result.changes,
            vec![Change::Unchanged(NaturalKey::new("AAPL", "NASDAQ"))]
        );
    }

    #[test]
    fn test_variant_choice_ignores_store_order() {
        let stored = vec![record(" aapl", "NASDAQ", "Apple"), record("aapl", "NASDAQ", "Apple")];
        let mut reversed = stored.clone();
        reversed.reverse();

        assert_eq!(reconcile(Vec::new(), stored), reconcile(Vec::new(), reversed));
    }

    #[test]
    fn test_store_order_does_not_matter() {
        let fetched = vec![
            record("AAPL", "NASDAQ", "Apple Inc"),
            record("KO", "NYSE", "Coca-Cola"),
        ];
        let stored = vec![
            record("KO", "NYSE", "The Coca-Cola Company"),
            record("GE", "NYSE", "General Electric"),
            record("AAPL", "NASDAQ", "Apple Inc"),
        ];
        let mut reversed = stored.clone();
        reversed.reverse();

        assert_eq!(
            reconcile(fetched.clone(), stored),
            reconcile(fetched, reversed)
        );
    }
}
