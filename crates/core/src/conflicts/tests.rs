//! Tests for conflict detection, resolution, and reconciliation.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::holdings::{Holding, HoldingRepositoryTrait, PlatformHolding};
use crate::store::MemoryStore;
use crate::transactions::{PlatformTransaction, Transaction, TransactionType};

fn holding(quantity: Decimal, market_value: Decimal) -> Holding {
    Holding {
        id: "h-1".to_string(),
        portfolio_id: "p-1".to_string(),
        security_id: "AAPL".to_string(),
        symbol: Some("AAPL".to_string()),
        quantity,
        market_value,
        cost_basis: Some(dec!(150000)),
        unrealized_gain: Some(dec!(25000)),
        percent_of_portfolio: None,
        currency: "USD".to_string(),
        last_updated: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    }
}

fn platform_holding(quantity: Decimal, market_value: Decimal) -> PlatformHolding {
    PlatformHolding {
        security_id: "AAPL".to_string(),
        symbol: Some("AAPL".to_string()),
        quantity: Some(quantity),
        market_value: Some(market_value),
        cost_basis: Some(dec!(151000)),
        unrealized_gain: None,
        currency: "USD".to_string(),
        as_of: Some(Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()),
    }
}

fn transaction(amount: Decimal, days_ago_hours: i64) -> Transaction {
    Transaction {
        id: "t-1".to_string(),
        portfolio_id: "p-1".to_string(),
        security_id: Some("AAPL".to_string()),
        transaction_type: TransactionType::Buy,
        amount,
        quantity: Some(dec!(100)),
        price: Some(dec!(175)),
        currency: "USD".to_string(),
        transaction_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
            - Duration::hours(days_ago_hours),
        description: None,
        created_at: Utc::now(),
    }
}

fn platform_transaction(amount: Decimal, date_offset_hours: i64) -> PlatformTransaction {
    PlatformTransaction {
        platform_transaction_id: Some("plat-txn-1".to_string()),
        security_id: Some("AAPL".to_string()),
        transaction_type: TransactionType::Buy,
        amount,
        quantity: Some(dec!(100)),
        price: Some(dec!(175)),
        currency: "USD".to_string(),
        transaction_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
            + Duration::hours(date_offset_hours),
        description: None,
    }
}

mod detection {
    use super::*;

    #[test]
    fn test_within_tolerance_no_conflict() {
        let resolver = ConflictResolver::default();
        // 0.5% quantity difference, 1% value difference
        let existing = holding(dec!(1000), dec!(100000));
        let incoming = platform_holding(dec!(1005), dec!(101000));

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert!(!assessment.has_conflict);
        assert!(assessment.conflict_type.is_none());
        assert_eq!(assessment.severity, ConflictSeverity::Low);
    }

    #[test]
    fn test_quantity_over_tolerance_flags_medium() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(100000));
        let incoming = platform_holding(dec!(1020), dec!(100000)); // 2% qty diff

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert!(assessment.has_conflict);
        assert_eq!(assessment.conflict_type, Some(ConflictType::QuantityMismatch));
        assert_eq!(assessment.severity, ConflictSeverity::Medium);
    }

    #[test]
    fn test_quantity_checked_before_value() {
        let resolver = ConflictResolver::default();
        // Both tolerances exceeded: quantity wins because it is checked first.
        let existing = holding(dec!(1000), dec!(100000));
        let incoming = platform_holding(dec!(1100), dec!(150000));

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert_eq!(assessment.conflict_type, Some(ConflictType::QuantityMismatch));
        assert_eq!(assessment.severity, ConflictSeverity::Medium);
    }

    #[test]
    fn test_value_over_tolerance_flags_value_mismatch() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(100000));
        let incoming = platform_holding(dec!(1000), dec!(103000)); // 3% value diff

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert_eq!(assessment.conflict_type, Some(ConflictType::ValueMismatch));
        match assessment.details {
            Some(ConflictDetails::ValueMismatch {
                relative_difference, ..
            }) => assert_eq!(relative_difference, dec!(0.03)),
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_missing_incoming_fields_never_conflict() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(100000));
        let incoming = PlatformHolding {
            quantity: None,
            market_value: None,
            ..platform_holding(dec!(0), dec!(0))
        };

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert!(!assessment.has_conflict);
    }

    #[test]
    fn test_zero_existing_quantity_disagrees_with_nonzero_incoming() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(0), dec!(100000));
        let incoming = platform_holding(dec!(10), dec!(100000));

        let assessment = resolver.detect_holding_conflict(&existing, &incoming);
        assert!(assessment.has_conflict);
        assert_eq!(assessment.conflict_type, Some(ConflictType::QuantityMismatch));
    }
}

mod multi_source {
    use super::*;

    fn observation(connection: &str, quantity: Decimal, value: Decimal) -> HoldingObservation {
        HoldingObservation {
            connection_id: connection.to_string(),
            quantity,
            market_value: value,
            as_of: None,
        }
    }

    #[test]
    fn test_single_source_never_conflicts() {
        let resolver = ConflictResolver::default();
        let sources = vec![observation("c-1", dec!(1000), dec!(100000))];
        let assessment = resolver.detect_multi_source_conflict(&sources);
        assert!(!assessment.has_conflict);
        assert_eq!(assessment.severity, ConflictSeverity::Low);
    }

    #[test]
    fn test_agreeing_sources_no_conflict() {
        let resolver = ConflictResolver::default();
        let sources = vec![
            observation("c-1", dec!(1000), dec!(100000)),
            observation("c-2", dec!(1000), dec!(100500)),
        ];
        let assessment = resolver.detect_multi_source_conflict(&sources);
        assert!(!assessment.has_conflict);
    }

    #[test]
    fn test_quantity_only_disagreement_is_medium() {
        let resolver = ConflictResolver::default();
        let sources = vec![
            observation("c-1", dec!(1000), dec!(100000)),
            observation("c-2", dec!(900), dec!(100000)),
        ];
        let assessment = resolver.detect_multi_source_conflict(&sources);
        assert!(assessment.has_conflict);
        assert_eq!(assessment.severity, ConflictSeverity::Medium);
    }

    #[test]
    fn test_both_disagreements_are_high() {
        let resolver = ConflictResolver::default();
        let sources = vec![
            observation("c-1", dec!(1000), dec!(100000)),
            observation("c-2", dec!(800), dec!(150000)),
        ];
        let assessment = resolver.detect_multi_source_conflict(&sources);
        assert!(assessment.has_conflict);
        assert_eq!(assessment.severity, ConflictSeverity::High);
        match assessment.details {
            Some(ConflictDetails::MultiSource {
                source_count,
                quantity_variance,
                value_outlier,
            }) => {
                assert_eq!(source_count, 2);
                assert_eq!(quantity_variance, dec!(0.2));
                assert!(value_outlier);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }
}

mod resolution {
    use super::*;

    #[test]
    fn test_clearway_wins_keeps_existing_deep_equal() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1100), dec!(190000));

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::ClearwayWins)
        {
            Resolution::Apply(resolved) => assert_eq!(resolved, existing),
            Resolution::NeedsReview => panic!("CLEARWAY_WINS never needs review"),
        }
    }

    #[test]
    fn test_platform_wins_overwrites_and_bumps_timestamp() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1100), dec!(190000));

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::PlatformWins)
        {
            Resolution::Apply(resolved) => {
                assert_eq!(resolved.quantity, dec!(1100));
                assert_eq!(resolved.market_value, dec!(190000));
                assert_eq!(resolved.cost_basis, Some(dec!(151000)));
                assert!(resolved.last_updated > existing.last_updated);
            }
            Resolution::NeedsReview => panic!("PLATFORM_WINS never needs review"),
        }
    }

    #[test]
    fn test_merge_market_value_is_arithmetic_mean() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1000), dec!(177000));

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::Merge) {
            Resolution::Apply(resolved) => {
                assert_eq!(resolved.market_value, dec!(176000));
                // unrealized gain recomputed from incoming value and existing basis
                assert_eq!(resolved.unrealized_gain, Some(dec!(177000) - dec!(150000)));
                // lastUpdated takes the newer of the two
                assert_eq!(
                    resolved.last_updated,
                    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
                );
            }
            Resolution::NeedsReview => panic!("MERGE never needs review"),
        }
    }

    #[test]
    fn test_merge_without_incoming_value_keeps_existing() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = PlatformHolding {
            market_value: None,
            cost_basis: None,
            ..platform_holding(dec!(1010), dec!(0))
        };

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::Merge) {
            Resolution::Apply(resolved) => {
                assert_eq!(resolved.quantity, dec!(1010));
                assert_eq!(resolved.market_value, dec!(175000));
                assert_eq!(resolved.cost_basis, Some(dec!(150000)));
                assert_eq!(resolved.unrealized_gain, existing.unrealized_gain);
            }
            Resolution::NeedsReview => panic!("MERGE never needs review"),
        }
    }

    #[test]
    fn test_timestamp_newer_incoming_wins() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1100), dec!(190000)); // as_of is newer

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::Timestamp) {
            Resolution::Apply(resolved) => {
                assert_eq!(resolved.quantity, dec!(1100));
                assert_eq!(resolved.last_updated, incoming.as_of.unwrap());
            }
            Resolution::NeedsReview => panic!("TIMESTAMP never needs review"),
        }
    }

    #[test]
    fn test_timestamp_older_incoming_loses() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let mut incoming = platform_holding(dec!(1100), dec!(190000));
        incoming.as_of = Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());

        match resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::Timestamp) {
            Resolution::Apply(resolved) => assert_eq!(resolved, existing),
            Resolution::NeedsReview => panic!("TIMESTAMP never needs review"),
        }
    }

    #[test]
    fn test_manual_review_needs_review() {
        let resolver = ConflictResolver::default();
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1100), dec!(190000));

        assert_eq!(
            resolver.resolve_holding_conflict(&existing, &incoming, ResolutionStrategy::ManualReview),
            Resolution::NeedsReview
        );
    }
}

mod duplicates {
    use super::*;

    #[test]
    fn test_same_amount_within_window_is_duplicate() {
        let resolver = ConflictResolver::default();
        let existing = vec![transaction(dec!(17500.00), 0)];
        let incoming = platform_transaction(dec!(17500.005), 12);

        assert!(resolver
            .detect_transaction_duplicate(&existing, &incoming)
            .is_some());
    }

    #[test]
    fn test_outside_window_is_not_duplicate() {
        let resolver = ConflictResolver::default();
        let existing = vec![transaction(dec!(17500.00), 0)];
        let incoming = platform_transaction(dec!(17500.00), 48);

        assert!(resolver
            .detect_transaction_duplicate(&existing, &incoming)
            .is_none());
    }

    #[test]
    fn test_amount_difference_over_epsilon_is_not_duplicate() {
        let resolver = ConflictResolver::default();
        let existing = vec![transaction(dec!(17500.00), 0)];
        let incoming = platform_transaction(dec!(17500.02), 1);

        assert!(resolver
            .detect_transaction_duplicate(&existing, &incoming)
            .is_none());
    }

    #[test]
    fn test_different_type_is_not_duplicate() {
        let resolver = ConflictResolver::default();
        let existing = vec![transaction(dec!(17500.00), 0)];
        let mut incoming = platform_transaction(dec!(17500.00), 1);
        incoming.transaction_type = TransactionType::Sell;

        assert!(resolver
            .detect_transaction_duplicate(&existing, &incoming)
            .is_none());
    }
}

mod reconcile {
    use super::*;

    #[test]
    fn test_single_source_per_security_reports_nothing() {
        let resolver = ConflictResolver::default();
        let per_connection = vec![(
            "c-1".to_string(),
            vec![platform_holding(dec!(1000), dec!(100000))],
        )];

        let report = resolver.reconcile_holdings("p-1", &per_connection);
        assert_eq!(report.securities_checked, 1);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_high_severity_recommends_manual_review() {
        let resolver = ConflictResolver::default();
        let per_connection = vec![
            (
                "c-1".to_string(),
                vec![platform_holding(dec!(1000), dec!(100000))],
            ),
            (
                "c-2".to_string(),
                vec![platform_holding(dec!(800), dec!(150000))],
            ),
        ];

        let report = resolver.reconcile_holdings("p-1", &per_connection);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.severity, ConflictSeverity::High);
        assert_eq!(finding.recommendation, Recommendation::ManualReviewRequired);
        assert_eq!(finding.connection_ids.len(), 2);
    }

    #[test]
    fn test_medium_severity_recommends_average() {
        let resolver = ConflictResolver::default();
        // Values disagree, quantities agree.
        let per_connection = vec![
            (
                "c-1".to_string(),
                vec![platform_holding(dec!(1000), dec!(100000))],
            ),
            (
                "c-2".to_string(),
                vec![platform_holding(dec!(1000), dec!(110000))],
            ),
        ];

        let report = resolver.reconcile_holdings("p-1", &per_connection);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].recommendation, Recommendation::UseAverageValue);
    }
}

mod manual_resolution {
    use super::*;
    use crate::conflicts::conflicts_service::ManualResolution;

    fn pending_conflict(existing: &Holding, incoming: &PlatformHolding) -> Conflict {
        Conflict::new(
            existing.portfolio_id.clone(),
            ConflictType::ValueMismatch,
            ConflictDataType::Holding,
            ConflictSeverity::Medium,
            Some("c-1".to_string()),
            serde_json::to_value(existing).unwrap(),
            serde_json::to_value(incoming).unwrap(),
            ConflictDetails::ValueMismatch {
                existing_value: existing.market_value,
                incoming_value: incoming.market_value.unwrap(),
                relative_difference: dec!(0.08),
            },
        )
    }

    #[tokio::test]
    async fn test_resolve_with_platform_wins_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let existing = holding(dec!(1000), dec!(175000));
        store.upsert(existing.clone()).await.unwrap();

        let incoming = platform_holding(dec!(1100), dec!(190000));
        let conflict = pending_conflict(&existing, &incoming);
        let conflict_repo: Arc<dyn ConflictRepositoryTrait> = store.clone();
        conflict_repo.insert(conflict.clone()).await.unwrap();

        let service = ConflictService::new(
            store.clone(),
            store.clone(),
            ConflictResolver::default(),
        );
        let resolved = service
            .resolve_manually(
                &conflict.id,
                "ops@clearway",
                ManualResolution {
                    strategy: ResolutionStrategy::PlatformWins,
                    merged_value: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(resolved.status, ConflictStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("ops@clearway"));
        assert!(resolved.resolved_at.is_some());

        // Re-fetching the holding returns the platform-sourced values.
        let stored = store.find_by_security("p-1", "AAPL").unwrap().unwrap();
        assert_eq!(stored.quantity, dec!(1100));
        assert_eq!(stored.market_value, dec!(190000));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_fails_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = ConflictService::new(
            store.clone(),
            store.clone(),
            ConflictResolver::default(),
        );

        let err = service
            .resolve_manually(
                "missing",
                "ops@clearway",
                ManualResolution {
                    strategy: ResolutionStrategy::ClearwayWins,
                    merged_value: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_resolve_terminal_conflict_fails() {
        let store = Arc::new(MemoryStore::new());
        let existing = holding(dec!(1000), dec!(175000));
        let incoming = platform_holding(dec!(1100), dec!(190000));
        let mut conflict = pending_conflict(&existing, &incoming);
        conflict.resolve(ResolutionStrategy::ClearwayWins, "ops@clearway");
        let conflict_repo: Arc<dyn ConflictRepositoryTrait> = store.clone();
        conflict_repo.insert(conflict.clone()).await.unwrap();

        let service = ConflictService::new(
            store.clone(),
            store.clone(),
            ConflictResolver::default(),
        );
        let err = service
            .resolve_manually(
                &conflict.id,
                "ops@clearway",
                ManualResolution {
                    strategy: ResolutionStrategy::PlatformWins,
                    merged_value: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }
}

mod reconciliation_runs {
    use super::*;
    use crate::holdings::SourceHolding;

    fn portfolio_holding(id: &str, security_id: &str) -> Holding {
        Holding {
            id: id.to_string(),
            portfolio_id: "p-1".to_string(),
            security_id: security_id.to_string(),
            symbol: Some(security_id.to_string()),
            quantity: dec!(1000),
            market_value: dec!(100000),
            cost_basis: None,
            unrealized_gain: None,
            percent_of_portfolio: None,
            currency: "USD".to_string(),
            last_updated: Utc::now(),
        }
    }

    fn source_row(
        holding_id: &str,
        connection_id: &str,
        security_id: &str,
        quantity: Decimal,
        market_value: Decimal,
    ) -> SourceHolding {
        SourceHolding {
            id: format!("{holding_id}|{connection_id}"),
            holding_id: holding_id.to_string(),
            connection_id: connection_id.to_string(),
            security_id: security_id.to_string(),
            quantity,
            market_value,
            cost_basis: None,
            platform_updated_at: Some(Utc::now()),
            reported_at: Utc::now(),
        }
    }

    async fn wait_for_completion(
        service: &ReconciliationService,
        run_id: &str,
    ) -> ReconciliationRun {
        for _ in 0..50 {
            if let Some(run) = service.get(run_id) {
                if run.status == ReconciliationStatus::Completed {
                    return run;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("reconciliation run {run_id} did not complete");
    }

    #[tokio::test]
    async fn test_run_flags_cross_connection_disagreement() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(portfolio_holding("h-1", "AAPL")).await.unwrap();
        store
            .upsert_source(source_row("h-1", "c-1", "AAPL", dec!(1000), dec!(100000)))
            .await
            .unwrap();
        store
            .upsert_source(source_row("h-1", "c-2", "AAPL", dec!(800), dec!(150000)))
            .await
            .unwrap();

        let service = ReconciliationService::new(store.clone(), ConflictResolver::default());
        let run_id = service
            .start("p-1", ReconciliationScope::AllHoldings)
            .unwrap();

        let run = wait_for_completion(&service, &run_id).await;
        assert!(run.completed_at.is_some());
        let report = run.report.unwrap();
        assert_eq!(report.securities_checked, 1);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].security_id, "AAPL");
        assert_eq!(report.findings[0].severity, ConflictSeverity::High);
        assert_eq!(report.findings[0].connection_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_security_scope_limits_the_run() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(portfolio_holding("h-1", "AAPL")).await.unwrap();
        store.upsert(portfolio_holding("h-2", "MSFT")).await.unwrap();
        // AAPL sources disagree, MSFT sources agree.
        store
            .upsert_source(source_row("h-1", "c-1", "AAPL", dec!(1000), dec!(100000)))
            .await
            .unwrap();
        store
            .upsert_source(source_row("h-1", "c-2", "AAPL", dec!(800), dec!(150000)))
            .await
            .unwrap();
        store
            .upsert_source(source_row("h-2", "c-1", "MSFT", dec!(500), dec!(200000)))
            .await
            .unwrap();
        store
            .upsert_source(source_row("h-2", "c-2", "MSFT", dec!(500), dec!(200000)))
            .await
            .unwrap();

        let service = ReconciliationService::new(store.clone(), ConflictResolver::default());
        let run_id = service
            .start("p-1", ReconciliationScope::Security("MSFT".to_string()))
            .unwrap();

        let run = wait_for_completion(&service, &run_id).await;
        let report = run.report.unwrap();
        assert_eq!(report.securities_checked, 1);
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_run_id_polls_as_none() {
        let store = Arc::new(MemoryStore::new());
        let service = ReconciliationService::new(store, ConflictResolver::default());
        assert!(service.get("missing").is_none());
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Quantity within 1% and value within 2% never flags a conflict.
        #[test]
        fn within_tolerances_never_conflicts(
            qty in 1_000i64..1_000_000,
            qty_bp in -100i64..=100,
            val in 10_000i64..10_000_000,
            val_bp in -200i64..=200,
        ) {
            let resolver = ConflictResolver::default();
            let existing_qty = Decimal::from(qty);
            let existing_val = Decimal::from(val);
            let incoming_qty = existing_qty + existing_qty * Decimal::new(qty_bp, 4);
            let incoming_val = existing_val + existing_val * Decimal::new(val_bp, 4);

            let existing = holding(existing_qty, existing_val);
            let incoming = platform_holding(incoming_qty, incoming_val);

            let assessment = resolver.detect_holding_conflict(&existing, &incoming);
            prop_assert!(!assessment.has_conflict);
        }

        /// Quantity over 1% always reports QUANTITY_MISMATCH at MEDIUM,
        /// regardless of value difference.
        #[test]
        fn quantity_breach_always_reported_first(
            qty in 1_000i64..1_000_000,
            qty_bp in 101i64..5_000,
            val in 10_000i64..10_000_000,
            val_bp in -5_000i64..=5_000,
        ) {
            let resolver = ConflictResolver::default();
            let existing_qty = Decimal::from(qty);
            let existing_val = Decimal::from(val);
            let incoming_qty = existing_qty + existing_qty * Decimal::new(qty_bp, 4);
            let incoming_val = existing_val + existing_val * Decimal::new(val_bp, 4);

            let existing = holding(existing_qty, existing_val);
            let incoming = platform_holding(incoming_qty, incoming_val);

            let assessment = resolver.detect_holding_conflict(&existing, &incoming);
            prop_assert!(assessment.has_conflict);
            prop_assert_eq!(assessment.conflict_type, Some(ConflictType::QuantityMismatch));
            prop_assert_eq!(assessment.severity, ConflictSeverity::Medium);
        }
    }
}
