//! Tests for connection health tracking.

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use super::*;

#[test]
fn test_new_connection_defaults() {
    let conn = Connection::new(Platform::Addepar, "p-1", "acct-9");
    assert_eq!(conn.status, ConnectionStatus::Connected);
    assert!(conn.auto_sync_enabled);
    assert_eq!(conn.sync_frequency_minutes, 24 * 60);
    assert_eq!(conn.error_count, 0);
    assert_eq!(conn.success_rate, dec!(1));
}

#[test]
fn test_record_success_resets_error_streak() {
    let mut conn = Connection::new(Platform::Orion, "p-1", "acct-9");
    let t0 = Utc::now();
    conn.record_failure("timeout".to_string(), t0);
    assert_eq!(conn.error_count, 1);
    assert_eq!(conn.status, ConnectionStatus::SyncFailed);

    conn.record_success(t0 + Duration::minutes(5));
    assert_eq!(conn.error_count, 0);
    assert!(conn.last_error.is_none());
    assert_eq!(conn.status, ConnectionStatus::Connected);
    assert!(conn.last_successful_sync_at.is_some());
    assert!(conn.next_sync_at.is_some());
}

#[test]
fn test_success_rate_is_rolling_ratio() {
    let mut conn = Connection::new(Platform::Carta, "p-1", "acct-9");
    let now = Utc::now();
    conn.record_success(now);
    conn.record_failure("boom".to_string(), now);
    conn.record_success(now);
    conn.record_success(now);

    assert_eq!(conn.total_syncs, 4);
    assert_eq!(conn.successful_syncs, 3);
    assert_eq!(conn.success_rate, dec!(0.75));
}

#[test]
fn test_sync_due_respects_frequency() {
    let mut conn = Connection::new(Platform::BlackDiamond, "p-1", "acct-9");
    conn.sync_frequency_minutes = 60;
    let now = Utc::now();

    assert!(conn.is_sync_due(now)); // never synced

    conn.record_success(now);
    assert!(!conn.is_sync_due(now + Duration::minutes(30)));
    assert!(conn.is_sync_due(now + Duration::minutes(61)));
}

#[test]
fn test_disconnect_is_soft_delete() {
    let mut conn = Connection::new(Platform::JuniperSquare, "p-1", "acct-9");
    conn.disconnect();
    assert_eq!(conn.status, ConnectionStatus::Disconnected);
    assert!(!conn.auto_sync_enabled);
    assert!(!conn.is_sync_due(Utc::now()));
}

#[test]
fn test_fund_admin_platforms() {
    assert!(Platform::JuniperSquare.is_fund_admin());
    assert!(Platform::Carta.is_fund_admin());
    assert!(!Platform::Addepar.is_fund_admin());
    assert!(!Platform::BlackDiamond.is_fund_admin());
    assert!(!Platform::Orion.is_fund_admin());
}
