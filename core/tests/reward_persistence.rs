mod common;

use affiliate_core::config::EngineConfig;
use affiliate_core::engine::OrgEngine;
use affiliate_core::error::CoreError;
use affiliate_core::model::{OrgEdgeRecord, UserRecord};
use affiliate_core::reward::compute_rewards;
use affiliate_core::store::SqlStore;
use chrono::Utc;
use common::{fund_table, investment, user};

fn seeded_engine() -> OrgEngine {
    let store = SqlStore::in_memory().unwrap();
    store.migrate().unwrap();
    OrgEngine::new(store, EngineConfig::default())
}

fn seed_member(store: &SqlStore, user_rec: UserRecord, upline: Option<&str>, level: i64) {
    let edge = OrgEdgeRecord {
        user_id: user_rec.user_id.clone(),
        level,
        pos: 0,
        upline: upline.map(str::to_string),
        depth_level: None,
    };
    store.upsert_users(&[user_rec]).unwrap();
    store.upsert_org_edges(&[edge]).unwrap();
}

/// A, A<-B, B<-C: C invests, A and B earn.
fn seed_three_level_org(engine: &OrgEngine) {
    seed_member(engine.store(), user("A"), None, 1);
    seed_member(engine.store(), user("B"), Some("A"), 2);
    seed_member(engine.store(), user("C"), Some("A-B-C"), 3);
}

#[test]
fn reward_run_writes_one_row_per_tier() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&forest).unwrap();

    assert_eq!(report.investments_processed, 1);
    assert_eq!(report.rewards_written, 2);

    let rows = engine.store().rewards_for_investment("inv-1").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user_id, "B"); // tier 1 = direct sponsor
    assert_eq!(rows[0].reward_amount, 5000.0);
    assert_eq!(rows[1].user_id, "A");
    assert_eq!(rows[1].reward_amount, 3000.0);
    assert!(rows.iter().all(|r| !r.is_paid));
}

#[test]
fn rerun_replaces_rows_instead_of_duplicating() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    engine.run_reward_calculation(&forest).unwrap();
    engine.run_reward_calculation(&forest).unwrap();

    assert_eq!(engine.store().reward_count().unwrap(), 2, "no duplicates");
    let rows = engine.store().rewards_for_investment("inv-1").unwrap();
    let pairs: Vec<(u32, f64)> = rows.iter().map(|r| (r.tier_level, r.reward_amount)).collect();
    assert_eq!(pairs, vec![(1, 5000.0), (2, 3000.0)]);
}

#[test]
fn paid_row_with_same_amount_is_left_untouched() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    engine.run_reward_calculation(&forest).unwrap();
    engine.store().mark_reward_paid("inv-1", 1).unwrap();

    let report = engine.run_reward_calculation(&forest).unwrap();
    assert_eq!(report.rewards_unchanged_paid, 1);
    assert_eq!(report.rewards_written, 1); // tier 2 rewritten, tier 1 untouched

    let rows = engine.store().rewards_for_investment("inv-1").unwrap();
    assert!(rows[0].is_paid, "payout must survive recomputation");
}

#[test]
fn paid_row_with_changed_amount_is_a_conflict_not_an_overwrite() {
    let store = SqlStore::in_memory().unwrap();
    store.migrate().unwrap();

    let table = fund_table(7, &[(1, 5.0)], 1);
    let inv = investment("inv-1", "C", 100_000.0, 7);
    let chain = vec!["B".to_string()];
    let rewards = compute_rewards(&inv, &chain, &table, Utc::now());
    store.replace_rewards_for_investment("inv-1", &rewards).unwrap();
    store.mark_reward_paid("inv-1", 1).unwrap();

    // Amount correction after payout: 200,000 instead of 100,000.
    let corrected = investment("inv-1", "C", 200_000.0, 7);
    let recomputed = compute_rewards(&corrected, &chain, &table, Utc::now());
    let err = store
        .replace_rewards_for_investment("inv-1", &recomputed)
        .unwrap_err();
    match err {
        CoreError::PaidRewardConflict {
            investment_id,
            tier_level,
            existing,
            recomputed,
        } => {
            assert_eq!(investment_id, "inv-1");
            assert_eq!(tier_level, 1);
            assert_eq!(existing, 5000.0);
            assert_eq!(recomputed, 10_000.0);
        }
        other => panic!("expected PaidRewardConflict, got {other:?}"),
    }

    // The paid row is untouched.
    let rows = store.rewards_for_investment("inv-1").unwrap();
    assert_eq!(rows[0].reward_amount, 5000.0);
    assert!(rows[0].is_paid);
}

#[test]
fn missing_fund_table_skips_and_reports() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    // Fund 7 has a table, fund 99 does not.
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0)], 1))
        .unwrap();
    engine
        .store()
        .insert_investments(&[
            investment("inv-1", "C", 100_000.0, 7),
            investment("inv-2", "C", 100_000.0, 99),
        ])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&forest).unwrap();

    assert_eq!(report.investments_processed, 1);
    assert_eq!(report.investments_skipped_no_table, 1);
    assert_eq!(report.funds_missing_table, vec![99]);
    assert!(engine.store().rewards_for_investment("inv-2").unwrap().is_empty());
}

#[test]
fn root_investor_writes_nothing_and_is_not_an_error() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0)], 1))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "A", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&forest).unwrap();
    assert_eq!(report.investments_processed, 1);
    assert_eq!(report.rewards_written, 0);
    assert_eq!(engine.store().reward_count().unwrap(), 0);
}

#[test]
fn targeted_recalculation_only_touches_named_investments() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0)], 1))
        .unwrap();
    engine
        .store()
        .insert_investments(&[
            investment("inv-1", "C", 100_000.0, 7),
            investment("inv-2", "B", 100_000.0, 7),
        ])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    let report = engine
        .recalculate_investments(&forest, &["inv-2".to_string()])
        .unwrap();
    assert_eq!(report.investments_processed, 1);
    assert!(engine.store().rewards_for_investment("inv-1").unwrap().is_empty());
    assert_eq!(engine.store().rewards_for_investment("inv-2").unwrap().len(), 1);
}

#[test]
fn chain_shortening_rerun_removes_stale_unpaid_tier() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    engine.run_reward_calculation(&forest).unwrap();
    assert_eq!(engine.store().reward_count().unwrap(), 2);

    // Data correction: C reports directly to A, so only one tier exists.
    seed_member(engine.store(), user("C"), Some("A"), 2);
    let corrected = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&corrected).unwrap();

    assert_eq!(report.rewards_stale_removed, 1);
    let rows = engine.store().rewards_for_investment("inv-1").unwrap();
    let pairs: Vec<(u32, &str, f64)> = rows
        .iter()
        .map(|r| (r.tier_level, r.user_id.as_str(), r.reward_amount))
        .collect();
    assert_eq!(pairs, vec![(1, "A", 5000.0)], "tier 2 must not linger");
}

#[test]
fn stale_paid_tier_is_kept_and_reported() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    engine.run_reward_calculation(&forest).unwrap();
    engine.store().mark_reward_paid("inv-1", 2).unwrap();

    seed_member(engine.store(), user("C"), Some("A"), 2);
    let corrected = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&corrected).unwrap();

    // The vanished tier was already paid out: the row stays, the report
    // flags it for reconciliation.
    assert_eq!(report.rewards_stale_paid, 1);
    assert_eq!(report.rewards_stale_removed, 0);
    let rows = engine.store().rewards_for_investment("inv-1").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].is_paid);
    assert_eq!(rows[1].tier_level, 2);
}

#[test]
fn investor_absent_from_forest_is_counted() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0)], 1))
        .unwrap();
    // Ledger entry for a user with no org record at all.
    engine
        .store()
        .insert_investments(&[investment("inv-1", "GHOST", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    let report = engine.run_reward_calculation(&forest).unwrap();

    assert_eq!(report.investments_processed, 1);
    assert_eq!(report.investors_not_in_org, 1);
    assert_eq!(report.rewards_written, 0);
}

#[test]
fn corrupt_reward_structure_is_an_error_not_an_empty_table() {
    // Shared-cache in-memory db so a second connection can plant the
    // corrupt row behind the store's back.
    let uri = "file:corrupt_reward_structure?mode=memory&cache=shared";
    let raw = rusqlite::Connection::open_with_flags(
        uri,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_URI,
    )
    .unwrap();
    let store = SqlStore::open(uri).unwrap();
    store.migrate().unwrap();

    raw.execute(
        "INSERT INTO fund_settings (
            fund_no, fund_name, fund_type, reward_structure, max_tier, is_active
         ) VALUES (7, '破損ファンド', 'domestic', 'tier1: oops', 1, 1)",
        [],
    )
    .unwrap();

    assert!(store.fund_table(7).is_err(), "bad JSON must not read back");
    assert!(store.active_fund_tables().is_err());
}

#[test]
fn unparseable_calculation_date_is_an_error() {
    let uri = "file:bad_calc_date?mode=memory&cache=shared";
    let raw = rusqlite::Connection::open_with_flags(
        uri,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_URI,
    )
    .unwrap();
    let store = SqlStore::open(uri).unwrap();
    store.migrate().unwrap();

    raw.execute(
        "INSERT INTO calculated_rewards (
            id, user_id, referral_user_id, investment_id, tier_level,
            reward_amount, fund_no, calculation_date, is_paid
         ) VALUES ('r1', 'A', 'C', 'inv-1', 1, 5000.0, 7, 'last tuesday', 0)",
        [],
    )
    .unwrap();

    assert!(store.rewards_for_investment("inv-1").is_err());
}

#[test]
fn per_fund_totals_split_paid_and_unpaid() {
    let engine = seeded_engine();
    seed_three_level_org(&engine);
    engine
        .store()
        .upsert_fund_table(&fund_table(7, &[(1, 5.0), (2, 3.0)], 2))
        .unwrap();
    engine
        .store()
        .insert_investments(&[investment("inv-1", "C", 100_000.0, 7)])
        .unwrap();

    let forest = engine.rebuild_forest().unwrap().forest;
    engine.run_reward_calculation(&forest).unwrap();
    engine.store().mark_reward_paid("inv-1", 1).unwrap();

    let totals = engine.store().reward_totals_by_fund().unwrap();
    assert_eq!(totals.len(), 1);
    let (fund_no, earned, paid, unpaid, count) = totals[0];
    assert_eq!(fund_no, 7);
    assert_eq!(earned, 8000.0);
    assert_eq!(paid, 5000.0);
    assert_eq!(unpaid, 3000.0);
    assert_eq!(count, 2);
}
