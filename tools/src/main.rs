//! org-runner: headless batch runner for the affiliate organization
//! and reward engine.
//!
//! Usage:
//!   org-runner --db portal.db rebuild
//!   org-runner --db portal.db rewards
//!   org-runner --db portal.db summary
//!   org-runner --db portal.db seed-funds

use affiliate_core::{
    config::EngineConfig,
    engine::OrgEngine,
    model::FundRewardTable,
    store::SqlStore,
};
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("portal.db");
    let page_size = args
        .windows(2)
        .find(|w| w[0] == "--page-size")
        .and_then(|w| w[1].parse().ok());
    let command = first_bare_arg(&args).unwrap_or("summary");

    let mut config = EngineConfig::default();
    if let Some(size) = page_size {
        config.page_size = size;
    }

    let store = SqlStore::open(db)?;
    store.migrate()?;
    let engine = OrgEngine::new(store, config);

    match command {
        "rebuild" => run_rebuild(&engine)?,
        "rewards" => run_rewards(&engine)?,
        "summary" => run_summary(&engine)?,
        "seed-funds" => run_seed_funds(&engine)?,
        other => bail!("unknown command: {other} (expected rebuild | rewards | summary | seed-funds)"),
    }

    Ok(())
}

/// First argument that is neither a flag nor a flag's value.
fn first_bare_arg(args: &[String]) -> Option<&str> {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next(); // skip the flag's value
        } else {
            return Some(arg.as_str());
        }
    }
    None
}

fn run_rebuild(engine: &OrgEngine) -> Result<()> {
    let report = engine.rebuild_forest()?;
    println!("organization forest rebuilt");
    println!("  nodes:              {}", report.diagnostics.node_count);
    println!("  roots:              {}", report.diagnostics.root_count);
    println!("  orphans:            {}", report.diagnostics.orphans);
    println!("  duplicates removed: {}", report.diagnostics.duplicates_removed);
    println!("  ambiguous uplines:  {}", report.diagnostics.ambiguous_uplines);
    println!("  cycles broken:      {}", report.diagnostics.cycles_broken);
    println!();
    println!("{}", serde_json::to_string_pretty(&report.diagnostics)?);
    Ok(())
}

fn run_rewards(engine: &OrgEngine) -> Result<()> {
    let forest_report = engine.rebuild_forest()?;
    let report = engine.run_reward_calculation(&forest_report.forest)?;
    println!("reward calculation complete");
    println!("  investments processed: {}", report.investments_processed);
    println!("  rewards written:       {}", report.rewards_written);
    println!("  skipped (no table):    {}", report.investments_skipped_no_table);
    if report.rewards_stale_removed > 0 {
        println!("  stale rows removed:    {}", report.rewards_stale_removed);
    }
    if report.rewards_stale_paid > 0 {
        println!("  stale PAID rows kept:  {}", report.rewards_stale_paid);
    }
    if report.investors_not_in_org > 0 {
        println!("  investors not in org:  {}", report.investors_not_in_org);
    }
    if !report.funds_missing_table.is_empty() {
        println!("  funds missing a reward table: {:?}", report.funds_missing_table);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_summary(engine: &OrgEngine) -> Result<()> {
    let store = engine.store();
    println!("portal database summary");
    println!("  users:        {}", store.user_count()?);
    println!("  org rows:     {}", store.org_edge_count()?);
    println!("  reward rows:  {}", store.reward_count()?);
    println!();
    println!("per-fund reward totals (earned / paid / unpaid / rows):");
    for (fund_no, earned, paid, unpaid, count) in store.reward_totals_by_fund()? {
        println!("  fund {fund_no}: ¥{earned:.0} / ¥{paid:.0} / ¥{unpaid:.0} / {count}");
    }
    Ok(())
}

/// Install the portal's standard fund reward tables.
fn run_seed_funds(engine: &OrgEngine) -> Result<()> {
    let domestic = FundRewardTable {
        fund_no: 1,
        fund_name: "国内物件標準".to_string(),
        fund_type: "domestic".to_string(),
        rates: BTreeMap::from([(1, 3.0)]),
        max_tier: 1,
        is_active: true,
    };
    let overseas = FundRewardTable {
        fund_no: 2,
        fund_name: "海外物件標準".to_string(),
        fund_type: "overseas".to_string(),
        rates: BTreeMap::from([(1, 5.0), (2, 3.0)]),
        max_tier: 2,
        is_active: true,
    };
    engine.store().upsert_fund_table(&domestic)?;
    engine.store().upsert_fund_table(&overseas)?;
    println!("seeded fund reward tables: domestic (3%), overseas (5% + 3%)");
    Ok(())
}
