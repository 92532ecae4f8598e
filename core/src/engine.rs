//! Batch orchestration — the engine callers actually drive.
//!
//! Two batch jobs: rebuild the organization forest, and recompute
//! rewards for the investment ledger. Both page through the store with
//! bounded-retry fetches and return a structured report carrying the
//! primary output plus a diagnostics block, so operators can judge data
//! quality without cross-referencing logs.

use crate::{
    config::EngineConfig,
    error::CoreResult,
    fetch::{fetch_all_pages, id_chunks},
    model::{FundRewardTable, Investment, UserRecord},
    navigate,
    normalize::{self, NormalizeStats, RawRow},
    reward::compute_rewards,
    store::SqlStore,
    tree::{build_forest_with_order, BuildDiagnostics, ChildOrder, OrgForest},
    types::FundNo,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

pub struct OrgEngine {
    store: SqlStore,
    config: EngineConfig,
}

/// Forest rebuild output: the forest plus its build diagnostics.
pub struct ForestReport {
    pub forest: OrgForest,
    pub diagnostics: BuildDiagnostics,
}

/// Reward run output. `funds_missing_table` lists funds whose
/// investments were skipped — skipped, never defaulted to zero.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RewardRunReport {
    pub investments_processed: usize,
    pub investments_skipped_no_table: usize,
    /// Investors with a ledger entry but no node in the forest. Their
    /// investments produce no rows; counted so the gap is visible.
    pub investors_not_in_org: usize,
    pub rewards_written: usize,
    pub rewards_unchanged_paid: usize,
    /// Unpaid rows deleted because their tier vanished from the
    /// recomputed result (chain shortened, max_tier lowered).
    pub rewards_stale_removed: usize,
    /// Paid rows at vanished tiers, kept for operator reconciliation.
    pub rewards_stale_paid: usize,
    pub funds_missing_table: Vec<FundNo>,
}

impl OrgEngine {
    pub fn new(store: SqlStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Forest rebuild ────────────────────────────────────────

    /// Page through every joined user+org row and build a fresh forest.
    /// The previous forest, if any, stays valid for concurrent readers.
    pub fn rebuild_forest(&self) -> CoreResult<ForestReport> {
        self.rebuild_forest_with_order(ChildOrder::default())
    }

    pub fn rebuild_forest_with_order(&self, order: ChildOrder) -> CoreResult<ForestReport> {
        let rows = fetch_all_pages(self.config.page_size, &self.config.retry, |offset, limit| {
            self.store.org_members_page(offset, limit)
        })?;
        log::debug!("forest rebuild: {} org rows fetched", rows.len());
        let forest = build_forest_with_order(rows, order);
        let diagnostics = forest.diagnostics.clone();
        Ok(ForestReport { forest, diagnostics })
    }

    // ── Reward calculation ────────────────────────────────────

    /// Recompute rewards for the whole investment ledger against a built
    /// forest. Idempotent: re-running replaces unpaid rows in place,
    /// removes unpaid rows at tiers the new result no longer has, and
    /// leaves consistent paid rows alone.
    pub fn run_reward_calculation(&self, forest: &OrgForest) -> CoreResult<RewardRunReport> {
        let investments =
            fetch_all_pages(self.config.page_size, &self.config.retry, |offset, limit| {
                self.store.investments_page(offset, limit)
            })?;
        self.calculate_for_investments(forest, &investments)
    }

    /// Recompute rewards for a subset of the ledger (e.g. after a data
    /// correction touched specific investments).
    pub fn recalculate_investments(
        &self,
        forest: &OrgForest,
        investment_ids: &[String],
    ) -> CoreResult<RewardRunReport> {
        let mut investments = Vec::with_capacity(investment_ids.len());
        for chunk in id_chunks(investment_ids, self.config.id_chunk_size) {
            investments.extend(self.store.investments_by_ids(chunk)?);
        }
        self.calculate_for_investments(forest, &investments)
    }

    fn calculate_for_investments(
        &self,
        forest: &OrgForest,
        investments: &[Investment],
    ) -> CoreResult<RewardRunReport> {
        let tables: HashMap<FundNo, FundRewardTable> = self
            .store
            .active_fund_tables()?
            .into_iter()
            .map(|t| (t.fund_no, t))
            .collect();

        let mut report = RewardRunReport::default();
        let calculation_date = Utc::now();

        for investment in investments {
            let Some(table) = tables.get(&investment.fund_no) else {
                if !report.funds_missing_table.contains(&investment.fund_no) {
                    log::warn!(
                        "no reward table for fund {}; its investments are skipped",
                        investment.fund_no
                    );
                    report.funds_missing_table.push(investment.fund_no);
                }
                report.investments_skipped_no_table += 1;
                continue;
            };

            if forest.lookup(&investment.user_id).is_none() {
                report.investors_not_in_org += 1;
            }
            let chain = navigate::ancestor_chain(
                forest,
                &investment.user_id,
                table.max_tier as usize,
            );
            let rewards = compute_rewards(investment, &chain, table, calculation_date);
            let stats = self
                .store
                .replace_rewards_for_investment(&investment.id, &rewards)?;
            report.rewards_written += stats.written;
            report.rewards_unchanged_paid += stats.unchanged_paid;
            report.rewards_stale_removed += stats.stale_removed;
            report.rewards_stale_paid += stats.stale_paid_kept;
            report.investments_processed += 1;
        }

        report.funds_missing_table.sort_unstable();
        log::info!(
            "reward run: {} investments, {} rows written, {} skipped (no table)",
            report.investments_processed,
            report.rewards_written,
            report.investments_skipped_no_table
        );
        Ok(report)
    }

    // ── Imports (normalized at the boundary) ──────────────────

    pub fn import_user_rows(&self, rows: &[RawRow]) -> CoreResult<NormalizeStats> {
        let (users, stats) = normalize::normalize_users(rows);
        self.upsert_users_chunked(&users)?;
        Ok(stats)
    }

    pub fn import_org_rows(&self, rows: &[RawRow]) -> CoreResult<NormalizeStats> {
        let (edges, stats) = normalize::normalize_org_edges(rows);
        for chunk in edges.chunks(self.config.id_chunk_size) {
            self.store.upsert_org_edges(chunk)?;
        }
        Ok(stats)
    }

    pub fn import_investment_rows(&self, rows: &[RawRow]) -> CoreResult<NormalizeStats> {
        let (investments, stats) = normalize::normalize_investments(rows);
        for chunk in investments.chunks(self.config.id_chunk_size) {
            self.store.insert_investments(chunk)?;
        }
        Ok(stats)
    }

    fn upsert_users_chunked(&self, users: &[UserRecord]) -> CoreResult<()> {
        for chunk in users.chunks(self.config.id_chunk_size) {
            self.store.upsert_users(chunk)?;
        }
        Ok(())
    }
}
