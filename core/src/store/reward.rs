use super::SqlStore;
use crate::{
    error::{CoreError, CoreResult},
    model::CalculatedReward,
};
use rusqlite::{params, OptionalExtension};

/// Outcome of persisting one investment's recomputed rewards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardWriteStats {
    pub written: usize,
    /// Rows that already existed as paid with the same amount — left
    /// untouched, not an error.
    pub unchanged_paid: usize,
    /// Unpaid rows at tiers the recomputation no longer produces,
    /// deleted by the sweep.
    pub stale_removed: usize,
    /// Paid rows at tiers the recomputation no longer produces. Never
    /// deleted; kept and reported so an operator can reconcile them.
    pub stale_paid_kept: usize,
}

impl SqlStore {
    // ── Calculated rewards ────────────────────────────────────
    //
    // RULE: one row per (investment_id, tier_level). Recomputation
    // replaces unpaid rows and deletes unpaid rows at tiers the new
    // result no longer has, so a shortened chain cannot leave a phantom
    // reward behind. A paid row is never overwritten or deleted: same
    // amount → no-op, different amount → PaidRewardConflict, vanished
    // tier → kept and counted. The unique index backs the keying
    // structurally; the checks here turn would-be constraint bugs into
    // reportable outcomes.

    pub fn replace_rewards_for_investment(
        &self,
        investment_id: &str,
        rewards: &[CalculatedReward],
    ) -> CoreResult<RewardWriteStats> {
        let tx = self.conn.unchecked_transaction()?;
        let mut stats = RewardWriteStats::default();
        for reward in rewards {
            let existing: Option<(f64, bool)> = tx
                .query_row(
                    "SELECT reward_amount, is_paid FROM calculated_rewards
                     WHERE investment_id = ?1 AND tier_level = ?2",
                    params![reward.investment_id, reward.tier_level as i64],
                    |row| Ok((row.get(0)?, row.get::<_, i64>(1)? != 0)),
                )
                .optional()?;

            match existing {
                Some((amount, true)) => {
                    if (amount - reward.reward_amount).abs() > f64::EPSILON {
                        return Err(CoreError::PaidRewardConflict {
                            investment_id: reward.investment_id.clone(),
                            tier_level: reward.tier_level,
                            existing: amount,
                            recomputed: reward.reward_amount,
                        });
                    }
                    stats.unchanged_paid += 1;
                }
                _ => {
                    tx.execute(
                        "INSERT INTO calculated_rewards (
                            id, user_id, referral_user_id, investment_id, tier_level,
                            reward_amount, fund_no, calculation_date, is_paid
                         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)
                         ON CONFLICT(investment_id, tier_level) DO UPDATE SET
                            user_id          = excluded.user_id,
                            referral_user_id = excluded.referral_user_id,
                            reward_amount    = excluded.reward_amount,
                            fund_no          = excluded.fund_no,
                            calculation_date = excluded.calculation_date",
                        params![
                            reward.id,
                            reward.user_id,
                            reward.referral_user_id,
                            reward.investment_id,
                            reward.tier_level as i64,
                            reward.reward_amount,
                            reward.fund_no,
                            reward.calculation_date.to_rfc3339(),
                        ],
                    )?;
                    stats.written += 1;
                }
            }
        }

        // Sweep tiers absent from the recomputed set.
        let kept_tiers: Vec<i64> = rewards.iter().map(|r| r.tier_level as i64).collect();
        let existing_tiers: Vec<(i64, bool)> = {
            let mut stmt = tx.prepare(
                "SELECT tier_level, is_paid FROM calculated_rewards
                 WHERE investment_id = ?1",
            )?;
            let rows = stmt.query_map(params![investment_id], |row| {
                Ok((row.get(0)?, row.get::<_, i64>(1)? != 0))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        for (tier, is_paid) in existing_tiers {
            if kept_tiers.contains(&tier) {
                continue;
            }
            if is_paid {
                log::warn!(
                    "investment {investment_id}: paid reward at tier {tier} \
                     no longer produced by recomputation; row kept"
                );
                stats.stale_paid_kept += 1;
            } else {
                tx.execute(
                    "DELETE FROM calculated_rewards
                     WHERE investment_id = ?1 AND tier_level = ?2",
                    params![investment_id, tier],
                )?;
                stats.stale_removed += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    /// Rewards for one investment, ordered by tier.
    pub fn rewards_for_investment(&self, investment_id: &str) -> CoreResult<Vec<CalculatedReward>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, referral_user_id, investment_id, tier_level,
                    reward_amount, fund_no, calculation_date, is_paid
             FROM calculated_rewards WHERE investment_id = ?1 ORDER BY tier_level",
        )?;
        let rows = stmt.query_map(params![investment_id], reward_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// One page of a recipient's rewards, newest first.
    pub fn rewards_for_user_page(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> CoreResult<Vec<CalculatedReward>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, referral_user_id, investment_id, tier_level,
                    reward_amount, fund_no, calculation_date, is_paid
             FROM calculated_rewards WHERE user_id = ?1
             ORDER BY calculation_date DESC, id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![user_id, limit as i64, offset as i64],
            reward_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-fund totals: (fund_no, earned, paid, unpaid, count). The
    /// aggregation the portal's reward screen renders.
    pub fn reward_totals_by_fund(&self) -> CoreResult<Vec<(i64, f64, f64, f64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT fund_no,
                    SUM(reward_amount),
                    SUM(CASE WHEN is_paid = 1 THEN reward_amount ELSE 0 END),
                    SUM(CASE WHEN is_paid = 0 THEN reward_amount ELSE 0 END),
                    COUNT(*)
             FROM calculated_rewards GROUP BY fund_no ORDER BY fund_no",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Flip one reward to paid. Belongs to the external payout process;
    /// exposed here so tests can exercise the paid-conflict rule.
    pub fn mark_reward_paid(&self, investment_id: &str, tier_level: u32) -> CoreResult<()> {
        self.conn.execute(
            "UPDATE calculated_rewards SET is_paid = 1
             WHERE investment_id = ?1 AND tier_level = ?2",
            params![investment_id, tier_level as i64],
        )?;
        Ok(())
    }

    pub fn reward_count(&self) -> CoreResult<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM calculated_rewards", [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }
}

fn reward_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalculatedReward> {
    let date: String = row.get(7)?;
    Ok(CalculatedReward {
        id: row.get(0)?,
        user_id: row.get(1)?,
        referral_user_id: row.get(2)?,
        investment_id: row.get(3)?,
        tier_level: row.get::<_, i64>(4)? as u32,
        reward_amount: row.get(5)?,
        fund_no: row.get(6)?,
        calculation_date: date
            .parse::<chrono::DateTime<chrono::FixedOffset>>()
            .map(|d| d.with_timezone(&chrono::Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })?,
        is_paid: row.get::<_, i64>(8)? != 0,
    })
}
