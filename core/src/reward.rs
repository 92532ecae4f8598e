//! Tiered reward computation — the pure half of the reward engine.
//!
//! Given one investment, the investor's ancestor chain (immediate parent
//! first) and the fund's rate table, emit one reward line item per tier.
//! Persistence and the upsert/paid-conflict rules live in `store::reward`.

use crate::{
    model::{CalculatedReward, FundRewardTable, Investment},
    types::Tier,
    upline,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Round to whole yen, half away from zero. Reward amounts are JPY and
/// must match financial display expectations; banker's rounding is
/// deliberately not used.
pub fn round_half_up_yen(amount: f64) -> f64 {
    (amount.abs() + 0.5).floor() * amount.signum()
}

/// Compute the reward rows one investment owes its investor's upline.
///
/// Tiers run 1..=min(max_tier, chain length); a chain shorter than
/// `max_tier` simply yields fewer rows, and a tier without a rate in the
/// table yields none. A root investor (empty chain) produces no rows.
/// All rows come out unpaid.
pub fn compute_rewards(
    investment: &Investment,
    ancestor_chain: &[String],
    table: &FundRewardTable,
    calculation_date: DateTime<Utc>,
) -> Vec<CalculatedReward> {
    let reach = (table.max_tier as usize).min(ancestor_chain.len());
    let mut rewards = Vec::with_capacity(reach);

    for (idx, recipient) in ancestor_chain.iter().take(reach).enumerate() {
        let tier = (idx + 1) as Tier;
        let Some(rate) = table.rate(tier) else {
            continue;
        };
        let amount = round_half_up_yen(investment.amount * rate / 100.0);
        rewards.push(CalculatedReward {
            id: Uuid::new_v4().to_string(),
            user_id: recipient.clone(),
            referral_user_id: investment.user_id.clone(),
            investment_id: investment.id.clone(),
            tier_level: tier,
            reward_amount: amount,
            fund_no: investment.fund_no,
            calculation_date,
            is_paid: false,
        });
    }

    rewards
}

/// Ancestor chain derived straight from a full-path upline string,
/// reversed to immediate-parent-first. Only usable when the source row
/// carries the full-path encoding; chains from a built forest are the
/// normal path (`navigate::ancestor_chain`).
pub fn chain_from_upline(own_id: &str, raw_upline: Option<&str>) -> Vec<String> {
    let mut chain = upline::parse_upline(own_id, raw_upline).full_chain();
    chain.reverse();
    chain
}
