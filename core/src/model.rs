//! Entity types persisted by the record store.
//!
//! These mirror the portal's relational schema one-to-one. Everything
//! reaching the tree builder or reward engine goes through these types —
//! raw CSV rows never cross the boundary (see `normalize`).

use crate::types::{FundNo, Tier, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An affiliate. Created by bulk import, updated by admin actions,
/// never hard-deleted — `status` is a soft flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub kanji_last_name: Option<String>,
    pub kanji_first_name: Option<String>,
    pub kana_last_name: Option<String>,
    pub kana_first_name: Option<String>,
    pub mail_address: Option<String>,
    pub system_access: bool,
    pub admin: bool,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        match (&self.kanji_last_name, &self.kanji_first_name) {
            (Some(last), Some(first)) => format!("{last} {first}"),
            (Some(last), None) => last.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) => self.user_id.clone(),
        }
    }
}

/// One row per user in the flattened organization table.
///
/// `upline` is NOT a clean parent pointer: depending on the import batch
/// it is either a single parent id or a full root-to-self path joined
/// with `-`. The `upline` module normalizes it; nothing else may parse it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrgEdgeRecord {
    pub user_id: UserId,
    /// Depth as declared by the source data. May disagree with the
    /// computed depth; kept for diagnostics and child ordering.
    pub level: i64,
    /// Sibling ordering hint from the source data.
    pub pos: i64,
    pub upline: Option<String>,
    pub depth_level: Option<i64>,
}

/// One investment. Append-only ledger semantics: immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Investment {
    pub id: String,
    pub user_id: UserId,
    pub payment_date: Option<NaiveDate>,
    pub amount: f64,
    pub fund_no: FundNo,
    pub fund_name: Option<String>,
    pub fund_type: Option<String>,
    pub commission_rate: Option<f64>,
}

/// Per-fund reward rates: tier number -> percentage.
///
/// Stored as JSON of the shape `{"tier1": 5, "tier2": 3}`; `max_tier`
/// bounds how far up the ancestor chain rewards cascade regardless of
/// which tiers carry a rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundRewardTable {
    pub fund_no: FundNo,
    pub fund_name: String,
    pub fund_type: String,
    pub rates: BTreeMap<Tier, f64>,
    pub max_tier: Tier,
    pub is_active: bool,
}

impl FundRewardTable {
    /// Rate in percent for a tier, if the table defines one.
    pub fn rate(&self, tier: Tier) -> Option<f64> {
        self.rates.get(&tier).copied()
    }

    /// Parse the persisted `{"tierN": rate}` JSON shape.
    pub fn rates_from_json(raw: &serde_json::Value) -> BTreeMap<Tier, f64> {
        let mut rates = BTreeMap::new();
        if let Some(map) = raw.as_object() {
            for (key, value) in map {
                let tier = match key.strip_prefix("tier").and_then(|n| n.parse::<Tier>().ok()) {
                    Some(t) if t >= 1 => t,
                    _ => continue,
                };
                if let Some(rate) = value.as_f64() {
                    rates.insert(tier, rate);
                }
            }
        }
        rates
    }

    /// Serialize rates back to the persisted JSON shape.
    pub fn rates_to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .rates
            .iter()
            .map(|(tier, rate)| (format!("tier{tier}"), serde_json::json!(rate)))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// One reward line item owed to an ancestor for one investment.
///
/// Unique per `(investment_id, tier_level)` — recomputation replaces,
/// never appends. `is_paid` is flipped by an external payout process;
/// the engine only ever writes unpaid rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculatedReward {
    pub id: String,
    /// Recipient — an ancestor of the investor.
    pub user_id: UserId,
    /// The investor whose investment generated this reward.
    pub referral_user_id: UserId,
    pub investment_id: String,
    pub tier_level: Tier,
    pub reward_amount: f64,
    pub fund_no: FundNo,
    pub calculation_date: DateTime<Utc>,
    pub is_paid: bool,
}
