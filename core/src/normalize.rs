//! Boundary normalization for imported row batches.
//!
//! Upload batches arrive as loose string maps whose headers may be
//! English or Japanese for the same logical field (mixed within one
//! file, even). One function per entity maps them to canonical records;
//! rows missing required fields are dropped and counted, never guessed.
//! The core never sees a raw row.

use crate::{
    model::{Investment, OrgEdgeRecord, UserRecord, UserStatus},
    types::FundNo,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// A raw upload row: header -> cell, as produced by the CSV reader.
pub type RawRow = HashMap<String, String>;

/// Outcome of normalizing one batch.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NormalizeStats {
    pub accepted: usize,
    /// Rows dropped for missing required fields.
    pub rejected: usize,
}

fn field<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| row.get(*name))
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn opt_string(row: &RawRow, names: &[&str]) -> Option<String> {
    field(row, names).map(str::to_string)
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
    }
}

/// Users: requires a user id and a mail address, matching the portal's
/// import filter.
pub fn normalize_users(rows: &[RawRow]) -> (Vec<UserRecord>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let user_id = field(row, &["user_id", "ユーザーID"]);
        let mail = field(row, &["mail_address", "メールアドレス"]);
        let (Some(user_id), Some(mail)) = (user_id, mail) else {
            stats.rejected += 1;
            continue;
        };
        out.push(UserRecord {
            user_id: user_id.to_string(),
            kanji_last_name: opt_string(row, &["kanji_last_name", "漢字姓"]),
            kanji_first_name: opt_string(row, &["kanji_first_name", "漢字名"]),
            kana_last_name: opt_string(row, &["kana_last_name", "カナ姓"]),
            kana_first_name: opt_string(row, &["kana_first_name", "カナ名"]),
            mail_address: Some(mail.to_string()),
            system_access: parse_bool(field(row, &["system_access_flg", "システム利用"]), true),
            admin: parse_bool(field(row, &["admin_flg", "管理者"]), false),
            status: UserStatus::Active,
        });
        stats.accepted += 1;
    }
    (out, stats)
}

/// Organization rows: requires a user id; everything else degrades to
/// defaults the way the portal's importer did.
pub fn normalize_org_edges(rows: &[RawRow]) -> (Vec<OrgEdgeRecord>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(user_id) = field(row, &["user_id", "ユーザーID"]) else {
            stats.rejected += 1;
            continue;
        };
        out.push(OrgEdgeRecord {
            user_id: user_id.to_string(),
            level: field(row, &["level", "レベル"])
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            pos: field(row, &["pos", "ポジション"])
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            upline: opt_string(row, &["upline", "上位ライン"]),
            depth_level: field(row, &["depth_level", "深度"]).and_then(|v| v.parse().ok()),
        });
        stats.accepted += 1;
    }
    (out, stats)
}

/// Investments: requires a user id, a fund number and a positive amount.
/// Fresh ledger ids are minted here; the ledger is append-only.
pub fn normalize_investments(rows: &[RawRow]) -> (Vec<Investment>, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let user_id = field(row, &["user_id", "ユーザーID"]);
        let fund_no: Option<FundNo> =
            field(row, &["fund_no", "ファンド番号"]).and_then(|v| v.parse().ok());
        let amount: Option<f64> = field(row, &["amount", "金額"]).and_then(|v| v.parse().ok());
        let (Some(user_id), Some(fund_no), Some(amount)) = (user_id, fund_no, amount) else {
            stats.rejected += 1;
            continue;
        };
        if amount <= 0.0 {
            stats.rejected += 1;
            continue;
        }
        out.push(Investment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            payment_date: field(row, &["payment_date", "支払日"])
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()),
            amount,
            fund_no,
            fund_name: opt_string(row, &["fund_name", "ファンド名"]),
            fund_type: opt_string(row, &["fund_type", "ファンド種別"]),
            commission_rate: field(row, &["commission_rate", "手数料率"])
                .and_then(|v| v.parse().ok()),
        });
        stats.accepted += 1;
    }
    (out, stats)
}
