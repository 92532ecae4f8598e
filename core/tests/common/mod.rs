//! Shared test fixtures.

#![allow(dead_code)]

use affiliate_core::model::{Investment, OrgEdgeRecord, UserRecord, UserStatus};
use affiliate_core::tree::OrgMemberRow;
use std::collections::BTreeMap;

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        user_id: id.to_string(),
        kanji_last_name: Some(format!("姓{id}")),
        kanji_first_name: Some(format!("名{id}")),
        kana_last_name: Some(format!("セイ{id}")),
        kana_first_name: Some(format!("メイ{id}")),
        mail_address: Some(format!("{}@example.jp", id.to_lowercase())),
        system_access: true,
        admin: false,
        status: UserStatus::Active,
    }
}

pub fn member(id: &str, upline: Option<&str>, level: i64) -> OrgMemberRow {
    OrgMemberRow {
        user: user(id),
        edge: OrgEdgeRecord {
            user_id: id.to_string(),
            level,
            pos: 0,
            upline: upline.map(str::to_string),
            depth_level: None,
        },
    }
}

pub fn investment(id: &str, user_id: &str, amount: f64, fund_no: i64) -> Investment {
    Investment {
        id: id.to_string(),
        user_id: user_id.to_string(),
        payment_date: None,
        amount,
        fund_no,
        fund_name: Some("テストファンド".to_string()),
        fund_type: Some("overseas".to_string()),
        commission_rate: None,
    }
}

pub fn fund_table(fund_no: i64, rates: &[(u32, f64)], max_tier: u32) -> affiliate_core::model::FundRewardTable {
    affiliate_core::model::FundRewardTable {
        fund_no,
        fund_name: format!("fund-{fund_no}"),
        fund_type: "overseas".to_string(),
        rates: rates.iter().copied().collect::<BTreeMap<_, _>>(),
        max_tier,
        is_active: true,
    }
}
