use super::SqlStore;
use crate::{
    error::CoreResult,
    model::{FundRewardTable, Investment},
    types::FundNo,
};
use rusqlite::params;

impl SqlStore {
    // ── Investment ledger (append-only) ───────────────────────

    pub fn insert_investments(&self, investments: &[Investment]) -> CoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO investment_history (
                    id, user_id, payment_date, amount, fund_no,
                    fund_name, fund_type, commission_rate
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for inv in investments {
                stmt.execute(params![
                    inv.id,
                    inv.user_id,
                    inv.payment_date.map(|d| d.to_string()),
                    inv.amount,
                    inv.fund_no,
                    inv.fund_name,
                    inv.fund_type,
                    inv.commission_rate,
                ])?;
            }
        }
        tx.commit()?;
        Ok(investments.len())
    }

    /// One page of investments ordered by id.
    pub fn investments_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<Investment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, payment_date, amount, fund_no,
                    fund_name, fund_type, commission_rate
             FROM investment_history ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], investment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn investments_by_ids(&self, ids: &[String]) -> CoreResult<Vec<Investment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, user_id, payment_date, amount, fund_no,
                    fund_name, fund_type, commission_rate
             FROM investment_history WHERE id IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), investment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Fund reward tables ────────────────────────────────────

    pub fn upsert_fund_table(&self, table: &FundRewardTable) -> CoreResult<()> {
        self.conn.execute(
            "INSERT INTO fund_settings (
                fund_no, fund_name, fund_type, reward_structure, max_tier, is_active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(fund_no) DO UPDATE SET
                fund_name        = excluded.fund_name,
                fund_type        = excluded.fund_type,
                reward_structure = excluded.reward_structure,
                max_tier         = excluded.max_tier,
                is_active        = excluded.is_active",
            params![
                table.fund_no,
                table.fund_name,
                table.fund_type,
                table.rates_to_json().to_string(),
                table.max_tier as i64,
                table.is_active as i64,
            ],
        )?;
        Ok(())
    }

    pub fn fund_table(&self, fund_no: FundNo) -> CoreResult<Option<FundRewardTable>> {
        let mut stmt = self.conn.prepare(
            "SELECT fund_no, fund_name, fund_type, reward_structure, max_tier, is_active
             FROM fund_settings WHERE fund_no = ?1",
        )?;
        let mut rows = stmt.query_map(params![fund_no], fund_table_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn active_fund_tables(&self) -> CoreResult<Vec<FundRewardTable>> {
        let mut stmt = self.conn.prepare(
            "SELECT fund_no, fund_name, fund_type, reward_structure, max_tier, is_active
             FROM fund_settings WHERE is_active = 1 ORDER BY fund_no",
        )?;
        let rows = stmt.query_map([], fund_table_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn investment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Investment> {
    Ok(Investment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        payment_date: row
            .get::<_, Option<String>>(2)?
            .and_then(|d| d.parse().ok()),
        amount: row.get(3)?,
        fund_no: row.get(4)?,
        fund_name: row.get(5)?,
        fund_type: row.get(6)?,
        commission_rate: row.get(7)?,
    })
}

fn fund_table_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FundRewardTable> {
    let raw: String = row.get(3)?;
    // Corrupt JSON must surface, not decay into an empty table that
    // computes every reward as zero.
    let rates = serde_json::from_str(&raw)
        .map(|v| FundRewardTable::rates_from_json(&v))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(FundRewardTable {
        fund_no: row.get(0)?,
        fund_name: row.get(1)?,
        fund_type: row.get(2)?,
        rates,
        max_tier: row.get::<_, i64>(4)? as u32,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}
