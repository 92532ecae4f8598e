use super::SqlStore;
use crate::{error::CoreResult, model::OrgEdgeRecord, tree::OrgMemberRow};
use rusqlite::params;

impl SqlStore {
    // ── Organization rows ─────────────────────────────────────

    /// Idempotent batch write keyed by user_id.
    pub fn upsert_org_edges(&self, edges: &[OrgEdgeRecord]) -> CoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO org_levels (user_id, level, pos, upline, depth_level)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    level       = excluded.level,
                    pos         = excluded.pos,
                    upline      = excluded.upline,
                    depth_level = excluded.depth_level",
            )?;
            for e in edges {
                stmt.execute(params![e.user_id, e.level, e.pos, e.upline, e.depth_level])?;
            }
        }
        tx.commit()?;
        Ok(edges.len())
    }

    /// One page of organization rows joined with their user records,
    /// ordered by user_id. Rows without a matching user still come back:
    /// the builder owns that data-quality call, not the query.
    pub fn org_members_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<OrgMemberRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.user_id, o.level, o.pos, o.upline, o.depth_level,
                    u.kanji_last_name, u.kanji_first_name,
                    u.kana_last_name, u.kana_first_name, u.mail_address,
                    u.system_access, u.admin, u.status
             FROM org_levels o
             LEFT JOIN users u ON u.user_id = o.user_id
             ORDER BY o.user_id LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
            let user_id: String = row.get(0)?;
            Ok(OrgMemberRow {
                edge: OrgEdgeRecord {
                    user_id: user_id.clone(),
                    level: row.get(1)?,
                    pos: row.get(2)?,
                    upline: row.get(3)?,
                    depth_level: row.get(4)?,
                },
                user: crate::model::UserRecord {
                    user_id,
                    kanji_last_name: row.get(5)?,
                    kanji_first_name: row.get(6)?,
                    kana_last_name: row.get(7)?,
                    kana_first_name: row.get(8)?,
                    mail_address: row.get(9)?,
                    system_access: row.get::<_, Option<i64>>(10)?.unwrap_or(0) != 0,
                    admin: row.get::<_, Option<i64>>(11)?.unwrap_or(0) != 0,
                    status: match row.get::<_, Option<String>>(12)?.as_deref() {
                        Some("inactive") => crate::model::UserStatus::Inactive,
                        _ => crate::model::UserStatus::Active,
                    },
                },
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn org_edge_count(&self) -> CoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM org_levels", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
