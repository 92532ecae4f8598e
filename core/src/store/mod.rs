//! SQLite persistence layer — the record store adapter.
//!
//! RULE: Only the store modules talk to the database. The tree builder,
//! navigator and reward engine consume records; they never execute SQL.
//!
//! Read access is paginated (`LIMIT ?/OFFSET ?`); a page shorter than
//! its limit is the end-of-data signal. Point lookups chunk their id
//! lists to respect query-size limits. Writes are idempotent upserts
//! keyed per table, except the append-only investment ledger.

use crate::{
    error::CoreResult,
    model::{UserRecord, UserStatus},
};
use rusqlite::{params, Connection};

mod investment;
mod org;
mod reward;

pub use reward::RewardWriteStats;

pub struct SqlStore {
    conn: Connection,
}

impl SqlStore {
    /// Open (or create) the portal database at `path`.
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Users ─────────────────────────────────────────────────

    /// Idempotent batch write keyed by user_id.
    pub fn upsert_users(&self, users: &[UserRecord]) -> CoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO users (
                    user_id, kanji_last_name, kanji_first_name,
                    kana_last_name, kana_first_name, mail_address,
                    system_access, admin, status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(user_id) DO UPDATE SET
                    kanji_last_name  = excluded.kanji_last_name,
                    kanji_first_name = excluded.kanji_first_name,
                    kana_last_name   = excluded.kana_last_name,
                    kana_first_name  = excluded.kana_first_name,
                    mail_address     = excluded.mail_address,
                    system_access    = excluded.system_access,
                    admin            = excluded.admin,
                    status           = excluded.status",
            )?;
            for u in users {
                stmt.execute(params![
                    u.user_id,
                    u.kanji_last_name,
                    u.kanji_first_name,
                    u.kana_last_name,
                    u.kana_first_name,
                    u.mail_address,
                    u.system_access as i64,
                    u.admin as i64,
                    status_str(u.status),
                ])?;
            }
        }
        tx.commit()?;
        Ok(users.len())
    }

    /// One page of users ordered by user_id.
    pub fn users_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, kanji_last_name, kanji_first_name,
                    kana_last_name, kana_first_name, mail_address,
                    system_access, admin, status
             FROM users ORDER BY user_id LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Batched point lookup. `ids` must already be one store-sized chunk;
    /// callers chunk via `fetch::id_chunks`.
    pub fn users_by_ids(&self, ids: &[String]) -> CoreResult<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT user_id, kanji_last_name, kanji_first_name,
                    kana_last_name, kana_first_name, mail_address,
                    system_access, admin, status
             FROM users WHERE user_id IN ({placeholders}) ORDER BY user_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn user_count(&self) -> CoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn status_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Inactive => "inactive",
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user_id: row.get(0)?,
        kanji_last_name: row.get(1)?,
        kanji_first_name: row.get(2)?,
        kana_last_name: row.get(3)?,
        kana_first_name: row.get(4)?,
        mail_address: row.get(5)?,
        system_access: row.get::<_, i64>(6)? != 0,
        admin: row.get::<_, i64>(7)? != 0,
        status: if row.get::<_, String>(8)? == "inactive" {
            UserStatus::Inactive
        } else {
            UserStatus::Active
        },
    })
}
