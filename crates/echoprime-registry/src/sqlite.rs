// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Durable ledger backed by SQLite.
//
// Schema:
//   prime_records(
//     seq         INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order
//     idx         INTEGER NOT NULL UNIQUE,            -- u64 index, bit-cast
//     p, q        TEXT    NOT NULL,                   -- decimal
//     score_p     INTEGER NOT NULL,                   -- fixed point, 10^18
//     score_q     INTEGER NOT NULL,
//     verified    INTEGER NOT NULL,                   -- 0 / 1
//     digest      TEXT    NOT NULL,                   -- SHA-256 hex
//     submitter   TEXT    NOT NULL,
//     recorded_at TEXT    NOT NULL                    -- RFC 3339
//   )
//   registry_auth(role, identity)   -- one 'owner' row, any 'submitter' rows
//   registry_events(seq, kind, payload JSON)
//
// Triggers abort any UPDATE or DELETE on prime_records.

use std::path::Path;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::{CollapseScore, Identity, Index, OracleTrace, RegistryRecord};

use crate::auth::AuthorizationState;
use crate::events::RegistryEvent;
use crate::store::LedgerStore;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS prime_records (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        idx INTEGER NOT NULL UNIQUE,
        p TEXT NOT NULL,
        q TEXT NOT NULL,
        score_p INTEGER NOT NULL,
        score_q INTEGER NOT NULL,
        verified INTEGER NOT NULL,
        digest TEXT NOT NULL,
        submitter TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );

    CREATE TRIGGER IF NOT EXISTS prime_records_no_update
    BEFORE UPDATE ON prime_records
    BEGIN
        SELECT RAISE(ABORT, 'prime records are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS prime_records_no_delete
    BEFORE DELETE ON prime_records
    BEGIN
        SELECT RAISE(ABORT, 'prime records are append-only');
    END;

    CREATE TABLE IF NOT EXISTS registry_auth (
        role TEXT NOT NULL CHECK (role IN ('owner', 'submitter')),
        identity TEXT NOT NULL,
        PRIMARY KEY (role, identity)
    );

    CREATE TABLE IF NOT EXISTS registry_events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        payload TEXT NOT NULL
    );
"#;

const RECORD_COLUMNS: &str =
    "idx, p, q, score_p, score_q, verified, digest, submitter, recorded_at";

fn db_err(e: rusqlite::Error) -> EchoPrimeError {
    EchoPrimeError::Database(e.to_string())
}

// u64 values are stored bit-for-bit in SQLite's signed INTEGER column.
fn to_sql_u64(value: u64) -> i64 {
    value as i64
}

fn from_sql_u64(value: i64) -> u64 {
    value as u64
}

/// A `prime_records` row before validation.
struct RawRecord {
    idx: i64,
    p: String,
    q: String,
    score_p: i64,
    score_q: i64,
    verified: bool,
    digest: String,
    submitter: String,
    recorded_at: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            idx: row.get(0)?,
            p: row.get(1)?,
            q: row.get(2)?,
            score_p: row.get(3)?,
            score_q: row.get(4)?,
            verified: row.get::<_, i32>(5)? != 0,
            digest: row.get(6)?,
            submitter: row.get(7)?,
            recorded_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<RegistryRecord> {
        let corrupt = |what: &str| EchoPrimeError::Database(format!("corrupt {what} in row {}", self.idx));
        let decimal = |s: &str, what: &str| {
            BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| corrupt(what))
        };
        let score = |raw: i64, what: &str| {
            CollapseScore::from_raw(from_sql_u64(raw)).ok_or_else(|| corrupt(what))
        };

        let trace = OracleTrace {
            index: Index::new(from_sql_u64(self.idx)).map_err(|_| corrupt("index"))?,
            p: decimal(&self.p, "p")?,
            q: decimal(&self.q, "q")?,
            score_p: score(self.score_p, "score_p")?,
            score_q: score(self.score_q, "score_q")?,
            verified: self.verified,
            digest: self.digest.clone(),
        };
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|_| corrupt("recorded_at"))?
            .with_timezone(&Utc);

        Ok(RegistryRecord {
            trace,
            submitter: Identity::new(self.submitter),
            recorded_at,
        })
    }
}

/// Ledger persisted in a SQLite database.
///
/// Synchronous like every `rusqlite` type; the registry serializes access
/// to it behind its own lock.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| EchoPrimeError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| EchoPrimeError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| EchoPrimeError::Database(format!("create schema: {e}")))?;

        info!("ledger database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EchoPrimeError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| EchoPrimeError::Database(format!("create schema: {e}")))?;

        debug!("in-memory ledger database opened");
        Ok(Self { conn })
    }
}

fn insert_events(tx: &rusqlite::Transaction<'_>, events: &[RegistryEvent]) -> Result<()> {
    for event in events {
        let payload = serde_json::to_string(event)?;
        tx.execute(
            "INSERT INTO registry_events (kind, payload) VALUES (?1, ?2)",
            params![event.kind(), payload],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

impl LedgerStore for SqliteLedger {
    fn authorization(&self) -> Result<Option<AuthorizationState>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role, identity FROM registry_auth ORDER BY identity")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_err)?;

        let mut owner = None;
        let mut submitters = Vec::new();
        for row in rows {
            let (role, identity) = row.map_err(db_err)?;
            match role.as_str() {
                "owner" => owner = Some(Identity::new(identity)),
                _ => submitters.push(Identity::new(identity)),
            }
        }
        Ok(owner.map(|owner| AuthorizationState::from_parts(owner, submitters)))
    }

    fn record(&self, index: Index) -> Result<Option<RegistryRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM prime_records WHERE idx = ?1"),
                params![to_sql_u64(index.get())],
                RawRecord::from_row,
            )
            .optional()
            .map_err(db_err)?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn contains(&self, index: Index) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM prime_records WHERE idx = ?1)",
                params![to_sql_u64(index.get())],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn indices(&self) -> Result<Vec<Index>> {
        let mut stmt = self
            .conn
            .prepare("SELECT idx FROM prime_records ORDER BY seq ASC")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0)).map_err(db_err)?;

        let mut indices = Vec::new();
        for row in rows {
            indices.push(Index::new(from_sql_u64(row.map_err(db_err)?))?);
        }
        Ok(indices)
    }

    fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM prime_records", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn events(&self) -> Result<Vec<RegistryEvent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM registry_events ORDER BY seq ASC")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(db_err)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str(&row.map_err(db_err)?)?);
        }
        Ok(events)
    }

    #[instrument(skip_all, fields(count = records.len()))]
    fn append_records(&mut self, records: &[RegistryRecord], events: &[RegistryEvent]) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;

        for record in records {
            let trace = &record.trace;
            let idx = to_sql_u64(trace.index.get());
            let exists: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM prime_records WHERE idx = ?1)",
                    params![idx],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            if exists {
                // Dropping the transaction rolls back earlier inserts.
                return Err(EchoPrimeError::AlreadySubmitted(trace.index));
            }

            tx.execute(
                &format!(
                    "INSERT INTO prime_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    idx,
                    trace.p.to_string(),
                    trace.q.to_string(),
                    to_sql_u64(trace.score_p.raw()),
                    to_sql_u64(trace.score_q.raw()),
                    i32::from(trace.verified),
                    trace.digest,
                    record.submitter.as_str(),
                    record.recorded_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        }
        insert_events(&tx, events)?;

        tx.commit().map_err(db_err)?;
        debug!("records committed");
        Ok(())
    }

    fn update_authorization(
        &mut self,
        auth: &AuthorizationState,
        events: &[RegistryEvent],
    ) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;

        tx.execute("DELETE FROM registry_auth", []).map_err(db_err)?;
        tx.execute(
            "INSERT INTO registry_auth (role, identity) VALUES ('owner', ?1)",
            params![auth.owner().as_str()],
        )
        .map_err(db_err)?;
        for submitter in auth.submitters() {
            tx.execute(
                "INSERT INTO registry_auth (role, identity) VALUES ('submitter', ?1)",
                params![submitter.as_str()],
            )
            .map_err(db_err)?;
        }
        insert_events(&tx, events)?;

        tx.commit().map_err(db_err)?;
        debug!("authorization committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{exercise_backend, record};

    #[test]
    fn sqlite_backend_contract() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        exercise_backend(&mut store);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let original = record(12, 83);
        {
            let mut store = SqliteLedger::open(&path).unwrap();
            let auth = AuthorizationState::from_parts(Identity::from("alice"), [Identity::from("bob")]);
            store.update_authorization(&auth, &[]).unwrap();
            store
                .append_records(
                    std::slice::from_ref(&original),
                    &[RegistryEvent::prime_verified(&original)],
                )
                .unwrap();
        }

        let store = SqliteLedger::open(&path).unwrap();
        let loaded = store.record(original.trace.index).unwrap().unwrap();
        assert_eq!(loaded.trace, original.trace);
        assert_eq!(loaded.submitter, original.submitter);
        assert_eq!(loaded.recorded_at, original.recorded_at);

        let auth = store.authorization().unwrap().unwrap();
        assert_eq!(auth.owner(), &Identity::from("alice"));
        assert!(auth.is_authorized(&Identity::from("bob")));
        assert_eq!(store.events().unwrap().len(), 1);
    }

    #[test]
    fn large_values_round_trip() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        let p = (BigUint::from(1u32) << 521u32) - 1u32;
        let trace = echoprime_trace::create_trace(
            Index::new(u64::MAX).unwrap(),
            p.clone(),
            (&p - 1u32) >> 1u32,
            CollapseScore::ONE,
            CollapseScore::from_ratio(1, 3),
            false,
        )
        .unwrap();
        let rec = RegistryRecord {
            trace,
            submitter: Identity::from("alice"),
            recorded_at: Utc::now(),
        };
        store.append_records(std::slice::from_ref(&rec), &[]).unwrap();

        assert_eq!(store.indices().unwrap(), vec![Index::new(u64::MAX).unwrap()]);
        let loaded = store.record(rec.trace.index).unwrap().unwrap();
        assert_eq!(loaded.trace, rec.trace);
        assert!(echoprime_trace::verify_trace(&loaded.trace).is_ok());
    }

    #[test]
    fn records_cannot_be_rewritten() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        store.append_records(&[record(1, 23)], &[]).unwrap();
        assert!(store.conn.execute("UPDATE prime_records SET verified = 0", []).is_err());
        assert!(store.conn.execute("DELETE FROM prime_records", []).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }
}
