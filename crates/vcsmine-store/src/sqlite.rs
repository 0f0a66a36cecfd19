//! SQLite session
//!
//! The one backend linked into this build, used for embedded stores and
//! throughout the test suites.

use crate::dialect::Dialect;
use crate::errors::{decode, from_rusqlite, Result};
use crate::session::{Cursor, QueryVisitor, Row, Session, SqlValue};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;

/// Path that selects an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// SQLite-backed [`Session`]
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Open a database file, or an in-memory database for [`IN_MEMORY`]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path).map_err(from_rusqlite)?;
        configure(&conn)?;
        // WAL only applies to file databases
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(from_rusqlite)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
        configure(&conn)?;
        Ok(Self { conn })
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(from_rusqlite)
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => ValueRef::Null,
            SqlValue::Integer(v) => ValueRef::Integer(*v),
            SqlValue::Real(v) => ValueRef::Real(*v),
            SqlValue::Text(v) => ValueRef::Text(v.as_bytes()),
            SqlValue::Blob(v) => ValueRef::Blob(v.as_slice()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

struct SqliteCursor<'s> {
    rows: rusqlite::Rows<'s>,
    columns: usize,
}

impl Cursor for SqliteCursor<'_> {
    fn advance(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.rows.next().map_err(from_rusqlite)? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(self.columns);
        for idx in 0..self.columns {
            let value = match row.get_ref(idx).map_err(from_rusqlite)? {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(v) => SqlValue::Integer(v),
                ValueRef::Real(v) => SqlValue::Real(v),
                ValueRef::Text(bytes) => SqlValue::Text(
                    std::str::from_utf8(bytes)
                        .map_err(|e| decode(idx, e.to_string()))?
                        .to_string(),
                ),
                ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
            };
            values.push(value);
        }
        Ok(Some(Row::new(values)))
    }
}

impl Session for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)
    }

    fn query(&self, sql: &str, params: &[SqlValue], visit: &mut QueryVisitor<'_>) -> Result<()> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let columns = stmt.column_count();
        let rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;
        let mut cursor = SqliteCursor { rows, columns };
        visit(&mut cursor)
    }

    fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(from_rusqlite)
    }

    fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(from_rusqlite)
    }

    fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(from_rusqlite)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, err)| from_rusqlite(err))
    }
}
