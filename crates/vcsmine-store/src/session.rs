//! Backend session, cursor and row model
//!
//! A [`Session`] is one logical connection to a relational backend. Result
//! sets are only reachable through the scoped visitor of [`Session::query`],
//! so the underlying statement is released on every exit path, including a
//! consumer that stops iterating early or returns an error.

use crate::dialect::Dialect;
use crate::errors::{decode, invalid_argument, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use vcsmine_core::EntityId;

/// A single column value, owned
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

const NANOS_PER_SEC: i64 = 1_000_000_000;

impl SqlValue {
    /// Timestamps are stored as epoch nanoseconds
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for instants outside 1677-09-21..2262-04-11,
    /// which do not fit a 64-bit nanosecond count.
    pub fn timestamp(ts: DateTime<Utc>) -> Result<Self> {
        ts.timestamp_nanos_opt()
            .map(SqlValue::Integer)
            .ok_or_else(|| {
                invalid_argument(
                    "encode_timestamp",
                    format!("timestamp {} cannot be stored as epoch nanoseconds", ts),
                )
            })
    }

    /// # Errors
    ///
    /// As [`SqlValue::timestamp`].
    pub fn opt_timestamp(ts: Option<DateTime<Utc>>) -> Result<Self> {
        ts.map_or(Ok(SqlValue::Null), SqlValue::timestamp)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Integer(_) => "INTEGER",
            SqlValue::Real(_) => "REAL",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Blob(_) => "BLOB",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<EntityId> for SqlValue {
    fn from(id: EntityId) -> Self {
        SqlValue::Integer(id.get())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One materialized result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Result<&SqlValue> {
        self.values
            .get(idx)
            .ok_or_else(|| decode(idx, format!("row has only {} columns", self.values.len())))
    }

    pub fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(matches!(self.value(idx)?, SqlValue::Null))
    }

    pub fn get_i64(&self, idx: usize) -> Result<i64> {
        match self.value(idx)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(decode(idx, format!("expected INTEGER, found {}", other.type_name()))),
        }
    }

    pub fn get_opt_i64(&self, idx: usize) -> Result<Option<i64>> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            _ => self.get_i64(idx).map(Some),
        }
    }

    /// A stored identifier; must be positive
    pub fn get_id(&self, idx: usize) -> Result<EntityId> {
        let raw = self.get_i64(idx)?;
        EntityId::new(raw).map_err(|e| decode(idx, e.to_string()))
    }

    pub fn get_opt_id(&self, idx: usize) -> Result<Option<EntityId>> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            _ => self.get_id(idx).map(Some),
        }
    }

    pub fn get_string(&self, idx: usize) -> Result<String> {
        match self.value(idx)? {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(decode(idx, format!("expected TEXT, found {}", other.type_name()))),
        }
    }

    pub fn get_opt_string(&self, idx: usize) -> Result<Option<String>> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            _ => self.get_string(idx).map(Some),
        }
    }

    pub fn get_timestamp(&self, idx: usize) -> Result<DateTime<Utc>> {
        let nanos = self.get_i64(idx)?;
        DateTime::from_timestamp(
            nanos.div_euclid(NANOS_PER_SEC),
            nanos.rem_euclid(NANOS_PER_SEC) as u32,
        )
        .ok_or_else(|| decode(idx, format!("timestamp {} ns is out of range", nanos)))
    }

    pub fn get_opt_timestamp(&self, idx: usize) -> Result<Option<DateTime<Utc>>> {
        match self.value(idx)? {
            SqlValue::Null => Ok(None),
            _ => self.get_timestamp(idx).map(Some),
        }
    }
}

/// Forward-only result cursor
pub trait Cursor {
    /// Materialize the next row, `None` once the result set is exhausted
    fn advance(&mut self) -> Result<Option<Row>>;
}

/// Cursor over rows that are already in memory
#[derive(Debug, Default)]
pub struct MemoryCursor {
    rows: VecDeque<Row>,
}

impl MemoryCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for MemoryCursor {
    fn advance(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}

/// Scoped visitor over an open result cursor
pub type QueryVisitor<'v> = dyn FnMut(&mut dyn Cursor) -> Result<()> + 'v;

/// One logical connection to a relational backend
///
/// Implementations need not be `Sync`; the store handle serializes access.
pub trait Session: Send {
    fn dialect(&self) -> Dialect;

    /// Execute a statement, returning the number of affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Run a query and hand its cursor to `visit`
    ///
    /// The cursor is released when this call returns.
    fn query(&self, sql: &str, params: &[SqlValue], visit: &mut QueryVisitor<'_>) -> Result<()>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Close the connection
    fn close(self: Box<Self>) -> Result<()>;

    /// First column of the first row, if any row is returned
    fn query_i64(&self, sql: &str, params: &[SqlValue]) -> Result<Option<i64>> {
        let mut value = None;
        self.query(sql, params, &mut |cursor| {
            if let Some(row) = cursor.advance()? {
                value = Some(row.get_i64(0)?);
            }
            Ok(())
        })?;
        Ok(value)
    }
}
