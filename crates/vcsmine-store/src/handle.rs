//! Store Handle
//!
//! The handle exclusively owns the backend session. Adapters borrow it per
//! call. Every access goes through one re-entrant lock: other threads are
//! serialized, while the owning thread may start a write from inside its own
//! read scope or nest one write inside another (the inner write joins the
//! enclosing transaction).

use crate::config::{HandleOptions, StoreConfig};
use crate::dialect::Dialect;
use crate::errors::{configuration, consistency_violation, illegal_state, Result};
use crate::session::{Cursor, Session, SqlValue};
use crate::sqlite::SqliteSession;
use crate::transaction::with_transaction;
use parking_lot::ReentrantMutex;
use std::cell::Cell;
use std::time::Instant;
use vcsmine_core::{log_op_end, log_op_error, log_op_start, EntityId};

struct SessionSlot {
    session: Box<dyn Session>,
    tx_depth: Cell<usize>,
}

/// Clears the transaction depth on every exit path, unwinding included
struct OutermostWrite<'s>(&'s Cell<usize>);

impl<'s> OutermostWrite<'s> {
    fn enter(depth: &'s Cell<usize>) -> Self {
        depth.set(1);
        Self(depth)
    }
}

impl Drop for OutermostWrite<'_> {
    fn drop(&mut self) {
        self.0.set(0);
    }
}

/// Shared owner of one backend session
pub struct StoreHandle {
    dialect: Dialect,
    options: HandleOptions,
    slot: ReentrantMutex<SessionSlot>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    /// Validate `config` and connect
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for invalid parameters or a dialect
    /// whose driver is not linked into this build, and a `Backend` error if
    /// the connection cannot be opened.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let start = Instant::now();
        let descriptor = config.connection_descriptor();
        log_op_start!("open", dialect = config.dialect.as_str(), target = %descriptor);

        let result = Self::connect(config).map(|session| Self::with_session(session, config.options()));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!("open", duration_ms = duration_ms, target = %descriptor);
            }
            Err(e) => log_op_error!("open", e, duration_ms = duration_ms, target = %descriptor),
        }
        result
    }

    fn connect(config: &StoreConfig) -> Result<Box<dyn Session>> {
        config.validate()?;
        match config.dialect {
            Dialect::Sqlite => {
                let path = config
                    .path
                    .as_ref()
                    .ok_or_else(|| configuration("sqlite store requires a non-empty 'path'"))?;
                Ok(Box::new(SqliteSession::open(path)?))
            }
            other => Err(configuration(format!(
                "no {} driver is linked into this build; attach a session with StoreHandle::with_session",
                other
            ))),
        }
    }

    /// Wrap an already connected session
    pub fn with_session(session: Box<dyn Session>, options: HandleOptions) -> Self {
        Self {
            dialect: session.dialect(),
            options,
            slot: ReentrantMutex::new(SessionSlot {
                session,
                tx_depth: Cell::new(0),
            }),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> HandleOptions {
        self.options
    }

    /// Run `f` against the session without opening a transaction
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn read<T>(&self, f: impl FnOnce(&dyn Session) -> Result<T>) -> Result<T> {
        let slot = self.slot.lock();
        f(slot.session.as_ref())
    }

    /// Run a query and hand its cursor to `f`
    ///
    /// The cursor is released when this call returns, whether `f` drained it,
    /// stopped early or failed.
    ///
    /// # Errors
    ///
    /// Returns backend errors and whatever `f` returns.
    pub fn query<T, F>(&self, sql: &str, params: &[SqlValue], f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<T>,
    {
        let slot = self.slot.lock();
        let mut f = Some(f);
        let mut out = None;
        slot.session.query(sql, params, &mut |cursor| {
            let f = f
                .take()
                .ok_or_else(|| illegal_state("query", "cursor visited twice"))?;
            out = Some(f(cursor)?);
            Ok(())
        })?;
        out.ok_or_else(|| illegal_state("query", "backend returned without opening a cursor"))
    }

    /// Run `f` as one write batch
    ///
    /// Holds the handle's lock for the whole statement-build-and-commit
    /// sequence and applies the transaction discipline. A write started
    /// inside another write on the same thread joins its transaction.
    ///
    /// # Errors
    ///
    /// Returns the first error of `f`, or of `begin`/`commit`.
    pub fn write<T>(
        &self,
        op: &str,
        entity: &str,
        f: impl FnOnce(&dyn Session) -> Result<T>,
    ) -> Result<T> {
        let slot = self.slot.lock();
        let start = Instant::now();
        log_op_start!(op, entity = entity);

        let depth = slot.tx_depth.get();
        let result = if depth > 0 {
            f(slot.session.as_ref())
        } else {
            let _outermost = OutermostWrite::enter(&slot.tx_depth);
            with_transaction(slot.session.as_ref(), op, f)
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration_ms, entity = entity);
            }
            Err(e) => log_op_error!(op, e, duration_ms = duration_ms, entity = entity),
        }
        result
    }

    /// Draw the next identifier from the entity's sequence
    ///
    /// # Errors
    ///
    /// Returns backend errors, and a `ConsistencyViolation` if the sequence
    /// yields no row or a non-positive value.
    pub fn next_id(&self, session: &dyn Session, entity: &str) -> Result<EntityId> {
        let sequence = Dialect::sequence_name(entity);
        let raw = session
            .query_i64(&self.dialect.next_id_statement(&sequence), &[])?
            .ok_or_else(|| {
                consistency_violation(
                    "next_id",
                    entity,
                    format!("sequence {} returned no value", sequence),
                )
            })?;
        EntityId::new(raw).map_err(|_| {
            consistency_violation(
                "next_id",
                entity,
                format!("sequence {} returned non-positive value {}", sequence, raw),
            )
        })
    }

    /// Close the underlying session
    ///
    /// # Errors
    ///
    /// Returns the backend's close error.
    pub fn close(self) -> Result<()> {
        self.slot.into_inner().session.close()
    }
}
