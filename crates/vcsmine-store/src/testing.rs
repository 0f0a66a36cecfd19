//! Test kit: a recording session with fault injection
//!
//! [`ScriptedSession`] delegates to an in-memory SQLite database and records
//! every backend call in a shared [`SessionRecorder`]. The recorder stays with the
//! test while the session moves into a store handle.

use crate::dialect::Dialect;
use crate::errors::Result;
use crate::session::{QueryVisitor, Session, SqlValue};
use crate::sqlite::SqliteSession;
use parking_lot::Mutex;
use std::sync::Arc;
use vcsmine_core::errors::{ExError, ExErrorKind};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(String),
    Query(String),
    Begin,
    Commit,
    Rollback,
    Close,
}

impl Call {
    /// Whether the call sent a statement to the backend
    pub fn is_statement(&self) -> bool {
        matches!(self, Call::Execute(_) | Call::Query(_))
    }
}

#[derive(Debug)]
struct SqlFault {
    fragment: String,
    /// Matching statements still allowed through before the fault fires
    skip: usize,
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<Call>,
    fail_sql: Vec<SqlFault>,
    fail_commit: bool,
    fail_rollback: bool,
}

/// Shared view of a [`ScriptedSession`]'s recorded calls and faults
#[derive(Debug, Clone, Default)]
pub struct SessionRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl SessionRecorder {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Statements executed or queried, in order
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Execute(sql) | Call::Query(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn rollbacks(&self) -> usize {
        self.count(|c| *c == Call::Rollback)
    }

    pub fn commits(&self) -> usize {
        self.count(|c| *c == Call::Commit)
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Forget recorded calls; faults stay armed
    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    /// Fail every statement whose text contains `fragment`
    pub fn fail_sql_containing(&self, fragment: impl Into<String>) {
        self.fail_sql_containing_after(fragment, 0);
    }

    /// Let `skip` matching statements through, then fail every later one
    pub fn fail_sql_containing_after(&self, fragment: impl Into<String>, skip: usize) {
        self.state.lock().fail_sql.push(SqlFault {
            fragment: fragment.into(),
            skip,
        });
    }

    pub fn fail_commit(&self) {
        self.state.lock().fail_commit = true;
    }

    /// The inner transaction is still rolled back before the error is reported
    pub fn fail_rollback(&self) {
        self.state.lock().fail_rollback = true;
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn sql_fault(&self, sql: &str) -> Option<ExError> {
        let mut state = self.state.lock();
        let fault = state
            .fail_sql
            .iter_mut()
            .find(|fault| sql.contains(fault.fragment.as_str()))?;
        if fault.skip > 0 {
            fault.skip -= 1;
            return None;
        }
        Some(injected(
            "execute",
            format!("statement matching '{}'", fault.fragment),
        ))
    }
}

fn injected(op: &str, what: String) -> ExError {
    ExError::new(ExErrorKind::Backend)
        .with_op(op)
        .with_message(format!("injected failure: {}", what))
}

/// Recording, fault-injecting [`Session`] over in-memory SQLite
#[derive(Debug)]
pub struct ScriptedSession {
    inner: SqliteSession,
    recorder: SessionRecorder,
}

impl ScriptedSession {
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be opened.
    pub fn new() -> (Self, SessionRecorder) {
        let inner = SqliteSession::open_in_memory().expect("in-memory sqlite");
        let recorder = SessionRecorder::default();
        (
            Self {
                inner,
                recorder: recorder.clone(),
            },
            recorder,
        )
    }
}

impl Session for ScriptedSession {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.recorder.record(Call::Execute(sql.to_string()));
        if let Some(err) = self.recorder.sql_fault(sql) {
            return Err(err);
        }
        self.inner.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[SqlValue], visit: &mut QueryVisitor<'_>) -> Result<()> {
        self.recorder.record(Call::Query(sql.to_string()));
        if let Some(err) = self.recorder.sql_fault(sql) {
            return Err(err);
        }
        self.inner.query(sql, params, visit)
    }

    fn begin(&self) -> Result<()> {
        self.recorder.record(Call::Begin);
        self.inner.begin()
    }

    fn commit(&self) -> Result<()> {
        self.recorder.record(Call::Commit);
        if self.recorder.state.lock().fail_commit {
            return Err(injected("commit", "commit".to_string()));
        }
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.recorder.record(Call::Rollback);
        let outcome = self.inner.rollback();
        if self.recorder.state.lock().fail_rollback {
            return Err(injected("rollback", "rollback".to_string()));
        }
        outcome
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.recorder.record(Call::Close);
        Box::new(self.inner).close()
    }
}
