//! Transaction discipline
//!
//! A write runs between `begin` and `commit`. Any failure, including a failed
//! commit, triggers exactly one rollback attempt and the original error is
//! returned. A rollback failure is logged and never replaces that error.
//! Work that panics is rolled back while the panic unwinds. Nothing is
//! retried.

use crate::errors::Result;
use crate::session::Session;
use vcsmine_core::core_types::schema::EVENT_ROLLBACK_FAILED;
use vcsmine_core::errors::{ExError, ExErrorKind};

/// Rolls the transaction back if it is dropped while still open
struct OpenTransaction<'s> {
    session: &'s dyn Session,
    op: &'s str,
    open: bool,
}

impl Drop for OpenTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            let cause = ExError::new(ExErrorKind::Internal)
                .with_op(self.op)
                .with_message("transaction work panicked");
            rollback_once(self.session, self.op, &cause);
        }
    }
}

/// Run `f` inside one backend transaction
///
/// # Errors
///
/// Returns the error of `begin`, of `f` or of `commit`. Rollback errors are
/// logged only.
pub fn with_transaction<T, F>(session: &dyn Session, op: &str, f: F) -> Result<T>
where
    F: FnOnce(&dyn Session) -> Result<T>,
{
    session.begin()?;
    let mut guard = OpenTransaction {
        session,
        op,
        open: true,
    };

    let outcome = f(session).and_then(|value| session.commit().map(|()| value));
    guard.open = false;

    outcome.map_err(|err| {
        rollback_once(session, op, &err);
        err
    })
}

fn rollback_once(session: &dyn Session, op: &str, cause: &ExError) {
    if let Err(rollback_err) = session.rollback() {
        tracing::error!(
            component = module_path!(),
            op = op,
            event = EVENT_ROLLBACK_FAILED,
            err_code = rollback_err.code(),
            cause = %cause,
            "rollback failed: {}",
            rollback_err
        );
    }
}
