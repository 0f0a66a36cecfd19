//! Canonical logging macros
//!
//! Every macro emits `component`, `op` and `event`; the caller supplies any
//! further structured fields.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use vcsmine_core::log_op_start;
/// log_op_start!("save");
/// log_op_start!("save", entity = "commit", rows = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use vcsmine_core::log_op_end;
/// log_op_end!("save", duration_ms = 4);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// `$err` is an `ExError` (or a reference to one). Its display text is the
/// event message; extra fields go before it.
///
/// # Example
///
/// ```
/// # use vcsmine_core::log_op_error;
/// # use vcsmine_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Backend);
/// log_op_error!("save", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: &$crate::errors::ExError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            "{}",
            ex_err
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: &$crate::errors::ExError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*,
            "{}",
            ex_err
        );
    }};
}

/// Log an operation that was deliberately skipped (soft condition)
///
/// # Example
///
/// ```
/// # use vcsmine_core::log_op_skipped;
/// log_op_skipped!("delete", entity = "commit", "entity has no identifier");
/// ```
#[macro_export]
macro_rules! log_op_skipped {
    ($op:expr, $($field:tt)*) => {
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_SKIPPED,
            $($field)*
        );
    };
}
