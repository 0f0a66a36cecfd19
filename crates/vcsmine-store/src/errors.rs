//! Error handling for vcsmine-store
//!
//! Wraps vcsmine-core ExError with store-specific constructors

use vcsmine_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Backend)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a configuration error (unknown dialect, malformed connection parameters)
pub fn configuration(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op("configure")
        .with_message(reason)
}

/// Create an error for an operation outside an adapter's capability set
pub fn unsupported(op: &str, entity: &str) -> ExError {
    ExError::new(ExErrorKind::Unsupported)
        .with_op(op)
        .with_entity(entity)
        .with_message(format!("{} is not supported for {} records", op, entity))
}

/// Create a consistency violation (duplicate identifier, unexpected affected-row count)
pub fn consistency_violation(op: &str, entity: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::ConsistencyViolation)
        .with_op(op)
        .with_entity(entity)
        .with_message(reason)
}

/// Create an error for a grouped result set that is not sorted by its key
pub fn ordering_violation(entity: &str, previous: i64, found: i64) -> ExError {
    ExError::new(ExErrorKind::OrderingViolation)
        .with_op("group_rows")
        .with_entity(entity)
        .with_entity_id(found)
        .with_message(format!(
            "grouping key {} arrived after key {}; rows must be sorted ascending by key",
            found, previous
        ))
}

/// Create an error for a call made in the wrong iterator/handle state
pub fn illegal_state(op: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::IllegalState)
        .with_op(op)
        .with_message(reason)
}

/// Create an error for `next` on an iterator with nothing ready
pub fn no_such_element(op: &str) -> ExError {
    ExError::new(ExErrorKind::NoSuchElement)
        .with_op(op)
        .with_message("no further element is available")
}

/// Create a row decoding error
pub fn decode(column: usize, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Decode)
        .with_op("decode_row")
        .with_message(format!("column {}: {}", column, reason.into()))
}

/// Create an argument error
pub fn invalid_argument(op: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidArgument)
        .with_op(op)
        .with_message(reason)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
