//! vcsmine Core - entity contract, error facility and logging facility
//!
//! This crate provides the foundational pieces shared by the persistence layer
//! and the mining code that consumes it:
//! - The Entity Contract (`Entity`, `Ident`, `EntityId`) and the mined domain
//!   entities (identities with their aliases, commits, branches)
//! - The canonical structured error facility (`ExError`, `ExErrorKind`)
//! - The structured logging facility (`init`, `log_op_*!` macros, test capture)

pub mod errors;
pub mod logging_facility;
pub mod model;

pub use vcsmine_core_types as core_types;

// Re-export commonly used types
pub use errors::{EntityError, ExError, ExErrorKind, Result};
pub use model::{Alias, Branch, Commit, Entity, EntityId, Ident, Identity, UNSET_ID};
