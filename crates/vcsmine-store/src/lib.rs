//! vcsmine Store - Relational persistence for mined version-control data
//!
//! Provides:
//! - Dialect abstraction over Derby, HSQLDB, PostgreSQL and SQLite SQL
//! - Store handle owning one backend session behind a re-entrant lock
//! - Transaction discipline for every write batch
//! - Streaming and grouped-aggregation entity iterators
//! - Adapters for identities, commits and branches

#![allow(clippy::result_large_err)]

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod dialect;
pub mod errors;
pub mod grouped;
pub mod handle;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod stream;
#[cfg(any(test, feature = "testkit"))]
pub mod testing;
pub mod transaction;

// Re-export key types
pub use adapter::{Adapter, Capability, Selection};
pub use adapters::{BranchAdapter, CommitAdapter, IdentityAdapter};
pub use config::{DeletePolicy, HandleOptions, StoreConfig};
pub use dialect::Dialect;
pub use errors::Result;
pub use grouped::{GroupState, GroupedStream, RowGrouping};
pub use handle::StoreHandle;
pub use session::{Cursor, MemoryCursor, Row, Session, SqlValue};
pub use sqlite::SqliteSession;
pub use stream::{Entities, EntityCursor, EntityStream, RowMapper};
