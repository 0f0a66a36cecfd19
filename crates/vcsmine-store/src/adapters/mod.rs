//! Concrete adapters for the mined entity types

pub mod branch;
pub mod commit;
pub mod identity;

pub use branch::{BranchAdapter, BranchRows};
pub use commit::{CommitAdapter, CommitRows};
pub use identity::{IdentityAdapter, IdentityKeys, IdentityRows};
