pub mod branch;
pub mod commit;
pub mod entity;
pub mod identity;

pub use branch::Branch;
pub use commit::Commit;
pub use entity::{Entity, EntityId, Ident, UNSET_ID};
pub use identity::{Alias, Identity};
