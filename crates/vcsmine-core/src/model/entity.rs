//! The Entity Contract
//!
//! Every persisted type owns an [`Ident`] slot. The slot starts out unset and
//! receives a positive identifier from the store on the first successful save;
//! after that it can never change.

use crate::errors::EntityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw sentinel value of an identifier that has not been assigned yet
pub const UNSET_ID: i64 = -1;

/// A positive, store-assigned entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EntityId(i64);

impl EntityId {
    /// Validate a raw identifier
    pub fn new(raw: i64) -> Result<Self, EntityError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(EntityError::InvalidIdentifier { value: raw })
        }
    }

    /// Get the raw value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EntityId {
    type Error = EntityError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier slot owned by an entity
///
/// Serialized as the raw `i64` ([`UNSET_ID`] when unset). Deserializing a
/// non-positive raw value yields an unset slot, so imported records with id
/// `0` or `-1` are treated as never saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Ident(Option<EntityId>);

impl Ident {
    /// An unset slot
    pub fn unset() -> Self {
        Self(None)
    }

    /// Build a slot from a raw external value; non-positive means unset
    pub fn from_raw(raw: i64) -> Self {
        Self(EntityId::new(raw).ok())
    }

    pub fn get(&self) -> Option<EntityId> {
        self.0
    }

    /// Raw value, [`UNSET_ID`] when unset
    pub fn raw(&self) -> i64 {
        self.0.map_or(UNSET_ID, |id| id.get())
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Assign an identifier
    ///
    /// Assigning the identifier the slot already holds is a no-op.
    pub fn assign(&mut self, raw: i64) -> Result<EntityId, EntityError> {
        let id = EntityId::new(raw)?;
        match self.0 {
            Some(current) if current != id => Err(EntityError::IdentifierReassigned {
                current: current.get(),
                requested: raw,
            }),
            _ => {
                self.0 = Some(id);
                Ok(id)
            }
        }
    }
}

impl From<i64> for Ident {
    fn from(raw: i64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Ident> for i64 {
    fn from(ident: Ident) -> Self {
        ident.raw()
    }
}

/// Minimal interface of every persisted type
pub trait Entity {
    fn ident(&self) -> &Ident;

    fn ident_mut(&mut self) -> &mut Ident;

    /// The store-assigned identifier, `None` until the entity is saved
    fn id(&self) -> Option<EntityId> {
        self.ident().get()
    }

    /// Raw identifier, [`UNSET_ID`] until the entity is saved
    fn raw_id(&self) -> i64 {
        self.ident().raw()
    }

    /// Assign the identifier in place
    ///
    /// Fails with [`EntityError::InvalidIdentifier`] for non-positive values and
    /// [`EntityError::IdentifierReassigned`] when a different identifier is
    /// already held.
    fn set_id(&mut self, raw: i64) -> Result<EntityId, EntityError> {
        self.ident_mut().assign(raw)
    }

    fn is_persisted(&self) -> bool {
        self.ident().is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unset_slot() {
        let ident = Ident::unset();
        assert!(!ident.is_set());
        assert_eq!(ident.raw(), UNSET_ID);
        assert_eq!(ident.get(), None);
    }

    #[test]
    fn test_assign_rejects_non_positive() {
        let mut ident = Ident::unset();
        assert_eq!(
            ident.assign(0),
            Err(EntityError::InvalidIdentifier { value: 0 })
        );
        assert_eq!(
            ident.assign(-5),
            Err(EntityError::InvalidIdentifier { value: -5 })
        );
        assert!(!ident.is_set());
    }

    #[test]
    fn test_assign_is_write_once() {
        let mut ident = Ident::unset();
        assert_eq!(ident.assign(9).map(|id| id.get()), Ok(9));
        // Same value again is accepted
        assert!(ident.assign(9).is_ok());
        assert_eq!(
            ident.assign(10),
            Err(EntityError::IdentifierReassigned {
                current: 9,
                requested: 10
            })
        );
        assert_eq!(ident.raw(), 9);
    }

    #[test]
    fn test_serde_raw_representation() {
        assert_eq!(serde_json::to_string(&Ident::unset()).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Ident::from_raw(4)).unwrap(), "4");

        let zero: Ident = serde_json::from_str("0").unwrap();
        assert!(!zero.is_set());

        assert!(serde_json::from_str::<EntityId>("0").is_err());
        assert_eq!(serde_json::from_str::<EntityId>("12").unwrap().get(), 12);
    }

    proptest! {
        #[test]
        fn prop_from_raw_matches_sign(raw in any::<i64>()) {
            let ident = Ident::from_raw(raw);
            prop_assert_eq!(ident.is_set(), raw > 0);
            if raw > 0 {
                prop_assert_eq!(ident.raw(), raw);
            } else {
                prop_assert_eq!(ident.raw(), UNSET_ID);
            }
        }
    }
}
