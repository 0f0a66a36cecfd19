// Integration tests for the Entity Contract across the mined entity types

use chrono::{DateTime, Utc};
use vcsmine_core::{
    Alias, Branch, Commit, Entity, EntityError, ExError, ExErrorKind, Identity, UNSET_ID,
};

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn assert_contract<E: Entity>(mut entity: E) {
    // Given: a freshly built entity
    assert_eq!(entity.id(), None);
    assert_eq!(entity.raw_id(), UNSET_ID);

    // When: an invalid identifier is supplied
    let err: ExError = entity.set_id(0).unwrap_err().into();

    // Then: it is rejected as an argument error and the slot stays unset
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert!(!entity.is_persisted());

    // When: a valid identifier is assigned
    let id = entity.set_id(17).unwrap();
    assert_eq!(id.get(), 17);
    assert_eq!(entity.id(), Some(id));

    // Then: a different identifier can never replace it
    assert_eq!(
        entity.set_id(18),
        Err(EntityError::IdentifierReassigned {
            current: 17,
            requested: 18
        })
    );
    assert_eq!(entity.raw_id(), 17);
}

#[test]
fn test_identity_follows_contract() {
    assert_contract(Identity::new("Grace"));
}

#[test]
fn test_alias_follows_contract() {
    assert_contract(Alias::new("grace", "grace@example.org"));
}

#[test]
fn test_commit_follows_contract() {
    assert_contract(Commit::new("c0ffee", at(1_000)));
}

#[test]
fn test_branch_follows_contract() {
    assert_contract(Branch::new("release/1.0", at(2_000)));
}

#[test]
fn test_identity_json_round_trip_keeps_aliases() {
    let mut identity = Identity::new("Grace").with_primary_email("grace@example.org");
    identity.set_id(3).unwrap();
    identity.add_alias(Alias::new("grace", "grace@example.org"));
    identity.add_alias(Alias::new("ghopper", "gh@example.org"));

    let json = serde_json::to_string(&identity).unwrap();
    let back: Identity = serde_json::from_str(&json).unwrap();

    assert_eq!(back, identity);
    assert_eq!(back.aliases()[1].raw_id(), UNSET_ID);
}
