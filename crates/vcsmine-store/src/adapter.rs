//! Adapter Contract
//!
//! One adapter per entity type, bound to a shared [`StoreHandle`]. Each
//! adapter declares the subset of operations it implements; everything
//! outside that set fails with `Unsupported` before the backend is touched.
//!
//! The generic write paths live here:
//! - a batch runs as one transaction and stops at the first backend error
//! - identifiers drawn during a batch are applied to the entities only after
//!   the batch commits
//! - an update must affect exactly one row

use crate::config::DeletePolicy;
use crate::dialect::Dialect;
use crate::errors::{consistency_violation, invalid_argument, unsupported, Result};
use crate::handle::StoreHandle;
use crate::session::{Row, Session};
use crate::stream::{Entities, EntityCursor};
use vcsmine_core::{log_op_skipped, Entity, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateScheme,
    CreateIndexes,
    Load,
    LoadById,
    LoadByIds,
    Save,
    Update,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::CreateScheme,
        Capability::CreateIndexes,
        Capability::Load,
        Capability::LoadById,
        Capability::LoadByIds,
        Capability::Save,
        Capability::Update,
        Capability::Delete,
    ];

    pub fn op(&self) -> &'static str {
        match self {
            Capability::CreateScheme => "create_scheme",
            Capability::CreateIndexes => "create_indexes",
            Capability::Load => "load",
            Capability::LoadById => "load_by_id",
            Capability::LoadByIds => "load_by_ids",
            Capability::Save => "save",
            Capability::Update => "update",
            Capability::Delete => "delete",
        }
    }
}

/// Rows a scan reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every record, in canonical order
    All,
    /// The record(s) carrying one identifier
    Id(EntityId),
}

pub trait Adapter {
    type Entity: Entity;

    /// Identifiers drawn while writing one entity, applied after commit
    type Keys;

    const ENTITY: &'static str;

    const CAPABILITIES: &'static [Capability];

    fn handle(&self) -> &StoreHandle;

    fn supports(&self, capability: Capability) -> bool {
        Self::CAPABILITIES.contains(&capability)
    }

    /// # Errors
    ///
    /// Returns `Unsupported` when `capability` is outside the adapter's set.
    fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(unsupported(capability.op(), Self::ENTITY))
        }
    }

    /// DDL for the entity's tables and identifier sequences
    fn scheme_statements(&self, dialect: Dialect) -> Vec<String>;

    fn index_statements(&self, _dialect: Dialect) -> Vec<String> {
        Vec::new()
    }

    /// Build one entity from one row; performs no I/O
    ///
    /// # Errors
    ///
    /// Returns `Decode` for a row that does not fit the entity's layout.
    fn create(&self, row: &Row) -> Result<Self::Entity>;

    /// Issue the selection's query and hand its entity cursor to `f`
    ///
    /// # Errors
    ///
    /// Returns backend and decode errors, and whatever `f` returns.
    fn scan<T>(
        &self,
        selection: Selection,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Self::Entity>) -> Result<T>,
    ) -> Result<T>;

    fn insert_row(&self, session: &dyn Session, entity: &Self::Entity) -> Result<Self::Keys>;

    /// Rewrite a saved entity, returning the rows affected and fresh keys
    fn update_row(
        &self,
        _session: &dyn Session,
        _entity: &Self::Entity,
    ) -> Result<(usize, Self::Keys)> {
        Err(unsupported("update", Self::ENTITY))
    }

    fn delete_row(&self, _session: &dyn Session, _id: EntityId) -> Result<usize> {
        Err(unsupported("delete", Self::ENTITY))
    }

    fn assign_keys(&self, entity: &mut Self::Entity, keys: Self::Keys) -> Result<()>;

    /// Create the entity's tables and sequences
    ///
    /// Not idempotent: on an existing schema the backend rejects the DDL.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` or the backend error.
    fn create_scheme(&self) -> Result<()> {
        self.require(Capability::CreateScheme)?;
        let statements = self.scheme_statements(self.handle().dialect());
        self.handle().write("create_scheme", Self::ENTITY, |session| {
            for stmt in &statements {
                session.execute(stmt, &[])?;
            }
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns `Unsupported` or the backend error.
    fn create_indexes(&self) -> Result<()> {
        self.require(Capability::CreateIndexes)?;
        let statements = self.index_statements(self.handle().dialect());
        self.handle().write("create_indexes", Self::ENTITY, |session| {
            for stmt in &statements {
                session.execute(stmt, &[])?;
            }
            Ok(())
        })
    }

    /// Stream every record in canonical order
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, backend and decode errors, and whatever `f`
    /// returns.
    fn load_with<T>(
        &self,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Self::Entity>) -> Result<T>,
    ) -> Result<T> {
        self.require(Capability::Load)?;
        self.scan(Selection::All, f)
    }

    /// Every record, collected
    ///
    /// # Errors
    ///
    /// As [`Adapter::load_with`].
    fn load_all(&self) -> Result<Vec<Self::Entity>> {
        self.load_with(|cursor| Entities::new(cursor).collect())
    }

    /// Point lookup; `None` when nothing matches
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, backend and decode errors, and a
    /// `ConsistencyViolation` when more than one record carries `id`.
    fn load(&self, id: EntityId) -> Result<Option<Self::Entity>> {
        self.require(Capability::LoadById)?;
        self.lookup(id)
    }

    /// Batch point lookup, one query per identifier
    ///
    /// Identifiers without a record are skipped; the result keeps the order
    /// of `ids`.
    ///
    /// # Errors
    ///
    /// As [`Adapter::load`], for each identifier.
    fn load_many(&self, ids: &[EntityId]) -> Result<Vec<Self::Entity>> {
        self.require(Capability::LoadByIds)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.lookup(*id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    /// Yields a duplicate only when the scan maps rows one-to-one. Grouped
    /// scans fold rows sharing a key into one aggregate, so for them the
    /// primary key on the parent table is what keeps identifiers unique.
    #[doc(hidden)]
    fn lookup(&self, id: EntityId) -> Result<Option<Self::Entity>> {
        self.scan(Selection::Id(id), |cursor| {
            let mut matches = Entities::new(cursor);
            let first = matches.next().transpose()?;
            if first.is_some() && matches.next().transpose()?.is_some() {
                return Err(consistency_violation(
                    "load",
                    Self::ENTITY,
                    format!("identifier {} matches more than one record", id),
                )
                .with_entity_id(id.get()));
            }
            Ok(first)
        })
    }

    /// Insert unsaved entities and assign their identifiers
    ///
    /// Entities that already carry an identifier are updated instead.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, or the first backend error; in that case the
    /// whole batch is rolled back and no entity receives an identifier.
    fn save(&self, entities: &mut [Self::Entity]) -> Result<()> {
        self.require(Capability::Save)?;
        if entities.iter().any(|e| e.is_persisted()) {
            self.require(Capability::Update)?;
        }
        self.write_batch("save", entities)
    }

    /// Update saved entities by identifier; unsaved ones are inserted
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, the first backend error, or a
    /// `ConsistencyViolation` when an update does not affect exactly one row.
    fn update(&self, entities: &mut [Self::Entity]) -> Result<()> {
        self.require(Capability::Update)?;
        if entities.iter().any(|e| !e.is_persisted()) {
            self.require(Capability::Save)?;
        }
        self.write_batch("update", entities)
    }

    #[doc(hidden)]
    fn write_batch(&self, op: &str, entities: &mut [Self::Entity]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let keys = self.handle().write(op, Self::ENTITY, |session| {
            entities
                .iter()
                .map(|entity| match entity.id() {
                    None => self.insert_row(session, entity),
                    Some(id) => {
                        let (affected, keys) = self.update_row(session, entity)?;
                        if affected != 1 {
                            return Err(consistency_violation(
                                "update",
                                Self::ENTITY,
                                format!(
                                    "update of identifier {} affected {} rows, expected exactly 1",
                                    id, affected
                                ),
                            )
                            .with_entity_id(id.get()));
                        }
                        Ok(keys)
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;
        for (entity, keys) in entities.iter_mut().zip(keys) {
            self.assign_keys(entity, keys)?;
        }
        Ok(())
    }

    /// Remove one entity; `false` when nothing was removed
    ///
    /// # Errors
    ///
    /// As [`Adapter::delete_all`].
    fn delete(&self, entity: &Self::Entity) -> Result<bool> {
        self.delete_all(std::slice::from_ref(entity))
            .map(|removed| removed > 0)
    }

    /// Remove entities by identifier, returning the number of rows removed
    ///
    /// Unsaved entities follow the handle's [`DeletePolicy`]: with
    /// `LogAndSkip` they are logged and skipped, and a batch of only unsaved
    /// entities never reaches the backend.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, `InvalidArgument` for an unsaved entity under
    /// `Reject`, the first backend error, or a `ConsistencyViolation` when
    /// one identifier removes more than one row.
    fn delete_all(&self, entities: &[Self::Entity]) -> Result<usize> {
        self.require(Capability::Delete)?;
        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            match entity.id() {
                Some(id) => ids.push(id),
                None => match self.handle().options().delete_policy {
                    DeletePolicy::LogAndSkip => {
                        log_op_skipped!(
                            "delete",
                            entity = Self::ENTITY,
                            entity_id = entity.raw_id(),
                            "entity was never saved; nothing to delete"
                        );
                    }
                    DeletePolicy::Reject => {
                        return Err(invalid_argument(
                            "delete",
                            "entity was never saved; nothing to delete",
                        )
                        .with_entity(Self::ENTITY)
                        .with_entity_id(entity.raw_id()));
                    }
                },
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }

        self.handle().write("delete", Self::ENTITY, |session| {
            let mut removed = 0;
            for id in &ids {
                let affected = self.delete_row(session, *id)?;
                if affected > 1 {
                    return Err(consistency_violation(
                        "delete",
                        Self::ENTITY,
                        format!("identifier {} removed {} rows", id, affected),
                    )
                    .with_entity_id(id.get()));
                }
                removed += affected;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_ops_are_distinct() {
        let mut ops: Vec<&str> = Capability::ALL.iter().map(|c| c.op()).collect();
        ops.sort_unstable();
        ops.dedup();
        assert_eq!(ops.len(), Capability::ALL.len());
    }
}
