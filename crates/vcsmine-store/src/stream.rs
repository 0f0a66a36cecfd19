//! Streaming cursor iterator
//!
//! [`EntityStream`] maps a forward-only cursor to entities, one per row, while
//! holding at most the current row.

use crate::errors::{illegal_state, Result};
use crate::session::{Cursor, Row};
use vcsmine_core::Entity;

/// Pure mapping from one materialized row to one entity
pub trait RowMapper {
    type Entity: Entity;

    /// Entity name used in error context
    const ENTITY: &'static str;

    /// Build an entity from `row` without performing any I/O
    fn create(&self, row: &Row) -> Result<Self::Entity>;
}

/// Single-pass entity iterator
///
/// Neither restartable nor safe for concurrent consumers.
pub trait EntityCursor {
    type Item;

    fn has_next(&mut self) -> Result<bool>;

    fn next_entity(&mut self) -> Result<Self::Item>;

    /// Adapt into a standard [`Iterator`]
    fn entities(&mut self) -> Entities<'_, Self>
    where
        Self: Sized,
    {
        Entities::new(self)
    }
}

/// [`Iterator`] over any [`EntityCursor`], including trait objects
///
/// Yields `Err` at most once; iteration ends after the first error.
pub struct Entities<'a, C: ?Sized> {
    cursor: &'a mut C,
    failed: bool,
}

impl<'a, C: EntityCursor + ?Sized> Entities<'a, C> {
    pub fn new(cursor: &'a mut C) -> Self {
        Self {
            cursor,
            failed: false,
        }
    }
}

impl<C: EntityCursor + ?Sized> Iterator for Entities<'_, C> {
    type Item = Result<C::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let step = match self.cursor.has_next() {
            Ok(true) => self.cursor.next_entity(),
            Ok(false) => return None,
            Err(e) => Err(e),
        };
        self.failed = step.is_err();
        Some(step)
    }
}

/// One entity per underlying row
pub struct EntityStream<'c, M: RowMapper> {
    cursor: &'c mut dyn Cursor,
    mapper: M,
    lookahead: Option<Row>,
    exhausted: bool,
}

impl<'c, M: RowMapper> EntityStream<'c, M> {
    pub fn new(cursor: &'c mut dyn Cursor, mapper: M) -> Self {
        Self {
            cursor,
            mapper,
            lookahead: None,
            exhausted: false,
        }
    }
}

impl<M: RowMapper> EntityCursor for EntityStream<'_, M> {
    type Item = M::Entity;

    fn has_next(&mut self) -> Result<bool> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        match self.cursor.advance()? {
            Some(row) => {
                self.lookahead = Some(row);
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn next_entity(&mut self) -> Result<M::Entity> {
        if !self.has_next()? {
            return Err(illegal_state("next", "stream is exhausted").with_entity(M::ENTITY));
        }
        match self.lookahead.take() {
            Some(row) => self
                .mapper
                .create(&row)
                .map_err(|e| e.with_entity(M::ENTITY)),
            None => Err(illegal_state("next", "stream is exhausted").with_entity(M::ENTITY)),
        }
    }
}
