//! Grouped aggregation iterator
//!
//! Collapses a flattened one-to-many join, where the parent columns repeat on
//! every child row, into one aggregate per parent. The cursor is read exactly
//! once and at most one row beyond the ready aggregate is ever held: the row
//! that revealed the group boundary, already folded into the next aggregate.
//!
//! Rows must arrive sorted by the grouping key. Nothing is sorted here; with
//! the ordering check disabled an unsorted input simply yields one aggregate
//! per run of equal keys.

use crate::errors::{no_such_element, ordering_violation, Result};
use crate::session::{Cursor, Row};
use crate::stream::{EntityCursor, RowMapper};
use vcsmine_core::errors::ExError;

/// Row layout of a flattened parent/child join
///
/// [`RowMapper::create`] starts an aggregate from the first row of a group,
/// including that row's child payload when present.
pub trait RowGrouping: RowMapper {
    /// Grouping (parent) key of `row`
    fn group_key(&self, row: &Row) -> Result<i64>;

    /// Fold the child payload of a further row of the same group
    fn merge(&self, aggregate: &mut Self::Entity, row: &Row) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// An aggregate is assembled and ready to yield
    Primed,
    /// Rows were seen and every aggregate has been yielded
    Draining,
    /// The cursor produced no rows at all
    Empty,
}

pub struct GroupedStream<'c, G: RowGrouping> {
    cursor: &'c mut dyn Cursor,
    grouping: G,
    ready: Option<G::Entity>,
    /// Aggregate under construction and its key
    pending: Option<(i64, G::Entity)>,
    check_ordering: bool,
    deferred: Option<ExError>,
    rows_consumed: usize,
}

impl<'c, G: RowGrouping> GroupedStream<'c, G> {
    /// Seed from the first row and assemble the first aggregate
    ///
    /// # Errors
    ///
    /// Returns backend or decode errors raised while assembling the first
    /// aggregate, and `OrderingViolation` for unsorted input when
    /// `check_ordering` is set.
    pub fn new(cursor: &'c mut dyn Cursor, grouping: G, check_ordering: bool) -> Result<Self> {
        let mut stream = Self {
            cursor,
            grouping,
            ready: None,
            pending: None,
            check_ordering,
            deferred: None,
            rows_consumed: 0,
        };
        if let Some(row) = stream.advance()? {
            let key = stream.keyed(&row)?;
            let aggregate = stream.start(&row)?;
            stream.pending = Some((key, aggregate));
            stream.fetch_next()?;
        }
        Ok(stream)
    }

    pub fn state(&self) -> GroupState {
        if self.ready.is_some() {
            GroupState::Primed
        } else if self.rows_consumed == 0 {
            GroupState::Empty
        } else {
            GroupState::Draining
        }
    }

    /// Rows read from the cursor so far
    pub fn rows_consumed(&self) -> usize {
        self.rows_consumed
    }

    fn advance(&mut self) -> Result<Option<Row>> {
        let row = self.cursor.advance()?;
        if row.is_some() {
            self.rows_consumed += 1;
        }
        Ok(row)
    }

    fn keyed(&self, row: &Row) -> Result<i64> {
        self.grouping
            .group_key(row)
            .map_err(|e| e.with_entity(G::ENTITY))
    }

    fn start(&self, row: &Row) -> Result<G::Entity> {
        self.grouping
            .create(row)
            .map_err(|e| e.with_entity(G::ENTITY))
    }

    /// Accumulate rows until a boundary or the end of the cursor
    ///
    /// Leaves the completed aggregate in `ready` and, at a boundary, the
    /// aggregate started from the boundary row in `pending`.
    fn fetch_next(&mut self) -> Result<()> {
        loop {
            let Some(key) = self.pending.as_ref().map(|(key, _)| *key) else {
                return Ok(());
            };
            let Some(row) = self.advance()? else {
                self.ready = self.pending.take().map(|(_, aggregate)| aggregate);
                return Ok(());
            };

            let row_key = self.keyed(&row)?;
            if row_key == key {
                if let Some((_, aggregate)) = self.pending.as_mut() {
                    self.grouping
                        .merge(aggregate, &row)
                        .map_err(|e| e.with_entity(G::ENTITY))?;
                }
                continue;
            }

            if self.check_ordering && row_key < key {
                return Err(ordering_violation(G::ENTITY, key, row_key));
            }
            let next = self.start(&row)?;
            self.ready = self
                .pending
                .replace((row_key, next))
                .map(|(_, aggregate)| aggregate);
            return Ok(());
        }
    }
}

impl<G: RowGrouping> EntityCursor for GroupedStream<'_, G> {
    type Item = G::Entity;

    fn has_next(&mut self) -> Result<bool> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        Ok(self.ready.is_some())
    }

    /// Yield the ready aggregate and prepare the following one
    ///
    /// An error raised while preparing the following aggregate is reported by
    /// the next call instead, so the aggregate in hand is never lost.
    fn next_entity(&mut self) -> Result<G::Entity> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let aggregate = self
            .ready
            .take()
            .ok_or_else(|| no_such_element("next").with_entity(G::ENTITY))?;
        if let Err(err) = self.fetch_next() {
            self.pending = None;
            self.deferred = Some(err);
        }
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryCursor, SqlValue};
    use vcsmine_core::errors::ExErrorKind;
    use vcsmine_core::{Alias, Entity, Identity};

    /// (parent id, child id, child email)
    struct Pairs;

    impl RowMapper for Pairs {
        type Entity = Identity;
        const ENTITY: &'static str = "identity";

        fn create(&self, row: &Row) -> Result<Identity> {
            let mut identity = Identity::new(format!("p{}", row.get_i64(0)?));
            identity.set_id(row.get_i64(0)?)?;
            self.merge(&mut identity, row)?;
            Ok(identity)
        }
    }

    impl RowGrouping for Pairs {
        fn group_key(&self, row: &Row) -> Result<i64> {
            row.get_i64(0)
        }

        fn merge(&self, aggregate: &mut Identity, row: &Row) -> Result<()> {
            let mut alias = Alias::new("alias", row.get_string(2)?);
            alias.set_id(row.get_i64(1)?)?;
            aggregate.add_alias(alias);
            Ok(())
        }
    }

    fn cursor(pairs: &[(i64, i64)]) -> MemoryCursor {
        MemoryCursor::new(
            pairs
                .iter()
                .map(|(p, c)| {
                    Row::new(vec![
                        SqlValue::Integer(*p),
                        SqlValue::Integer(*c),
                        SqlValue::Text(format!("c{}@example.org", c)),
                    ])
                })
                .collect(),
        )
    }

    fn child_ids(identity: &Identity) -> Vec<i64> {
        identity.aliases().iter().map(|a| a.raw_id()).collect()
    }

    #[test]
    fn test_boundary_waits_for_whole_group() {
        let mut rows = cursor(&[(1, 10), (1, 11), (2, 12)]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, true).unwrap();

        // Both rows of the first group and the boundary row have been read
        assert_eq!(stream.rows_consumed(), 3);
        assert_eq!(stream.state(), GroupState::Primed);

        let first = stream.next_entity().unwrap();
        assert_eq!(first.raw_id(), 1);
        assert_eq!(child_ids(&first), vec![10, 11]);

        let second = stream.next_entity().unwrap();
        assert_eq!(second.raw_id(), 2);
        assert_eq!(child_ids(&second), vec![12]);

        assert!(!stream.has_next().unwrap());
        assert_eq!(stream.state(), GroupState::Draining);
    }

    #[test]
    fn test_empty_cursor() {
        let mut rows = cursor(&[]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, true).unwrap();
        assert_eq!(stream.state(), GroupState::Empty);
        assert!(!stream.has_next().unwrap());
        assert!(!stream.has_next().unwrap());
        assert_eq!(
            stream.next_entity().unwrap_err().kind(),
            ExErrorKind::NoSuchElement
        );
    }

    #[test]
    fn test_single_row() {
        let mut rows = cursor(&[(7, 70)]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, true).unwrap();
        let only = stream.next_entity().unwrap();
        assert_eq!(child_ids(&only), vec![70]);
        assert!(!stream.has_next().unwrap());
    }

    #[test]
    fn test_duplicate_child_rows_collapse() {
        let mut rows = cursor(&[(1, 10), (1, 10), (1, 11)]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, true).unwrap();
        assert_eq!(child_ids(&stream.next_entity().unwrap()), vec![10, 11]);
    }

    #[test]
    fn test_descending_key_is_ordering_violation() {
        let mut rows = cursor(&[(2, 20), (1, 10)]);
        let err = GroupedStream::new(&mut rows, Pairs, true).err().unwrap();
        assert_eq!(err.kind(), ExErrorKind::OrderingViolation);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unchecked_unsorted_input_yields_runs() {
        let mut rows = cursor(&[(1, 10), (2, 20), (1, 11)]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, false).unwrap();
        let keys: Vec<i64> = stream.entities().map(|a| a.unwrap().raw_id()).collect();
        assert_eq!(keys, vec![1, 2, 1]);
    }

    #[test]
    fn test_error_after_boundary_is_deferred() {
        let mut rows = MemoryCursor::new(vec![
            Row::new(vec![
                SqlValue::Integer(1),
                SqlValue::Integer(10),
                SqlValue::Text("a@example.org".into()),
            ]),
            Row::new(vec![
                SqlValue::Integer(2),
                SqlValue::Integer(20),
                SqlValue::Text("b@example.org".into()),
            ]),
            Row::new(vec![
                SqlValue::Integer(2),
                SqlValue::Integer(21),
                SqlValue::Null,
            ]),
        ]);
        let mut stream = GroupedStream::new(&mut rows, Pairs, true).unwrap();

        // The first aggregate is intact even though the next group is corrupt
        assert_eq!(child_ids(&stream.next_entity().unwrap()), vec![10]);
        let err = stream.has_next().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Decode);
        assert_eq!(err.entity(), Some("identity"));
        assert!(!stream.has_next().unwrap());
    }
}
