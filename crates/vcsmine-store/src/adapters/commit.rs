use crate::adapter::{Adapter, Capability, Selection};
use crate::dialect::Dialect;
use crate::errors::{invalid_argument, Result};
use crate::handle::StoreHandle;
use crate::schema::{ColumnDef, ColumnType, TableDef};
use crate::session::{Row, Session, SqlValue};
use crate::stream::{EntityCursor, EntityStream, RowMapper};
use chrono::{DateTime, Utc};
use vcsmine_core::{Commit, Entity, EntityId};

pub const COMMITS: TableDef = TableDef {
    name: "commits",
    columns: &[
        ColumnDef::id(),
        ColumnDef::required("revision", ColumnType::Text),
        ColumnDef::optional("author_id", ColumnType::BigInt),
        ColumnDef::optional("branch_id", ColumnType::BigInt),
        ColumnDef::required("committed_at", ColumnType::BigInt),
        ColumnDef::required("message", ColumnType::LongText),
        ColumnDef::required("lines_added", ColumnType::BigInt),
        ColumnDef::required("lines_removed", ColumnType::BigInt),
    ],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitRows;

impl RowMapper for CommitRows {
    type Entity = Commit;
    const ENTITY: &'static str = "commit";

    fn create(&self, row: &Row) -> Result<Commit> {
        let mut commit = Commit::new(row.get_string(1)?, row.get_timestamp(4)?)
            .with_message(row.get_string(5)?)
            .with_churn(row.get_i64(6)?, row.get_i64(7)?);
        commit.author_id = row.get_opt_id(2)?;
        commit.branch_id = row.get_opt_id(3)?;
        commit.set_id(row.get_i64(0)?)?;
        Ok(commit)
    }
}

/// Non-identifier column values, in table order
fn payload(commit: &Commit) -> Result<Vec<SqlValue>> {
    Ok(vec![
        commit.revision.as_str().into(),
        commit.author_id.into(),
        commit.branch_id.into(),
        SqlValue::timestamp(commit.committed_at)?,
        commit.message.as_str().into(),
        commit.lines_added.into(),
        commit.lines_removed.into(),
    ])
}

/// Adapter for [`Commit`] records, streamed one per row
#[derive(Debug, Clone, Copy)]
pub struct CommitAdapter<'h> {
    handle: &'h StoreHandle,
}

impl<'h> CommitAdapter<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }

    fn stream<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
        f: impl FnOnce(&mut dyn EntityCursor<Item = Commit>) -> Result<T>,
    ) -> Result<T> {
        self.handle.query(sql, params, |cursor| {
            let mut stream = EntityStream::new(cursor, CommitRows);
            f(&mut stream)
        })
    }

    /// Stream commits with `from <= committed_at < to`, oldest first
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `to` precedes `from`, otherwise as
    /// [`Adapter::load_with`].
    pub fn scan_between<T>(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Commit>) -> Result<T>,
    ) -> Result<T> {
        self.require(Capability::Load)?;
        if to < from {
            return Err(invalid_argument(
                "scan_between",
                format!("window end {} precedes its start {}", to, from),
            )
            .with_entity(Self::ENTITY));
        }
        let dialect = self.handle.dialect();
        let sql = format!(
            "SELECT {} FROM {} WHERE committed_at >= {} AND committed_at < {} ORDER BY committed_at, id",
            COMMITS.select_list(None),
            COMMITS.name,
            dialect.placeholder(1),
            dialect.placeholder(2)
        );
        let window = [SqlValue::timestamp(from)?, SqlValue::timestamp(to)?];
        self.stream(&sql, &window, f)
    }
}

impl Adapter for CommitAdapter<'_> {
    type Entity = Commit;
    type Keys = EntityId;

    const ENTITY: &'static str = "commit";

    const CAPABILITIES: &'static [Capability] = &Capability::ALL;

    fn handle(&self) -> &StoreHandle {
        self.handle
    }

    fn scheme_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut statements = dialect.create_sequence_statements(&Dialect::sequence_name(Self::ENTITY));
        statements.push(dialect.create_table_statement(&COMMITS));
        statements
    }

    fn index_statements(&self, dialect: Dialect) -> Vec<String> {
        vec![
            dialect.create_index_statement("idx_commits_committed_at", COMMITS.name, &["committed_at"]),
            dialect.create_index_statement("idx_commits_author_id", COMMITS.name, &["author_id"]),
        ]
    }

    fn create(&self, row: &Row) -> Result<Commit> {
        CommitRows.create(row)
    }

    fn scan<T>(
        &self,
        selection: Selection,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Commit>) -> Result<T>,
    ) -> Result<T> {
        let select = format!("SELECT {} FROM {}", COMMITS.select_list(None), COMMITS.name);
        match selection {
            Selection::All => self.stream(&format!("{} ORDER BY id", select), &[], f),
            Selection::Id(id) => self.stream(
                &format!("{} WHERE id = {}", select, self.handle.dialect().placeholder(1)),
                &[id.into()],
                f,
            ),
        }
    }

    fn insert_row(&self, session: &dyn Session, commit: &Commit) -> Result<EntityId> {
        let id = self.handle.next_id(session, Self::ENTITY)?;
        let mut values = vec![id.into()];
        values.extend(payload(commit)?);
        session.execute(&COMMITS.insert_statement(self.handle.dialect()), &values)?;
        Ok(id)
    }

    fn update_row(&self, session: &dyn Session, commit: &Commit) -> Result<(usize, EntityId)> {
        let Some(id) = commit.id() else {
            return self.insert_row(session, commit).map(|id| (1, id));
        };
        let mut values = payload(commit)?;
        values.push(id.into());
        let affected = session.execute(&COMMITS.update_statement(self.handle.dialect()), &values)?;
        Ok((affected, id))
    }

    fn delete_row(&self, session: &dyn Session, id: EntityId) -> Result<usize> {
        session.execute(
            &COMMITS.delete_statement(self.handle.dialect(), "id"),
            &[id.into()],
        )
    }

    fn assign_keys(&self, commit: &mut Commit, id: EntityId) -> Result<()> {
        commit.set_id(id.get())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_matches_table_layout() {
        let commit = Commit::new("abc", DateTime::from_timestamp_millis(5).unwrap());
        assert_eq!(payload(&commit).unwrap().len(), COMMITS.columns.len() - 1);
    }

    #[test]
    fn test_row_maps_to_commit() {
        let row = Row::new(vec![
            SqlValue::Integer(9),
            SqlValue::Text("abc".into()),
            SqlValue::Integer(2),
            SqlValue::Null,
            SqlValue::Integer(1_000),
            SqlValue::Text("fix".into()),
            SqlValue::Integer(4),
            SqlValue::Integer(1),
        ]);
        let commit = CommitRows.create(&row).unwrap();
        assert_eq!(commit.raw_id(), 9);
        assert_eq!(commit.author_id.map(|a| a.get()), Some(2));
        assert_eq!(commit.branch_id, None);
        assert_eq!(commit.churn(), 5);
    }
}
