use crate::adapter::{Adapter, Capability, Selection};
use crate::dialect::Dialect;
use crate::errors::Result;
use crate::handle::StoreHandle;
use crate::schema::{ColumnDef, ColumnType, TableDef};
use crate::session::{Row, Session, SqlValue};
use crate::stream::{EntityCursor, EntityStream, RowMapper};
use vcsmine_core::{Branch, Entity, EntityId};

pub const BRANCHES: TableDef = TableDef {
    name: "branches",
    columns: &[
        ColumnDef::id(),
        ColumnDef::required("name", ColumnType::Text),
        ColumnDef::required("created_at", ColumnType::BigInt),
        ColumnDef::optional("merged_at", ColumnType::BigInt),
    ],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BranchRows;

impl RowMapper for BranchRows {
    type Entity = Branch;
    const ENTITY: &'static str = "branch";

    fn create(&self, row: &Row) -> Result<Branch> {
        let mut branch = Branch::new(row.get_string(1)?, row.get_timestamp(2)?);
        branch.merged_at = row.get_opt_timestamp(3)?;
        branch.set_id(row.get_i64(0)?)?;
        Ok(branch)
    }
}

/// Adapter for [`Branch`] records
///
/// Branches are append-only: they are never updated, deleted or indexed.
#[derive(Debug, Clone, Copy)]
pub struct BranchAdapter<'h> {
    handle: &'h StoreHandle,
}

impl<'h> BranchAdapter<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }
}

impl Adapter for BranchAdapter<'_> {
    type Entity = Branch;
    type Keys = EntityId;

    const ENTITY: &'static str = "branch";

    const CAPABILITIES: &'static [Capability] = &[
        Capability::CreateScheme,
        Capability::Load,
        Capability::LoadById,
        Capability::LoadByIds,
        Capability::Save,
    ];

    fn handle(&self) -> &StoreHandle {
        self.handle
    }

    fn scheme_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut statements = dialect.create_sequence_statements(&Dialect::sequence_name(Self::ENTITY));
        statements.push(dialect.create_table_statement(&BRANCHES));
        statements
    }

    fn create(&self, row: &Row) -> Result<Branch> {
        BranchRows.create(row)
    }

    fn scan<T>(
        &self,
        selection: Selection,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Branch>) -> Result<T>,
    ) -> Result<T> {
        let select = format!("SELECT {} FROM {}", BRANCHES.select_list(None), BRANCHES.name);
        let (sql, params) = match selection {
            Selection::All => (format!("{} ORDER BY id", select), Vec::new()),
            Selection::Id(id) => (
                format!("{} WHERE id = {}", select, self.handle.dialect().placeholder(1)),
                vec![id.into()],
            ),
        };
        self.handle.query(&sql, &params, |cursor| {
            let mut stream = EntityStream::new(cursor, BranchRows);
            f(&mut stream)
        })
    }

    fn insert_row(&self, session: &dyn Session, branch: &Branch) -> Result<EntityId> {
        let id = self.handle.next_id(session, Self::ENTITY)?;
        session.execute(
            &BRANCHES.insert_statement(self.handle.dialect()),
            &[
                id.into(),
                branch.name.as_str().into(),
                SqlValue::timestamp(branch.created_at)?,
                SqlValue::opt_timestamp(branch.merged_at)?,
            ],
        )?;
        Ok(id)
    }

    fn assign_keys(&self, branch: &mut Branch, id: EntityId) -> Result<()> {
        branch.set_id(id.get())?;
        Ok(())
    }
}
