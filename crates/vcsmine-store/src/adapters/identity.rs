//! Identities and their aliases
//!
//! An identity is stored as one `identities` row plus one `identity_aliases`
//! row per alias and is read back through a left join grouped by identity.

use crate::adapter::{Adapter, Capability, Selection};
use crate::dialect::Dialect;
use crate::errors::Result;
use crate::grouped::{GroupedStream, RowGrouping};
use crate::handle::StoreHandle;
use crate::schema::{ColumnDef, ColumnType, TableDef};
use crate::session::{Row, Session, SqlValue};
use crate::stream::{EntityCursor, RowMapper};
use vcsmine_core::{Alias, Entity, EntityId, Identity};

pub const IDENTITIES: TableDef = TableDef {
    name: "identities",
    columns: &[
        ColumnDef::id(),
        ColumnDef::required("name", ColumnType::Text),
        ColumnDef::optional("primary_email", ColumnType::Text),
    ],
};

pub const IDENTITY_ALIASES: TableDef = TableDef {
    name: "identity_aliases",
    columns: &[
        ColumnDef::id(),
        ColumnDef::required("identity_id", ColumnType::BigInt).references("identities"),
        ColumnDef::required("name", ColumnType::Text),
        ColumnDef::required("email", ColumnType::Text),
    ],
};

const ALIAS_ENTITY: &str = "identity_alias";

// Joined row layout
const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_PRIMARY_EMAIL: usize = 2;
const COL_ALIAS_ID: usize = 3;
const COL_ALIAS_NAME: usize = 4;
const COL_ALIAS_EMAIL: usize = 5;

/// Row layout of the identity/alias join
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRows;

impl RowMapper for IdentityRows {
    type Entity = Identity;
    const ENTITY: &'static str = "identity";

    fn create(&self, row: &Row) -> Result<Identity> {
        let mut identity = Identity::new(row.get_string(COL_NAME)?);
        identity.primary_email = row.get_opt_string(COL_PRIMARY_EMAIL)?;
        identity.set_id(row.get_i64(COL_ID)?)?;
        self.merge(&mut identity, row)?;
        Ok(identity)
    }
}

impl RowGrouping for IdentityRows {
    fn group_key(&self, row: &Row) -> Result<i64> {
        row.get_i64(COL_ID)
    }

    /// Identities without aliases carry a NULL alias payload
    fn merge(&self, identity: &mut Identity, row: &Row) -> Result<()> {
        let Some(alias_id) = row.get_opt_id(COL_ALIAS_ID)? else {
            return Ok(());
        };
        let mut alias = Alias::new(
            row.get_string(COL_ALIAS_NAME)?,
            row.get_string(COL_ALIAS_EMAIL)?,
        );
        alias.set_id(alias_id.get())?;
        identity.add_alias(alias);
        Ok(())
    }
}

/// Identifiers drawn while writing one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    pub id: EntityId,
    /// One entry per alias, in alias order
    pub aliases: Vec<EntityId>,
}

/// Adapter for [`Identity`] aggregates
///
/// `identities.id` is the primary key, so a point lookup can never see two
/// parents with one identifier; the join only repeats a parent per alias.
#[derive(Debug, Clone, Copy)]
pub struct IdentityAdapter<'h> {
    handle: &'h StoreHandle,
}

impl<'h> IdentityAdapter<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }

    fn select(&self, selection: Selection) -> (String, Vec<SqlValue>) {
        let base = "SELECT i.id, i.name, i.primary_email, a.id, a.name, a.email \
                    FROM identities i LEFT JOIN identity_aliases a ON a.identity_id = i.id";
        match selection {
            Selection::All => (format!("{} ORDER BY i.id, a.id", base), Vec::new()),
            Selection::Id(id) => (
                format!(
                    "{} WHERE i.id = {} ORDER BY i.id, a.id",
                    base,
                    self.handle.dialect().placeholder(1)
                ),
                vec![id.into()],
            ),
        }
    }

    fn insert_aliases(
        &self,
        session: &dyn Session,
        identity_id: EntityId,
        identity: &Identity,
    ) -> Result<Vec<EntityId>> {
        let sql = IDENTITY_ALIASES.insert_statement(self.handle.dialect());
        identity
            .aliases()
            .iter()
            .map(|alias| {
                let id = match alias.id() {
                    Some(id) => id,
                    None => self.handle.next_id(session, ALIAS_ENTITY)?,
                };
                session.execute(
                    &sql,
                    &[
                        id.into(),
                        identity_id.into(),
                        alias.name.as_str().into(),
                        alias.email.as_str().into(),
                    ],
                )?;
                Ok(id)
            })
            .collect()
    }
}

impl Adapter for IdentityAdapter<'_> {
    type Entity = Identity;
    type Keys = IdentityKeys;

    const ENTITY: &'static str = "identity";

    const CAPABILITIES: &'static [Capability] = &Capability::ALL;

    fn handle(&self) -> &StoreHandle {
        self.handle
    }

    fn scheme_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut statements = dialect.create_sequence_statements(&Dialect::sequence_name(Self::ENTITY));
        statements.extend(dialect.create_sequence_statements(&Dialect::sequence_name(ALIAS_ENTITY)));
        statements.push(dialect.create_table_statement(&IDENTITIES));
        statements.push(dialect.create_table_statement(&IDENTITY_ALIASES));
        statements
    }

    fn index_statements(&self, dialect: Dialect) -> Vec<String> {
        vec![
            dialect.create_index_statement(
                "idx_identity_aliases_identity_id",
                IDENTITY_ALIASES.name,
                &["identity_id"],
            ),
            dialect.create_index_statement(
                "idx_identity_aliases_email",
                IDENTITY_ALIASES.name,
                &["email"],
            ),
        ]
    }

    fn create(&self, row: &Row) -> Result<Identity> {
        IdentityRows.create(row)
    }

    fn scan<T>(
        &self,
        selection: Selection,
        f: impl FnOnce(&mut dyn EntityCursor<Item = Identity>) -> Result<T>,
    ) -> Result<T> {
        let (sql, params) = self.select(selection);
        let check_ordering = self.handle.options().check_group_ordering;
        self.handle.query(&sql, &params, |cursor| {
            let mut stream = GroupedStream::new(cursor, IdentityRows, check_ordering)?;
            f(&mut stream)
        })
    }

    fn insert_row(&self, session: &dyn Session, identity: &Identity) -> Result<IdentityKeys> {
        let id = self.handle.next_id(session, Self::ENTITY)?;
        session.execute(
            &IDENTITIES.insert_statement(self.handle.dialect()),
            &[
                id.into(),
                identity.name.as_str().into(),
                identity.primary_email.as_deref().into(),
            ],
        )?;
        let aliases = self.insert_aliases(session, id, identity)?;
        Ok(IdentityKeys { id, aliases })
    }

    /// Rewrites the identity row and replaces its alias rows
    fn update_row(
        &self,
        session: &dyn Session,
        identity: &Identity,
    ) -> Result<(usize, IdentityKeys)> {
        let Some(id) = identity.id() else {
            return self.insert_row(session, identity).map(|keys| (1, keys));
        };
        let dialect = self.handle.dialect();
        let affected = session.execute(
            &IDENTITIES.update_statement(dialect),
            &[
                identity.name.as_str().into(),
                identity.primary_email.as_deref().into(),
                id.into(),
            ],
        )?;
        if affected != 1 {
            return Ok((affected, IdentityKeys { id, aliases: Vec::new() }));
        }
        session.execute(
            &IDENTITY_ALIASES.delete_statement(dialect, "identity_id"),
            &[id.into()],
        )?;
        let aliases = self.insert_aliases(session, id, identity)?;
        Ok((affected, IdentityKeys { id, aliases }))
    }

    fn delete_row(&self, session: &dyn Session, id: EntityId) -> Result<usize> {
        let dialect = self.handle.dialect();
        session.execute(
            &IDENTITY_ALIASES.delete_statement(dialect, "identity_id"),
            &[id.into()],
        )?;
        session.execute(&IDENTITIES.delete_statement(dialect, "id"), &[id.into()])
    }

    fn assign_keys(&self, identity: &mut Identity, keys: IdentityKeys) -> Result<()> {
        identity.set_id(keys.id.get())?;
        for (alias, id) in identity.aliases_mut().iter_mut().zip(keys.aliases) {
            alias.set_id(id.get())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(id: i64, alias: Option<(i64, &str)>) -> Row {
        let (alias_id, email) = match alias {
            Some((a, e)) => (SqlValue::Integer(a), SqlValue::Text(e.to_string())),
            None => (SqlValue::Null, SqlValue::Null),
        };
        Row::new(vec![
            SqlValue::Integer(id),
            SqlValue::Text(format!("dev{}", id)),
            SqlValue::Null,
            alias_id,
            SqlValue::Text("nick".into()),
            email,
        ])
    }

    #[test]
    fn test_create_from_row_without_alias() {
        let identity = IdentityRows.create(&joined(3, None)).unwrap();
        assert_eq!(identity.raw_id(), 3);
        assert_eq!(identity.name, "dev3");
        assert!(identity.aliases().is_empty());
    }

    #[test]
    fn test_create_from_row_with_alias() {
        let identity = IdentityRows
            .create(&joined(3, Some((30, "a@example.org"))))
            .unwrap();
        assert_eq!(identity.aliases().len(), 1);
        assert_eq!(identity.aliases()[0].raw_id(), 30);
    }

    #[test]
    fn test_scheme_statements_per_dialect() {
        let handle = StoreHandle::open(&crate::config::StoreConfig::in_memory()).unwrap();
        let adapter = IdentityAdapter::new(&handle);
        let derby = adapter.scheme_statements(Dialect::Derby);
        assert_eq!(
            derby[0],
            "CREATE SEQUENCE seq_identity_id AS BIGINT START WITH 1 INCREMENT BY 1"
        );
        assert_eq!(
            derby[1],
            "CREATE SEQUENCE seq_identity_alias_id AS BIGINT START WITH 1 INCREMENT BY 1"
        );
        assert!(derby[3].contains("identity_id BIGINT NOT NULL REFERENCES identities (id)"));
        // Sequence emulation adds a seed row per sequence
        assert_eq!(adapter.scheme_statements(Dialect::Sqlite).len(), 6);
    }
}
