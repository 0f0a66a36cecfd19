//! Dialect Abstraction
//!
//! Every backend-specific SQL fragment lives here: identifier generation,
//! sequence DDL, column types and parameter placeholders. Adapters never
//! switch on the dialect; supporting another backend means adding one variant
//! and its arms below.

use crate::errors::{configuration, Result};
use crate::schema::{ColumnType, TableDef};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use vcsmine_core::errors::ExError;

/// Relational backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    /// Apache Derby: `VALUES (NEXT VALUE FOR seq)`
    Derby,
    /// HSQLDB: `CALL NEXT VALUE FOR seq`
    Hsqldb,
    /// PostgreSQL: `SELECT nextval('seq')`
    Postgres,
    /// SQLite, with sequences emulated by one-row tables
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Derby,
        Dialect::Hsqldb,
        Dialect::Postgres,
        Dialect::Sqlite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Derby => "derby",
            Dialect::Hsqldb => "hsqldb",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Name of the identifier sequence backing an entity type
    pub fn sequence_name(entity: &str) -> String {
        format!("seq_{}_id", entity)
    }

    /// Statement yielding one row with the next value of `sequence`
    pub fn next_id_statement(&self, sequence: &str) -> String {
        match self {
            Dialect::Derby => format!("VALUES (NEXT VALUE FOR {})", sequence),
            Dialect::Hsqldb => format!("CALL NEXT VALUE FOR {}", sequence),
            Dialect::Postgres => format!("SELECT nextval('{}')", sequence),
            Dialect::Sqlite => format!(
                "UPDATE {} SET value = value + 1 RETURNING value",
                sequence
            ),
        }
    }

    /// Statements creating `sequence`, starting at 1
    pub fn create_sequence_statements(&self, sequence: &str) -> Vec<String> {
        match self {
            Dialect::Derby | Dialect::Hsqldb => vec![format!(
                "CREATE SEQUENCE {} AS BIGINT START WITH 1 INCREMENT BY 1",
                sequence
            )],
            Dialect::Postgres => vec![format!(
                "CREATE SEQUENCE {} START WITH 1 INCREMENT BY 1",
                sequence
            )],
            Dialect::Sqlite => vec![
                format!("CREATE TABLE {} (value INTEGER NOT NULL)", sequence),
                format!("INSERT INTO {} (value) VALUES (0)", sequence),
            ],
        }
    }

    pub fn column_type(&self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (Dialect::Sqlite, ColumnType::Id | ColumnType::BigInt) => "INTEGER",
            (Dialect::Sqlite | Dialect::Postgres, ColumnType::Text | ColumnType::LongText) => {
                "TEXT"
            }
            (_, ColumnType::Id | ColumnType::BigInt) => "BIGINT",
            (Dialect::Derby | Dialect::Hsqldb, ColumnType::Text) => "VARCHAR(1024)",
            (Dialect::Derby, ColumnType::LongText) => "CLOB",
            (Dialect::Hsqldb, ColumnType::LongText) => "LONGVARCHAR",
        }
    }

    pub fn create_table_statement(&self, table: &TableDef) -> String {
        let columns = table
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", c.name, self.column_type(c.ty));
                if !c.nullable {
                    def.push_str(" NOT NULL");
                }
                if c.ty == ColumnType::Id {
                    def.push_str(" PRIMARY KEY");
                }
                if let Some(target) = c.references {
                    def.push_str(&format!(" REFERENCES {} (id)", target));
                }
                def
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", table.name, columns)
    }

    pub fn create_index_statement(&self, name: &str, table: &str, columns: &[&str]) -> String {
        format!("CREATE INDEX {} ON {} ({})", name, table, columns.join(", "))
    }

    /// Placeholder for the `n`-th (1-based) statement parameter
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Derby | Dialect::Hsqldb | Dialect::Sqlite => "?".to_string(),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ExError;

    fn from_str(selector: &str) -> Result<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "derby" => Ok(Dialect::Derby),
            "hsqldb" | "hsql" => Ok(Dialect::Hsqldb),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(configuration(format!(
                "unknown dialect '{}' (expected one of derby, hsqldb, postgres, sqlite)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = ExError;

    fn try_from(selector: String) -> Result<Self> {
        selector.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;
    use vcsmine_core::errors::ExErrorKind;

    #[test]
    fn test_parse_selectors() {
        assert_eq!("Derby".parse::<Dialect>().unwrap(), Dialect::Derby);
        assert_eq!("hsql".parse::<Dialect>().unwrap(), Dialect::Hsqldb);
        assert_eq!(" PostgreSQL ".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn test_unknown_selector_is_configuration_error() {
        let err = "oracle".parse::<Dialect>().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
        assert!(err.is_fatal());
        assert!(err.message().contains("oracle"));
    }

    #[test]
    fn test_sequence_name() {
        assert_eq!(Dialect::sequence_name("commit"), "seq_commit_id");
    }

    #[test]
    fn test_next_id_statements() {
        assert_eq!(
            Dialect::Derby.next_id_statement("seq_commit_id"),
            "VALUES (NEXT VALUE FOR seq_commit_id)"
        );
        assert_eq!(
            Dialect::Hsqldb.next_id_statement("seq_commit_id"),
            "CALL NEXT VALUE FOR seq_commit_id"
        );
        assert_eq!(
            Dialect::Postgres.next_id_statement("seq_commit_id"),
            "SELECT nextval('seq_commit_id')"
        );
        assert_eq!(
            Dialect::Sqlite.next_id_statement("seq_commit_id"),
            "UPDATE seq_commit_id SET value = value + 1 RETURNING value"
        );
    }

    #[test]
    fn test_sequence_ddl() {
        assert_eq!(
            Dialect::Postgres.create_sequence_statements("seq_branch_id"),
            vec!["CREATE SEQUENCE seq_branch_id START WITH 1 INCREMENT BY 1"]
        );
        let sqlite = Dialect::Sqlite.create_sequence_statements("seq_branch_id");
        assert_eq!(sqlite.len(), 2);
        assert!(sqlite[1].starts_with("INSERT INTO seq_branch_id"));
    }

    #[test]
    fn test_create_table_statement() {
        const TABLE: TableDef = TableDef {
            name: "notes",
            columns: &[
                ColumnDef::id(),
                ColumnDef::required("body", ColumnType::LongText),
                ColumnDef::optional("parent_id", ColumnType::BigInt).references("notes"),
            ],
        };
        assert_eq!(
            Dialect::Derby.create_table_statement(&TABLE),
            "CREATE TABLE notes (id BIGINT NOT NULL PRIMARY KEY, body CLOB NOT NULL, parent_id BIGINT REFERENCES notes (id))"
        );
        assert_eq!(
            Dialect::Sqlite.create_table_statement(&TABLE),
            "CREATE TABLE notes (id INTEGER NOT NULL PRIMARY KEY, body TEXT NOT NULL, parent_id INTEGER REFERENCES notes (id))"
        );
    }

    #[test]
    fn test_column_types_cover_every_dialect() {
        for dialect in Dialect::ALL {
            for ty in [
                ColumnType::Id,
                ColumnType::BigInt,
                ColumnType::Text,
                ColumnType::LongText,
            ] {
                assert!(!dialect.column_type(ty).is_empty());
            }
        }
        assert_eq!(Dialect::Hsqldb.column_type(ColumnType::LongText), "LONGVARCHAR");
    }
}
