//! Table layout shared by every dialect
//!
//! Adapters describe their tables once as `TableDef` constants; the dialect
//! renders the DDL and the statement builders below render the DML. By
//! convention the first column of every table is its identifier.

use crate::dialect::Dialect;

/// Portable column types, mapped to concrete types by [`Dialect::column_type`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Primary-key identifier
    Id,
    /// 64-bit integer (counts, foreign identifiers, epoch milliseconds)
    BigInt,
    /// Short text (names, revisions, emails)
    Text,
    /// Unbounded text (commit messages)
    LongText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Table whose `id` this column references
    pub references: Option<&'static str>,
}

impl ColumnDef {
    /// The identifier column
    pub const fn id() -> Self {
        Self {
            name: "id",
            ty: ColumnType::Id,
            nullable: false,
            references: None,
        }
    }

    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            references: None,
        }
    }

    pub const fn optional(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            references: None,
        }
    }

    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Comma-separated column list, optionally qualified by a table alias
    pub fn select_list(&self, alias: Option<&str>) -> String {
        self.columns
            .iter()
            .map(|c| match alias {
                Some(a) => format!("{}.{}", a, c.name),
                None => c.name.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `INSERT` binding every column in declaration order
    pub fn insert_statement(&self, dialect: Dialect) -> String {
        let values = (1..=self.columns.len())
            .map(|n| dialect.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.select_list(None),
            values
        )
    }

    /// `UPDATE` binding every non-identifier column, then the identifier
    pub fn update_statement(&self, dialect: Dialect) -> String {
        let assignments = self.columns[1..]
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", c.name, dialect.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.name,
            assignments,
            self.columns[0].name,
            dialect.placeholder(self.columns.len())
        )
    }

    /// `DELETE` keyed by a single column
    pub fn delete_statement(&self, dialect: Dialect, key_column: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.name,
            key_column,
            dialect.placeholder(1)
        )
    }
}
