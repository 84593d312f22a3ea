//! Schema definition for the SQLite database.
//!
//! Tables and indexes are described as plain data and rendered to DDL at
//! startup. Timestamp columns use INTEGER unix seconds.

use crate::errors::Result;
use rusqlite::Connection;
use tracing::debug;

/// Schema definition: the set of tables the store materializes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    /// Materialize every table and index. Idempotent.
    pub fn create_all(&self, conn: &Connection) -> Result<()> {
        for table in &self.tables {
            conn.execute(&table.create_sql(), [])?;
            for index_sql in table.index_sql() {
                conn.execute(&index_sql, [])?;
            }
            debug!(table = %table.name, "schema ensured");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn add_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// The primary-key column, if one is declared.
    pub fn primary_key_column(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.is_primary_key())
    }

    /// Whether the table declares a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    pub fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                let unique = if index.unique { "UNIQUE " } else { "" };
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                    unique,
                    index.name,
                    self.name,
                    index.columns.join(", ")
                )
            })
            .collect()
    }

    /// INSERT statement covering every column except the generated
    /// primary key.
    pub fn insert_sql(&self) -> String {
        let columns: Vec<&str> = self
            .columns
            .iter()
            .filter(|column| !column.is_primary_key())
            .map(|column| column.name.as_str())
            .collect();
        let marks = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            columns.join(", "),
            marks
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default_value = Some(default);
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&ColumnConstraint::PrimaryKey)
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type.sql());
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.sql());
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.sql());
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl DataType {
    fn sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

impl ColumnConstraint {
    fn sql(self) -> &'static str {
        match self {
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::Unique => "UNIQUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    /// Insert-time clock, as unix seconds to match INTEGER timestamp
    /// columns.
    CurrentTimestamp,
}

impl DefaultValue {
    fn sql(&self) -> String {
        match self {
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Real(f) => f.to_string(),
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::CurrentTimestamp => "(strftime('%s','now'))".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sample_table() -> TableDefinition {
        TableDefinition::new("notes")
            .add_column(
                ColumnDefinition::new("id", DataType::Integer)
                    .with_constraint(ColumnConstraint::PrimaryKey),
            )
            .add_column(
                ColumnDefinition::new("title", DataType::Text)
                    .with_constraint(ColumnConstraint::NotNull)
                    .with_constraint(ColumnConstraint::Unique),
            )
            .add_column(ColumnDefinition::new("score", DataType::Real))
            .add_column(ColumnDefinition::new("payload", DataType::Blob))
            .add_column(
                ColumnDefinition::new("created_at", DataType::Integer)
                    .with_default(DefaultValue::CurrentTimestamp),
            )
            .add_index(IndexDefinition {
                name: "index_notes_title".to_string(),
                columns: vec!["title".to_string()],
                unique: false,
            })
    }

    #[test]
    fn create_sql_renders_columns_and_constraints() {
        assert_eq!(
            sample_table().create_sql(),
            "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, \
             title TEXT NOT NULL UNIQUE, score REAL, payload BLOB, \
             created_at INTEGER DEFAULT (strftime('%s','now')))"
        );
    }

    #[test]
    fn index_sql_renders_each_index() {
        assert_eq!(
            sample_table().index_sql(),
            vec!["CREATE INDEX IF NOT EXISTS index_notes_title ON notes (title)".to_string()]
        );
    }

    #[test]
    fn insert_sql_skips_the_primary_key() {
        assert_eq!(
            sample_table().insert_sql(),
            "INSERT INTO notes (title, score, payload, created_at) VALUES (?, ?, ?, ?)"
        );
    }

    #[test]
    fn text_default_escapes_quotes() {
        let column = ColumnDefinition::new("label", DataType::Text)
            .with_default(DefaultValue::Text("it's".to_string()));
        assert_eq!(column.to_sql(), "label TEXT DEFAULT 'it''s'");
    }

    #[test]
    fn create_all_is_idempotent() {
        let conn = db::open_in_memory().unwrap();
        let schema = Schema::new().add_table(sample_table());
        schema.create_all(&conn).expect("first create");
        schema.create_all(&conn).expect("second create");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn primary_key_lookup() {
        let table = sample_table();
        assert_eq!(table.primary_key_column().map(|c| c.name.as_str()), Some("id"));
        assert!(table.has_column("title"));
        assert!(!table.has_column("missing"));
    }
}
