//! The record store facade: configuration, connection lifecycle, and
//! the operation catalog over the students table.

use crate::db;
use crate::errors::{Result, StoreError};
use crate::query::{Aggregate, Assignment, Query, Value};
use crate::schema::{Schema, TableDefinition};
use crate::student::{Student, TABLE};
use chrono::{SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use tracing::{debug, info};

/// SQLite store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file; `":memory:"` for a private
    /// in-memory database.
    pub db_path: String,
    /// Schema definition for the database.
    pub schema: Schema,
}

impl SqliteConfig {
    /// Create a new SQLite config with path and schema.
    pub fn new(db_path: impl Into<String>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
        }
    }
}

/// Record store over the students table.
///
/// Single connection, synchronous, one caller at a time.
#[derive(Debug)]
pub struct StudentStore {
    conn: Connection,
    table: TableDefinition,
}

impl StudentStore {
    /// Open the configured database, apply connection settings, and
    /// materialize the schema.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let conn = db::open(&config.db_path)?;
        db::configure(&conn)?;
        config.schema.create_all(&conn)?;
        let table = config
            .schema
            .tables
            .iter()
            .find(|table| table.name == TABLE)
            .cloned()
            .ok_or_else(|| StoreError::MissingTable(TABLE.to_string()))?;
        info!(path = %config.db_path, "student store opened");
        Ok(Self { conn, table })
    }

    /// Persist a batch of new records in one transaction.
    ///
    /// Each record receives its generated id, and records without an
    /// enrollment date are stamped with the insert-time clock. A record
    /// that already has an id fails the whole batch before anything is
    /// written.
    pub fn insert_many(&mut self, students: &mut [Student]) -> Result<()> {
        for student in students.iter() {
            if let Some(id) = student.id {
                return Err(StoreError::AlreadyPersisted {
                    name: student.name.clone(),
                    id,
                });
            }
        }
        // Whole seconds, so the stamped record equals what a re-select
        // decodes from the INTEGER column.
        let now = Utc::now().trunc_subsecs(0);
        let sql = self.table.insert_sql();
        debug!(sql = %sql, records = students.len(), "insert batch");
        let tx = self.conn.transaction()?;
        {
            // Bind order follows the table's column order, minus the
            // generated primary key.
            let mut stmt = tx.prepare(&sql)?;
            for student in students.iter_mut() {
                let enrolled = student.enrolled_date.unwrap_or(now);
                stmt.execute(params![
                    student.name,
                    student.email,
                    student.grade,
                    student.birthday.timestamp(),
                    enrolled.timestamp(),
                ])?;
                student.id = Some(tx.last_insert_rowid());
                student.enrolled_date = Some(enrolled);
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All records, in storage order.
    pub fn select_all(&self) -> Result<Vec<Student>> {
        self.select(&Query::new())
    }

    /// Full records matching the query's filter, order, and row window.
    pub fn select(&self, query: &Query) -> Result<Vec<Student>> {
        self.validate_query(query)?;
        let (where_sql, bound) = query.where_sql();
        let sql = format!(
            "SELECT {} FROM {}{}{}",
            self.column_list(),
            self.table.name,
            where_sql,
            query.tail_sql()
        );
        debug!(sql = %sql, "select");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), Student::from_row)?;
        let mut students = Vec::new();
        for row in rows {
            students.push(row?);
        }
        Ok(students)
    }

    /// Project only the named fields; rows come back as field → value
    /// maps.
    pub fn select_columns(
        &self,
        fields: &[&str],
        query: &Query,
    ) -> Result<Vec<HashMap<String, Value>>> {
        if fields.is_empty() {
            return Err(StoreError::InvalidQuery("no fields to select".to_string()));
        }
        for field in fields {
            self.check_column(field)?;
        }
        self.validate_query(query)?;
        let (where_sql, bound) = query.where_sql();
        let sql = format!(
            "SELECT {} FROM {}{}{}",
            fields.join(", "),
            self.table.name,
            where_sql,
            query.tail_sql()
        );
        debug!(sql = %sql, "select columns");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            let mut record = HashMap::with_capacity(fields.len());
            for (index, field) in fields.iter().enumerate() {
                record.insert(field.to_string(), Value::from(row.get_ref(index)?));
            }
            Ok(record)
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// The first full record for the query, if any.
    pub fn first(&self, query: &Query) -> Result<Option<Student>> {
        let mut students = self.select(&query.clone().with_limit(1))?;
        Ok(students.pop())
    }

    /// The first projected row for the query, if any.
    pub fn first_columns(
        &self,
        fields: &[&str],
        query: &Query,
    ) -> Result<Option<HashMap<String, Value>>> {
        let mut records = self.select_columns(fields, &query.clone().with_limit(1))?;
        Ok(records.pop())
    }

    /// Evaluate an aggregate over the rows matching the filter. SUM of
    /// no rows is `None`; COUNT never is.
    pub fn aggregate(
        &self,
        function: Aggregate,
        column: &str,
        filter: Option<&Query>,
    ) -> Result<Option<i64>> {
        self.check_column(column)?;
        let (where_sql, bound) = match filter {
            Some(query) => {
                self.validate_query(query)?;
                query.where_sql()
            }
            None => (String::new(), Vec::new()),
        };
        let sql = format!(
            "SELECT {}({column}) FROM {}{}",
            function.sql_fn(),
            self.table.name,
            where_sql
        );
        debug!(sql = %sql, "aggregate");
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(bound), |row| row.get(0))?)
    }

    /// Number of rows matching the filter.
    pub fn count(&self, filter: Option<&Query>) -> Result<i64> {
        let pk = self
            .table
            .primary_key_column()
            .map(|column| column.name.clone())
            .ok_or_else(|| {
                StoreError::InvalidQuery(format!("table {} has no primary key", self.table.name))
            })?;
        Ok(self
            .aggregate(Aggregate::Count, &pk, filter)?
            .unwrap_or(0))
    }

    /// Sum of a column over the rows matching the filter.
    pub fn sum(&self, column: &str, filter: Option<&Query>) -> Result<Option<i64>> {
        self.aggregate(Aggregate::Sum, column, filter)
    }

    /// Apply column assignments to every row matching the filter (or
    /// all rows) in a single statement. Returns the affected-row count.
    pub fn update_all(
        &self,
        assignments: &[(&str, Assignment)],
        filter: Option<&Query>,
    ) -> Result<usize> {
        if assignments.is_empty() {
            return Err(StoreError::InvalidQuery("no assignments".to_string()));
        }
        let mut sets = Vec::with_capacity(assignments.len());
        let mut bound = Vec::new();
        for (column, assignment) in assignments {
            self.check_column(column)?;
            match assignment {
                Assignment::Set(value) => {
                    sets.push(format!("{column} = ?"));
                    bound.push(value.clone());
                }
                Assignment::Add(amount) => {
                    sets.push(format!("{column} = {column} + ?"));
                    bound.push(Value::Integer(*amount));
                }
            }
        }
        let where_sql = match filter {
            Some(query) => {
                self.validate_query(query)?;
                let (where_sql, filter_bound) = query.where_sql();
                bound.extend(filter_bound);
                where_sql
            }
            None => String::new(),
        };
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.table.name,
            sets.join(", "),
            where_sql
        );
        debug!(sql = %sql, "bulk update");
        Ok(self.conn.execute(&sql, params_from_iter(bound))?)
    }

    /// Remove every row matching the filter in a single statement.
    /// Returns the removed-row count. An empty filter removes all rows.
    pub fn delete(&self, filter: &Query) -> Result<usize> {
        self.validate_query(filter)?;
        let (where_sql, bound) = filter.where_sql();
        let sql = format!("DELETE FROM {}{}", self.table.name, where_sql);
        debug!(sql = %sql, "delete");
        Ok(self.conn.execute(&sql, params_from_iter(bound))?)
    }

    fn column_list(&self) -> String {
        self.table
            .columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check_column(&self, name: &str) -> Result<()> {
        if self.table.has_column(name) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn(name.to_string()))
        }
    }

    fn validate_query(&self, query: &Query) -> Result<()> {
        for column in query.referenced_columns() {
            self.check_column(column)?;
        }
        Ok(())
    }
}
