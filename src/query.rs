//! Value and query-builder types for the record store.
//!
//! Queries are rendered to parameterized SQL with positional `?`
//! placeholders; bound values travel alongside as a [`Value`] vector.

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;
use std::fmt;

/// Core value types for SQLite operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    /// The contained integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The contained text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            // SQLite has no boolean affinity; store as 0/1.
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Query operators for building filters.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    /// SQL LIKE pattern, e.g. `%Alan%`. Case behavior is SQLite's.
    Like(String),
    In(Vec<Value>),
}

/// Sort direction for an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Aggregate functions the store can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
}

impl Aggregate {
    pub(crate) fn sql_fn(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
        }
    }
}

/// A column assignment for a bulk update.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `column = ?`
    Set(Value),
    /// `column = column + ?`, evaluated row by row in the backend.
    Add(i64),
}

/// Composable, immutable query: filter conditions plus ordering and
/// row-window options. Conditions are combined with AND.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition on a field.
    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    /// Add an ORDER BY term.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the WHERE clause (with a leading space) and its bound
    /// values. Empty when there are no conditions.
    pub fn where_sql(&self) -> (String, Vec<Value>) {
        if self.conditions.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();
        for (field, op) in &self.conditions {
            match op {
                QueryOperator::Equal(v) => {
                    clauses.push(format!("{field} = ?"));
                    params.push(v.clone());
                }
                QueryOperator::NotEqual(v) => {
                    clauses.push(format!("{field} <> ?"));
                    params.push(v.clone());
                }
                QueryOperator::GreaterThan(v) => {
                    clauses.push(format!("{field} > ?"));
                    params.push(v.clone());
                }
                QueryOperator::GreaterThanOrEqual(v) => {
                    clauses.push(format!("{field} >= ?"));
                    params.push(v.clone());
                }
                QueryOperator::LessThan(v) => {
                    clauses.push(format!("{field} < ?"));
                    params.push(v.clone());
                }
                QueryOperator::LessThanOrEqual(v) => {
                    clauses.push(format!("{field} <= ?"));
                    params.push(v.clone());
                }
                QueryOperator::Like(pattern) => {
                    clauses.push(format!("{field} LIKE ?"));
                    params.push(Value::Text(pattern.clone()));
                }
                QueryOperator::In(values) if values.is_empty() => {
                    // SQLite rejects an empty IN list.
                    clauses.push("1 = 0".to_string());
                }
                QueryOperator::In(values) => {
                    let marks = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{field} IN ({marks})"));
                    params.extend(values.iter().cloned());
                }
            }
        }
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }

    /// Render the ORDER BY / LIMIT / OFFSET tail (with leading spaces).
    pub fn tail_sql(&self) -> String {
        let mut sql = String::new();
        if !self.order.is_empty() {
            let terms: Vec<String> = self
                .order
                .iter()
                .map(|(field, direction)| format!("{field} {}", direction.sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite requires a LIMIT clause when OFFSET is present.
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        sql
    }

    /// Every column name this query references.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.conditions
            .iter()
            .map(|(field, _)| field.as_str())
            .chain(self.order.iter().map(|(field, _)| field.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_renders_nothing() {
        let query = Query::new();
        let (where_sql, params) = query.where_sql();
        assert_eq!(where_sql, "");
        assert!(params.is_empty());
        assert_eq!(query.tail_sql(), "");
    }

    #[test]
    fn conditions_join_with_and() {
        let query = Query::new()
            .with_condition("grade", QueryOperator::GreaterThanOrEqual(10.into()))
            .with_condition("name", QueryOperator::Like("%Alan%".into()));
        let (where_sql, params) = query.where_sql();
        assert_eq!(where_sql, " WHERE grade >= ? AND name LIKE ?");
        assert_eq!(
            params,
            vec![Value::Integer(10), Value::Text("%Alan%".into())]
        );
    }

    #[test]
    fn in_list_expands_placeholders() {
        let query = Query::new().with_condition(
            "name",
            QueryOperator::In(vec!["Alan Turing".into(), "Ada Lovelace".into()]),
        );
        let (where_sql, params) = query.where_sql();
        assert_eq!(where_sql, " WHERE name IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_in_list_never_matches() {
        let query = Query::new().with_condition("name", QueryOperator::In(Vec::new()));
        let (where_sql, params) = query.where_sql();
        assert_eq!(where_sql, " WHERE 1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn tail_renders_order_limit_offset() {
        let query = Query::new()
            .order_by("grade", SortDirection::Descending)
            .order_by("name", SortDirection::Ascending)
            .with_limit(2)
            .with_offset(1);
        assert_eq!(query.tail_sql(), " ORDER BY grade DESC, name ASC LIMIT 2 OFFSET 1");
    }

    #[test]
    fn offset_without_limit_gets_unbounded_limit() {
        let query = Query::new().with_offset(3);
        assert_eq!(query.tail_sql(), " LIMIT -1 OFFSET 3");
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(7i64), Value::Integer(7));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Text("x".into()).as_text(), Some("x"));
        assert_eq!(Value::Null.as_integer(), None);
    }

    #[test]
    fn boolean_binds_as_integer() {
        let output = Value::Boolean(true).to_sql().unwrap();
        assert_eq!(output, ToSqlOutput::Owned(SqlValue::Integer(1)));
    }
}
