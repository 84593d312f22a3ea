//! The Student entity and its table definition.

use crate::schema::{
    ColumnConstraint, ColumnDefinition, DataType, DefaultValue, IndexDefinition, TableDefinition,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the students table.
pub const TABLE: &str = "students";

/// A single student record.
///
/// `id` is `None` until the record is persisted; the store assigns the
/// generated rowid on insert and it never changes afterwards.
/// `enrolled_date` is filled with the insert-time clock when left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: DateTime<Utc>,
    pub enrolled_date: Option<DateTime<Utc>>,
}

impl Student {
    /// Create an unsaved record.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        }
    }

    /// Set an explicit enrollment date instead of the insert-time
    /// default.
    pub fn with_enrolled_date(mut self, enrolled_date: DateTime<Utc>) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    /// Table definition for the students table. Timestamps are INTEGER
    /// unix seconds; the name index is secondary and non-unique.
    pub fn table() -> TableDefinition {
        TableDefinition::new(TABLE)
            .add_column(
                ColumnDefinition::new("id", DataType::Integer)
                    .with_constraint(ColumnConstraint::PrimaryKey),
            )
            .add_column(ColumnDefinition::new("name", DataType::Text))
            // Length 55 by convention; SQLite does not enforce it.
            .add_column(ColumnDefinition::new("email", DataType::Text))
            .add_column(ColumnDefinition::new("grade", DataType::Integer))
            .add_column(ColumnDefinition::new("birthday", DataType::Integer))
            .add_column(
                ColumnDefinition::new("enrolled_date", DataType::Integer)
                    .with_default(DefaultValue::CurrentTimestamp),
            )
            .add_index(IndexDefinition {
                name: "index_students_name".to_string(),
                columns: vec!["name".to_string()],
                unique: false,
            })
    }

    /// Decode a row selected in table-column order.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            email: row.get(2)?,
            grade: row.get(3)?,
            birthday: datetime_from_secs(row.get(4)?, 4)?,
            enrolled_date: row
                .get::<_, Option<i64>>(5)?
                .map(|secs| datetime_from_secs(secs, 5))
                .transpose()?,
        })
    }
}

fn datetime_from_secs(secs: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, secs))
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Student {id}: {}, Grade {}", self.name, self.grade),
            None => write!(f, "Student (unsaved): {}, Grade {}", self.name, self.grade),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_includes_id_once_assigned() {
        let birthday = Utc.with_ymd_and_hms(1912, 6, 23, 0, 0, 0).unwrap();
        let mut student = Student::new("Alan Turing", "alan.turing@sherborne.edu", 11, birthday);
        assert_eq!(student.to_string(), "Student (unsaved): Alan Turing, Grade 11");
        student.id = Some(2);
        assert_eq!(student.to_string(), "Student 2: Alan Turing, Grade 11");
    }

    #[test]
    fn table_declares_the_name_index() {
        let table = Student::table();
        assert_eq!(table.name, TABLE);
        assert_eq!(table.indexes.len(), 1);
        assert_eq!(table.indexes[0].name, "index_students_name");
        assert!(!table.indexes[0].unique);
        assert_eq!(table.primary_key_column().map(|c| c.name.as_str()), Some("id"));
    }
}
