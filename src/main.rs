//! Demonstration binary: runs a fixed sequence of record-store
//! operations against an in-memory database and prints the results.
//! Takes no arguments.

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use student_registry::{
    Assignment, Query, QueryOperator, Schema, SortDirection, SqliteConfig, Student, StudentStore,
};
use tracing_subscriber::EnvFilter;

fn birthday(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .with_context(|| format!("invalid birthday {year}-{month}-{day}"))
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let schema = Schema::new().add_table(Student::table());
    let config = SqliteConfig::new(":memory:", schema);
    let mut store = StudentStore::open(config).context("open student store")?;

    // Creating records
    let mut students = vec![
        Student::new(
            "Albert Einstein",
            "albert.einstein@zurich.edu",
            6,
            birthday(1879, 3, 14)?,
        ),
        Student::new(
            "Alan Turing",
            "alan.turing@sherborne.edu",
            11,
            birthday(1912, 6, 23)?,
        ),
    ];
    store.insert_many(&mut students)?;
    for student in &students {
        match student.id {
            Some(id) => println!("New student ID is {id}."),
            None => println!("New student ID is missing."),
        }
    }

    // Basic query
    for student in store.select_all()? {
        println!("{student}");
    }

    // Selecting only certain columns
    for row in store.select_columns(&["name"], &Query::new())? {
        println!("{}", row["name"]);
    }

    // Ordering by a particular column
    let by_name = Query::new().order_by("name", SortDirection::Ascending);
    for row in store.select_columns(&["name"], &by_name)? {
        println!("{}", row["name"]);
    }

    // Sorting in descending order
    let by_grade_desc = Query::new().order_by("grade", SortDirection::Descending);
    for row in store.select_columns(&["name", "grade"], &by_grade_desc)? {
        println!("{}, Grade {}", row["name"], row["grade"]);
    }

    // Limiting: the leading row of the ordered query
    if let Some(row) = store.first_columns(&["name", "birthday"], &by_grade_desc)? {
        let born = row["birthday"]
            .as_integer()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|at| at.date_naive().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("Top student: {} (born {born})", row["name"]);
    }

    // Aggregates
    println!("Student count: {}", store.count(None)?);
    match store.sum("id", None)? {
        Some(total) => println!("Sum of student IDs: {total}"),
        None => println!("Sum of student IDs: NULL"),
    }

    // Filtering by pattern
    let like_alan = Query::new().with_condition("name", QueryOperator::Like("%Alan%".into()));
    for student in store.select(&like_alan)? {
        println!("{}", student.name);
    }

    // Bulk update: everyone moves up a grade in one statement
    store.update_all(&[("grade", Assignment::Add(1))], None)?;
    for row in store.select_columns(&["name", "grade"], &Query::new())? {
        println!("({}, {})", row["name"], row["grade"]);
    }

    // Deleting within a query
    let einstein = Query::new().with_condition("name", QueryOperator::Equal("Albert Einstein".into()));
    store.delete(&einstein)?;
    match store.first(&einstein)? {
        Some(student) => println!("{student}"),
        None => println!("None"),
    }

    Ok(())
}
