use sqlx::SqliteConnection;

use crate::{db_types::Student, traits::PaymentEngineError};

/// Whether a parent-student link exists. Student enrollment and guardianship management live outside the engine;
/// the engine only ever asks this one question.
pub async fn owns_student(parent_id: &str, student_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM parent_students WHERE parent_id = $1 AND student_id = $2")
            .bind(parent_id)
            .bind(student_id)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn insert_student(full_name: &str, conn: &mut SqliteConnection) -> Result<Student, PaymentEngineError> {
    let student = sqlx::query_as("INSERT INTO students (full_name) VALUES ($1) RETURNING *;")
        .bind(full_name)
        .fetch_one(conn)
        .await?;
    Ok(student)
}

pub async fn link_student(
    parent_id: &str,
    student_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentEngineError> {
    sqlx::query("INSERT OR IGNORE INTO parent_students (parent_id, student_id) VALUES ($1, $2)")
        .bind(parent_id)
        .bind(student_id)
        .execute(conn)
        .await?;
    Ok(())
}
