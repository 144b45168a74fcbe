//! Month lock repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for one department-month
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MonthLockRow {
    pub department: String,
    pub year: i32,
    pub month: i32,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MonthLockRepository {
    pool: PgPool,
}

impl MonthLockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, department: &str, year: i32, month: i32) -> Result<Option<MonthLockRow>, DatabaseError> {
        let row = sqlx::query_as::<_, MonthLockRow>(
            r#"
            SELECT department, year, month, locked, locked_at, locked_by
            FROM month_locks
            WHERE department = $1 AND year = $2 AND month = $3
            "#,
        )
        .bind(department)
        .bind(year)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Writes `row` only if the stored lock state equals `expected_locked`
    ///
    /// A missing row counts as unlocked. Returns whether a row was written.
    pub async fn swap(&self, expected_locked: bool, row: &MonthLockRow) -> Result<bool, DatabaseError> {
        let result = if expected_locked {
            sqlx::query(
                r#"
                UPDATE month_locks
                SET locked = $4, locked_at = $5, locked_by = $6
                WHERE department = $1 AND year = $2 AND month = $3 AND locked
                "#,
            )
            .bind(&row.department)
            .bind(row.year)
            .bind(row.month)
            .bind(row.locked)
            .bind(row.locked_at)
            .bind(row.locked_by)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                INSERT INTO month_locks (department, year, month, locked, locked_at, locked_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (department, year, month) DO UPDATE
                SET locked = EXCLUDED.locked,
                    locked_at = EXCLUDED.locked_at,
                    locked_by = EXCLUDED.locked_by
                WHERE month_locks.locked = FALSE
                "#,
            )
            .bind(&row.department)
            .bind(row.year)
            .bind(row.month)
            .bind(row.locked)
            .bind(row.locked_at)
            .bind(row.locked_by)
            .execute(&self.pool)
            .await?
        };
        Ok(result.rows_affected() == 1)
    }

    /// Fails with `MonthLocked` if the month is locked
    ///
    /// The row is materialized and share-locked, so a concurrent confirmation
    /// waits until the surrounding transaction ends.
    pub async fn ensure_unlocked(
        conn: &mut PgConnection,
        department: &str,
        year: i32,
        month: i32,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO month_locks (department, year, month, locked)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (department, year, month) DO NOTHING
            "#,
        )
        .bind(department)
        .bind(year)
        .bind(month)
        .execute(&mut *conn)
        .await?;

        let locked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT locked FROM month_locks
            WHERE department = $1 AND year = $2 AND month = $3
            FOR SHARE
            "#,
        )
        .bind(department)
        .bind(year)
        .bind(month)
        .fetch_one(&mut *conn)
        .await?;

        if locked {
            return Err(DatabaseError::MonthLocked(format!("{department}/{year:04}-{month:02}")));
        }
        Ok(())
    }
}
