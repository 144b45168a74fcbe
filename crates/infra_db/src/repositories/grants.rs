//! Grant log repository

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GrantRow {
    pub grant_id: Uuid,
    pub recipients: Vec<Uuid>,
    pub summary: String,
    pub days: Decimal,
    pub reason: String,
    pub granted_by: Uuid,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every entry, newest first
    pub async fn list(&self) -> Result<Vec<GrantRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT grant_id, recipients, summary, days, reason, granted_by, effective_date, recorded_at
            FROM grant_log
            ORDER BY recorded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Entries naming `employee_id`, newest first
    pub async fn for_recipient(&self, employee_id: Uuid) -> Result<Vec<GrantRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT grant_id, recipients, summary, days, reason, granted_by, effective_date, recorded_at
            FROM grant_log
            WHERE $1 = ANY(recipients)
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert(conn: &mut PgConnection, row: &GrantRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO grant_log (
                grant_id, recipients, summary, days, reason, granted_by, effective_date, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.grant_id)
        .bind(&row.recipients)
        .bind(&row.summary)
        .bind(row.days)
        .bind(&row.reason)
        .bind(row.granted_by)
        .bind(row.effective_date)
        .bind(row.recorded_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
