//! Leave event repository

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const EVENT_COLUMNS: &str = r#"
    event_id,
    owner_employee_id,
    owner_name,
    submitted_by,
    department,
    category,
    start_date,
    end_date,
    approved,
    payload,
    applied_supplemental,
    applied_entitled,
    created_at
"#;

/// Database row for a leave event
///
/// `owner_employee_id` is `None` for rows still owned by name and department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveEventRow {
    pub event_id: Uuid,
    pub owner_employee_id: Option<Uuid>,
    pub owner_name: String,
    pub submitted_by: Uuid,
    pub department: String,
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approved: bool,
    pub payload: serde_json::Value,
    pub applied_supplemental: Option<Decimal>,
    pub applied_entitled: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LeaveEventRepository {
    pool: PgPool,
}

impl LeaveEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, event_id: Uuid) -> Result<Option<LeaveEventRow>, DatabaseError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM leave_events WHERE event_id = $1");
        let row = sqlx::query_as::<_, LeaveEventRow>(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Events owned by an employee id, or by the legacy (name, department)
    /// pair, optionally restricted to those intersecting `[from, to]`
    pub async fn for_owner(
        &self,
        employee_id: Uuid,
        name: &str,
        department: &str,
        window: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<LeaveEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM leave_events \
             WHERE (owner_employee_id = $1 \
                    OR (owner_employee_id IS NULL AND owner_name = $2 AND department = $3)) \
               AND ($4::date IS NULL OR end_date >= $4) \
               AND ($5::date IS NULL OR start_date <= $5) \
             ORDER BY start_date, created_at"
        );
        let rows = sqlx::query_as::<_, LeaveEventRow>(&sql)
            .bind(employee_id)
            .bind(name)
            .bind(department)
            .bind(window.map(|(from, _)| from))
            .bind(window.map(|(_, to)| to))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Events of any of `departments` intersecting `[from, to]`
    pub async fn in_range(
        &self,
        departments: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LeaveEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM leave_events \
             WHERE department = ANY($1) AND start_date <= $3 AND end_date >= $2 \
             ORDER BY start_date, created_at"
        );
        let rows = sqlx::query_as::<_, LeaveEventRow>(&sql)
            .bind(departments)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn pending(&self, department: &str) -> Result<Vec<LeaveEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM leave_events \
             WHERE department = $1 AND NOT approved \
             ORDER BY start_date, created_at"
        );
        let rows = sqlx::query_as::<_, LeaveEventRow>(&sql)
            .bind(department)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Rows not yet linked to an employee id
    pub async fn legacy(&self) -> Result<Vec<LeaveEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM leave_events \
             WHERE owner_employee_id IS NULL \
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, LeaveEventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn reassign_owner(&self, event_id: Uuid, employee_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE leave_events SET owner_employee_id = $2 WHERE event_id = $1")
            .bind(event_id)
            .bind(employee_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("LeaveEvent", event_id));
        }
        Ok(())
    }

    pub async fn insert(conn: &mut PgConnection, row: &LeaveEventRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO leave_events (
                event_id, owner_employee_id, owner_name, submitted_by, department,
                category, start_date, end_date, approved, payload,
                applied_supplemental, applied_entitled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.event_id)
        .bind(row.owner_employee_id)
        .bind(&row.owner_name)
        .bind(row.submitted_by)
        .bind(&row.department)
        .bind(&row.category)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.approved)
        .bind(&row.payload)
        .bind(row.applied_supplemental)
        .bind(row.applied_entitled)
        .bind(row.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Rewrites the mutable columns of an existing event
    /// Rewrites an event whose `approved` flag still matches what the
    /// caller read
    pub async fn update(
        conn: &mut PgConnection,
        row: &LeaveEventRow,
        expected_approved: bool,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_events
            SET owner_employee_id = $2,
                owner_name = $3,
                department = $4,
                category = $5,
                start_date = $6,
                end_date = $7,
                approved = $8,
                payload = $9,
                applied_supplemental = $10,
                applied_entitled = $11
            WHERE event_id = $1 AND approved = $12
            "#,
        )
        .bind(row.event_id)
        .bind(row.owner_employee_id)
        .bind(&row.owner_name)
        .bind(&row.department)
        .bind(&row.category)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.approved)
        .bind(&row.payload)
        .bind(row.applied_supplemental)
        .bind(row.applied_entitled)
        .bind(expected_approved)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Self::missed(conn, row.event_id).await);
        }
        Ok(())
    }

    /// Deletes an event whose `approved` flag still matches what the caller
    /// read
    pub async fn delete(
        conn: &mut PgConnection,
        event_id: Uuid,
        expected_approved: bool,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM leave_events WHERE event_id = $1 AND approved = $2")
            .bind(event_id)
            .bind(expected_approved)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Self::missed(conn, event_id).await);
        }
        Ok(())
    }

    /// Why a conditional write touched no row: gone, or changed state
    async fn missed(conn: &mut PgConnection, event_id: Uuid) -> DatabaseError {
        let exists = sqlx::query_scalar::<_, bool>("SELECT approved FROM leave_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await;
        match exists {
            Ok(Some(_)) => DatabaseError::stale("LeaveEvent", event_id),
            Ok(None) => DatabaseError::not_found("LeaveEvent", event_id),
            Err(e) => e.into(),
        }
    }
}
