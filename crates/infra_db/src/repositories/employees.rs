//! Employee repository

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const EMPLOYEE_COLUMNS: &str = r#"
    employee_id,
    name,
    department,
    hire_date,
    pre_system_usage,
    supplemental_days,
    entitled_days,
    status,
    is_admin,
    is_superadmin,
    signature_path IS NOT NULL AS has_signature,
    version
"#;

/// Database row for an employee
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmployeeRow {
    pub employee_id: Uuid,
    pub name: String,
    pub department: String,
    pub hire_date: Option<NaiveDate>,
    pub pre_system_usage: Decimal,
    pub supplemental_days: Decimal,
    pub entitled_days: Decimal,
    pub status: String,
    pub is_admin: bool,
    pub is_superadmin: bool,
    pub has_signature: bool,
    pub version: i64,
}

/// Data for inserting or replacing an employee
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub employee_id: Uuid,
    pub name: String,
    pub department: String,
    pub hire_date: Option<NaiveDate>,
    pub pre_system_usage: Decimal,
    pub supplemental_days: Decimal,
    pub entitled_days: Decimal,
    pub status: String,
    pub is_admin: bool,
    pub is_superadmin: bool,
    pub signature_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, employee_id: Uuid) -> Result<Option<EmployeeRow>, DatabaseError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = $1");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_name_and_department(
        &self,
        name: &str,
        department: &str,
    ) -> Result<Option<EmployeeRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE name = $1 AND department = $2 \
             ORDER BY (status = 'active') DESC, created_at \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(name)
            .bind(department)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Employees of one department, or all of them, ordered by name
    pub async fn list(&self, department: Option<&str>) -> Result<Vec<EmployeeRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE ($1::text IS NULL OR department = $1) \
             ORDER BY name"
        );
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(department)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn has_signature(&self, employee_id: Uuid) -> Result<bool, DatabaseError> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT signature_path IS NOT NULL FROM employees WHERE employee_id = $1",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.unwrap_or(false))
    }

    /// Inserts an employee, replacing every column of an existing row with
    /// the same id
    pub async fn upsert(&self, employee: &NewEmployee) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO employees (
                employee_id, name, department, hire_date, pre_system_usage,
                supplemental_days, entitled_days, status, is_admin, is_superadmin,
                signature_path
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (employee_id) DO UPDATE SET
                name = EXCLUDED.name,
                department = EXCLUDED.department,
                hire_date = EXCLUDED.hire_date,
                pre_system_usage = EXCLUDED.pre_system_usage,
                supplemental_days = EXCLUDED.supplemental_days,
                entitled_days = EXCLUDED.entitled_days,
                status = EXCLUDED.status,
                is_admin = EXCLUDED.is_admin,
                is_superadmin = EXCLUDED.is_superadmin,
                signature_path = EXCLUDED.signature_path,
                version = employees.version + 1,
                updated_at = now()
            "#,
        )
        .bind(employee.employee_id)
        .bind(&employee.name)
        .bind(&employee.department)
        .bind(employee.hire_date)
        .bind(employee.pre_system_usage)
        .bind(employee.supplemental_days)
        .bind(employee.entitled_days)
        .bind(&employee.status)
        .bind(employee.is_admin)
        .bind(employee.is_superadmin)
        .bind(&employee.signature_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes cached balances if the row still carries `expected_version`
    ///
    /// The row is locked with `FOR UPDATE` for the rest of the transaction.
    /// Locks the employee row and checks the version read by the caller
    async fn lock_version(
        conn: &mut PgConnection,
        employee_id: Uuid,
        expected_version: i64,
    ) -> Result<(), DatabaseError> {
        let current = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM employees WHERE employee_id = $1 FOR UPDATE",
        )
        .bind(employee_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Employee", employee_id))?;

        if current != expected_version {
            return Err(DatabaseError::stale("Employee", employee_id));
        }
        Ok(())
    }

    pub async fn update_balances(
        conn: &mut PgConnection,
        employee_id: Uuid,
        expected_version: i64,
        supplemental: Decimal,
        entitled: Decimal,
    ) -> Result<(), DatabaseError> {
        Self::lock_version(conn, employee_id, expected_version).await?;

        sqlx::query(
            r#"
            UPDATE employees
            SET supplemental_days = $2,
                entitled_days = $3,
                version = version + 1,
                updated_at = now()
            WHERE employee_id = $1
            "#,
        )
        .bind(employee_id)
        .bind(supplemental)
        .bind(entitled)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Bumps the version of an employee whose events change without a
    /// balance change, so concurrent writers for the same owner collide
    pub async fn claim_version(
        conn: &mut PgConnection,
        employee_id: Uuid,
        expected_version: i64,
    ) -> Result<(), DatabaseError> {
        Self::lock_version(conn, employee_id, expected_version).await?;

        sqlx::query("UPDATE employees SET version = version + 1, updated_at = now() WHERE employee_id = $1")
            .bind(employee_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
