//! Personnel records, scoped per operational department

use super::{like_pattern, search_term};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// An employee of one department
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub position: String,
    pub job_description: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload; every field is required
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeForm {
    pub name: String,
    pub position: String,
    pub job_description: String,
}

impl EmployeeForm {
    /// Trim every field and reject blanks
    pub fn validated(self) -> ApplicationResult<Self> {
        let form = Self {
            name: self.name.trim().to_string(),
            position: self.position.trim().to_string(),
            job_description: self.job_description.trim().to_string(),
        };
        if form.name.is_empty() || form.position.is_empty() || form.job_description.is_empty() {
            return Err(ApplicationError::validation("All fields are required"));
        }
        Ok(form)
    }
}

/// Storage for personnel records. `department` is always an upper-cased tag.
#[async_trait]
pub trait EmployeeStorage: Send + Sync {
    /// Employees of one department ordered by name, optionally searched
    async fn list(&self, department: &str, search: Option<&str>)
        -> ApplicationResult<Vec<Employee>>;

    async fn get(&self, department: &str, id: i64) -> ApplicationResult<Option<Employee>>;

    async fn insert(&self, department: &str, form: &EmployeeForm) -> ApplicationResult<Employee>;

    /// `None` when no such employee exists in `department`
    async fn update(
        &self,
        department: &str,
        id: i64,
        form: &EmployeeForm,
    ) -> ApplicationResult<Option<Employee>>;

    /// `false` when no such employee exists in `department`
    async fn delete(&self, department: &str, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteEmployeeStorage {
    pool: SqlitePool,
}

const EMPLOYEE_COLUMNS: &str =
    "id, name, position, job_description, department, created_at, updated_at";

impl SqliteEmployeeStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                position TEXT NOT NULL,
                job_description TEXT NOT NULL,
                department TEXT NOT NULL DEFAULT 'TVET',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_employees_department ON employees(department);
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Employees table ready");
        Ok(Self { pool })
    }

    fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<Employee> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Employee {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            position: row.try_get("position")?,
            job_description: row.try_get("job_description")?,
            department: row.try_get("department")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl EmployeeStorage for SqliteEmployeeStorage {
    async fn list(
        &self,
        department: &str,
        search: Option<&str>,
    ) -> ApplicationResult<Vec<Employee>> {
        let rows = match search_term(search) {
            Some(term) => {
                let pattern = like_pattern(term);
                sqlx::query(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees
                     WHERE department = ?1
                       AND (name LIKE ?2 ESCAPE '\\' OR position LIKE ?2 ESCAPE '\\'
                            OR job_description LIKE ?2 ESCAPE '\\')
                     ORDER BY name"
                ))
                .bind(department)
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department = ? ORDER BY name"
                ))
                .bind(department)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::row_to_employee).collect()
    }

    async fn get(&self, department: &str, id: i64) -> ApplicationResult<Option<Employee>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? AND department = ?"
        ))
        .bind(id)
        .bind(department)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_employee).transpose()
    }

    async fn insert(&self, department: &str, form: &EmployeeForm) -> ApplicationResult<Employee> {
        let now = Utc::now();
        let stamp = format_timestamp(&now);

        let id = sqlx::query(
            "INSERT INTO employees (name, position, job_description, department, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&form.name)
        .bind(&form.position)
        .bind(&form.job_description)
        .bind(department)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(employee_id = id, department, "Employee created");

        Ok(Employee {
            id,
            name: form.name.clone(),
            position: form.position.clone(),
            job_description: form.job_description.clone(),
            department: department.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        department: &str,
        id: i64,
        form: &EmployeeForm,
    ) -> ApplicationResult<Option<Employee>> {
        let result = sqlx::query(
            "UPDATE employees SET name = ?, position = ?, job_description = ?, updated_at = ?
             WHERE id = ? AND department = ?",
        )
        .bind(&form.name)
        .bind(&form.position)
        .bind(&form.job_description)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .bind(department)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        info!(employee_id = id, department, "Employee updated");
        self.get(department, id).await
    }

    async fn delete(&self, department: &str, id: i64) -> ApplicationResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ? AND department = ?")
            .bind(id)
            .bind(department)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(employee_id = id, department, "Employee deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    fn form(name: &str, position: &str) -> EmployeeForm {
        EmployeeForm {
            name: name.to_string(),
            position: position.to_string(),
            job_description: format!("{} duties", position),
        }
    }

    async fn store() -> SqliteEmployeeStorage {
        SqliteEmployeeStorage::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_validation() {
        let err = form("  ", "Clerk").validated().unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");
        assert_eq!(form(" Ana ", "Clerk").validated().unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn test_departments_are_isolated() {
        let store = store().await;
        let tvet = store.insert("TVET", &form("Ana", "Trainer")).await.unwrap();
        store.insert("LPAF", &form("Ben", "Guard")).await.unwrap();

        assert_eq!(store.list("TVET", None).await.unwrap().len(), 1);
        assert!(store.get("LPAF", tvet.id).await.unwrap().is_none());
        assert!(store
            .update("LPAF", tvet.id, &form("X", "Y"))
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete("LPAF", tvet.id).await.unwrap());
        assert!(store.delete("TVET", tvet.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sorted_and_searchable() {
        let store = store().await;
        store.insert("TVET", &form("Zed", "Welder")).await.unwrap();
        store.insert("TVET", &form("Amy", "Trainer")).await.unwrap();
        store.insert("TVET", &form("Max", "Registrar")).await.unwrap();

        let names: Vec<_> = store
            .list("TVET", None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Amy", "Max", "Zed"]);

        let found = store.list("TVET", Some("WELD")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Zed");

        let by_description = store.list("TVET", Some("registrar duties")).await.unwrap();
        assert_eq!(by_description[0].name, "Max");
    }

    #[tokio::test]
    async fn test_update_touches_timestamp() {
        let store = store().await;
        let created = store.insert("LPAF", &form("Ben", "Guard")).await.unwrap();
        let updated = store
            .update("LPAF", created.id, &form("Ben", "Head Guard"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.position, "Head Guard");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.department, "LPAF");
    }
}
