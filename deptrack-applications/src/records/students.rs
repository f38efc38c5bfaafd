//! Student records (TVET)

use super::{is_present, like_pattern, search_term, value_as_i64};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

const AGE_RANGE: std::ops::RangeInclusive<i64> = 1..=150;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: i64,
    pub batch: String,
    pub name: String,
    pub age: i64,
    pub address: String,
    pub contact_no: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. `age` may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentForm {
    pub batch: String,
    pub name: String,
    pub age: Option<Value>,
    pub address: String,
    pub contact_no: String,
}

/// A checked student form
#[derive(Debug, Clone, PartialEq)]
pub struct StudentFields {
    pub batch: String,
    pub name: String,
    pub age: i64,
    pub address: String,
    pub contact_no: String,
}

impl StudentForm {
    pub fn validated(self) -> ApplicationResult<StudentFields> {
        let batch = self.batch.trim().to_string();
        let name = self.name.trim().to_string();
        let address = self.address.trim().to_string();
        let contact_no = self.contact_no.trim().to_string();

        if batch.is_empty()
            || name.is_empty()
            || address.is_empty()
            || contact_no.is_empty()
            || !is_present(&self.age)
        {
            return Err(ApplicationError::validation("All fields are required"));
        }

        let age = self
            .age
            .as_ref()
            .and_then(value_as_i64)
            .filter(|age| AGE_RANGE.contains(age))
            .ok_or_else(|| {
                ApplicationError::validation("Age must be a valid number between 1 and 150")
            })?;

        Ok(StudentFields {
            batch,
            name,
            age,
            address,
            contact_no,
        })
    }
}

#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Students ordered by batch then name, optionally searched by name or batch
    async fn list(&self, search: Option<&str>) -> ApplicationResult<Vec<Student>>;

    async fn get(&self, id: i64) -> ApplicationResult<Option<Student>>;

    async fn insert(&self, fields: &StudentFields) -> ApplicationResult<Student>;

    async fn update(&self, id: i64, fields: &StudentFields) -> ApplicationResult<Option<Student>>;

    async fn delete(&self, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteStudentStorage {
    pool: SqlitePool,
}

const STUDENT_COLUMNS: &str = "id, batch, name, age, address, contact_no, created_at, updated_at";

impl SqliteStudentStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch TEXT NOT NULL,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                address TEXT NOT NULL,
                contact_no TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Students table ready");
        Ok(Self { pool })
    }

    fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<Student> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Student {
            id: row.try_get("id")?,
            batch: row.try_get("batch")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
            address: row.try_get("address")?,
            contact_no: row.try_get("contact_no")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl StudentStorage for SqliteStudentStorage {
    async fn list(&self, search: Option<&str>) -> ApplicationResult<Vec<Student>> {
        let rows = match search_term(search) {
            Some(term) => {
                sqlx::query(&format!(
                    "SELECT {STUDENT_COLUMNS} FROM students
                     WHERE name LIKE ?1 ESCAPE '\\' OR batch LIKE ?1 ESCAPE '\\'
                     ORDER BY batch, name"
                ))
                .bind(like_pattern(term))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {STUDENT_COLUMNS} FROM students ORDER BY batch, name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::row_to_student).collect()
    }

    async fn get(&self, id: i64) -> ApplicationResult<Option<Student>> {
        let row = sqlx::query(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_student).transpose()
    }

    async fn insert(&self, fields: &StudentFields) -> ApplicationResult<Student> {
        let now = Utc::now();
        let stamp = format_timestamp(&now);

        let id = sqlx::query(
            "INSERT INTO students (batch, name, age, address, contact_no, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.batch)
        .bind(&fields.name)
        .bind(fields.age)
        .bind(&fields.address)
        .bind(&fields.contact_no)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(student_id = id, batch = %fields.batch, "Student created");

        Ok(Student {
            id,
            batch: fields.batch.clone(),
            name: fields.name.clone(),
            age: fields.age,
            address: fields.address.clone(),
            contact_no: fields.contact_no.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, id: i64, fields: &StudentFields) -> ApplicationResult<Option<Student>> {
        let result = sqlx::query(
            "UPDATE students
             SET batch = ?, name = ?, age = ?, address = ?, contact_no = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&fields.batch)
        .bind(&fields.name)
        .bind(fields.age)
        .bind(&fields.address)
        .bind(&fields.contact_no)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        info!(student_id = id, "Student updated");
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> ApplicationResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
