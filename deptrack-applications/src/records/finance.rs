//! Finance ledger, scoped per operational department
//!
//! Amounts are stored as integer cents so that totals are exact.

use super::{is_present, like_pattern, search_term, value_as_f64, value_as_i64};
use crate::database::{format_timestamp, parse_timestamp};
use crate::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expenses,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expenses => "expenses",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "income" => Ok(TransactionType::Income),
            "expenses" => Ok(TransactionType::Expenses),
            _ => Err(ApplicationError::validation("Invalid transaction type")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinanceTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub source: String,
    pub description: String,
    pub units: i64,
    pub amount: f64,
    /// Free-text receipt reference, empty when none
    pub receipt: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Numbers may arrive as JSON numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransactionForm {
    pub date: String,
    pub transaction_type: String,
    pub source: String,
    pub description: String,
    pub units: Option<Value>,
    pub amount: Option<Value>,
    pub receipt: String,
}

/// A checked transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFields {
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub source: String,
    pub description: String,
    pub units: i64,
    pub amount_cents: i64,
    pub receipt: Option<String>,
}

impl TransactionForm {
    pub fn validated(self) -> ApplicationResult<TransactionFields> {
        let date = self.date.trim();
        let transaction_type = self.transaction_type.trim();
        let source = self.source.trim().to_string();
        let description = self.description.trim().to_string();
        let receipt = self.receipt.trim();

        if date.is_empty()
            || transaction_type.is_empty()
            || source.is_empty()
            || description.is_empty()
            || !is_present(&self.amount)
        {
            return Err(ApplicationError::validation(
                "Date, type, source, items, and amount are required",
            ));
        }

        let transaction_type: TransactionType = transaction_type.parse()?;

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| ApplicationError::validation("Invalid date format. Use YYYY-MM-DD"))?;

        let amount_cents = self
            .amount
            .as_ref()
            .and_then(value_as_f64)
            .map(|amount| (amount * 100.0).round())
            .filter(|cents| *cents >= 1.0 && *cents < i64::MAX as f64)
            .map(|cents| cents as i64)
            .ok_or_else(|| ApplicationError::validation("Amount must be a positive number"))?;

        let units = match &self.units {
            units if !is_present(units) => 1,
            Some(value) => value_as_i64(value)
                .filter(|units| *units >= 0)
                .ok_or_else(|| {
                    ApplicationError::validation("Units must be a non-negative integer")
                })?,
            None => 1,
        };

        Ok(TransactionFields {
            date,
            transaction_type,
            source,
            description,
            units,
            amount_cents,
            receipt: (!receipt.is_empty()).then(|| receipt.to_string()),
        })
    }
}

/// List filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FinanceQuery {
    pub transaction_type: Option<String>,
    pub search: Option<String>,
}

/// How a listing is narrowed by transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    /// No filter given
    Any,
    Only(TransactionType),
    /// A type no transaction can have; matches nothing
    Unmatched,
}

impl FinanceQuery {
    /// The type filter. Blanks mean no filter.
    pub fn type_filter(&self) -> TypeFilter {
        match self.transaction_type.as_deref().map(str::trim) {
            None | Some("") => TypeFilter::Any,
            Some(value) => value
                .parse()
                .map(TypeFilter::Only)
                .unwrap_or(TypeFilter::Unmatched),
        }
    }
}

/// Department-wide sums, regardless of any list filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinanceTotals {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_income: f64,
}

impl FinanceTotals {
    fn from_cents(income: i64, expenses: i64) -> Self {
        Self {
            total_income: cents_to_amount(income),
            total_expenses: cents_to_amount(expenses),
            net_income: cents_to_amount(income - expenses),
        }
    }
}

/// A filtered listing plus the department totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinanceLedger {
    pub transactions: Vec<FinanceTransaction>,
    #[serde(flatten)]
    pub totals: FinanceTotals,
}

fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[async_trait]
pub trait FinanceStorage: Send + Sync {
    /// Transactions of one department, newest date first
    async fn list(
        &self,
        department: &str,
        transaction_type: Option<TransactionType>,
        search: Option<&str>,
    ) -> ApplicationResult<Vec<FinanceTransaction>>;

    async fn totals(&self, department: &str) -> ApplicationResult<FinanceTotals>;

    async fn get(&self, department: &str, id: i64)
        -> ApplicationResult<Option<FinanceTransaction>>;

    async fn insert(
        &self,
        department: &str,
        fields: &TransactionFields,
    ) -> ApplicationResult<FinanceTransaction>;

    async fn update(
        &self,
        department: &str,
        id: i64,
        fields: &TransactionFields,
    ) -> ApplicationResult<Option<FinanceTransaction>>;

    async fn delete(&self, department: &str, id: i64) -> ApplicationResult<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteFinanceStorage {
    pool: SqlitePool,
}

const TRANSACTION_COLUMNS: &str = "id, date, transaction_type, source, description, units, \
     amount_cents, receipt, department, created_at, updated_at";

impl SqliteFinanceStorage {
    pub async fn new(pool: SqlitePool) -> ApplicationResult<Self> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS finance_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                transaction_type TEXT NOT NULL CHECK (transaction_type IN ('income', 'expenses')),
                source TEXT NOT NULL,
                description TEXT NOT NULL,
                units INTEGER NOT NULL DEFAULT 1,
                amount_cents INTEGER NOT NULL,
                receipt TEXT,
                department TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_finance_department_date
                ON finance_transactions(department, date);
            "#,
        )
        .execute(&pool)
        .await?;

        debug!("Finance table ready");
        Ok(Self { pool })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> ApplicationResult<FinanceTransaction> {
        let date: String = row.try_get("date")?;
        let transaction_type: String = row.try_get("transaction_type")?;
        let amount_cents: i64 = row.try_get("amount_cents")?;
        let receipt: Option<String> = row.try_get("receipt")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(FinanceTransaction {
            id: row.try_get("id")?,
            date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| ApplicationError::corrupt(format!("bad date '{}': {}", date, e)))?,
            transaction_type: transaction_type
                .parse()
                .map_err(|_| ApplicationError::corrupt(format!("bad type '{}'", transaction_type)))?,
            source: row.try_get("source")?,
            description: row.try_get("description")?,
            units: row.try_get("units")?,
            amount: cents_to_amount(amount_cents),
            receipt: receipt.unwrap_or_default(),
            department: row.try_get("department")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[async_trait]
impl FinanceStorage for SqliteFinanceStorage {
    async fn list(
        &self,
        department: &str,
        transaction_type: Option<TransactionType>,
        search: Option<&str>,
    ) -> ApplicationResult<Vec<FinanceTransaction>> {
        // NULL parameters disable their filter
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM finance_transactions
             WHERE department = ?1
               AND (?2 IS NULL OR transaction_type = ?2)
               AND (?3 IS NULL
                    OR source LIKE ?3 ESCAPE '\\'
                    OR description LIKE ?3 ESCAPE '\\'
                    OR receipt LIKE ?3 ESCAPE '\\')
             ORDER BY date DESC, id DESC"
        ))
        .bind(department)
        .bind(transaction_type.map(|t| t.as_str()))
        .bind(search_term(search).map(like_pattern))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn totals(&self, department: &str) -> ApplicationResult<FinanceTotals> {
        let row = sqlx::query(
            "SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'income' THEN amount_cents END), 0) AS income,
                COALESCE(SUM(CASE WHEN transaction_type = 'expenses' THEN amount_cents END), 0) AS expenses
             FROM finance_transactions
             WHERE department = ?",
        )
        .bind(department)
        .fetch_one(&self.pool)
        .await?;

        Ok(FinanceTotals::from_cents(
            row.try_get("income")?,
            row.try_get("expenses")?,
        ))
    }

    async fn get(
        &self,
        department: &str,
        id: i64,
    ) -> ApplicationResult<Option<FinanceTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM finance_transactions WHERE id = ? AND department = ?"
        ))
        .bind(id)
        .bind(department)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    async fn insert(
        &self,
        department: &str,
        fields: &TransactionFields,
    ) -> ApplicationResult<FinanceTransaction> {
        let stamp = format_timestamp(&Utc::now());

        let id = sqlx::query(
            "INSERT INTO finance_transactions
                (date, transaction_type, source, description, units, amount_cents, receipt,
                 department, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.date.format(DATE_FORMAT).to_string())
        .bind(fields.transaction_type.as_str())
        .bind(&fields.source)
        .bind(&fields.description)
        .bind(fields.units)
        .bind(fields.amount_cents)
        .bind(&fields.receipt)
        .bind(department)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(
            transaction_id = id,
            department,
            kind = %fields.transaction_type,
            "Transaction created"
        );

        self.get(department, id)
            .await?
            .ok_or_else(|| ApplicationError::corrupt("inserted transaction vanished"))
    }

    async fn update(
        &self,
        department: &str,
        id: i64,
        fields: &TransactionFields,
    ) -> ApplicationResult<Option<FinanceTransaction>> {
        let result = sqlx::query(
            "UPDATE finance_transactions
             SET date = ?, transaction_type = ?, source = ?, description = ?, units = ?,
                 amount_cents = ?, receipt = ?, updated_at = ?
             WHERE id = ? AND department = ?",
        )
        .bind(fields.date.format(DATE_FORMAT).to_string())
        .bind(fields.transaction_type.as_str())
        .bind(&fields.source)
        .bind(&fields.description)
        .bind(fields.units)
        .bind(fields.amount_cents)
        .bind(&fields.receipt)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .bind(department)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        info!(transaction_id = id, department, "Transaction updated");
        self.get(department, id).await
    }

    async fn delete(&self, department: &str, id: i64) -> ApplicationResult<bool> {
        let result = sqlx::query("DELETE FROM finance_transactions WHERE id = ? AND department = ?")
            .bind(id)
            .bind(department)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;
    use serde_json::json;

    fn form(date: &str, kind: &str, amount: Value) -> TransactionForm {
        TransactionForm {
            date: date.to_string(),
            transaction_type: kind.to_string(),
            source: "Canteen".to_string(),
            description: "Daily sales".to_string(),
            units: None,
            amount: Some(amount),
            receipt: String::new(),
        }
    }

    async fn store() -> SqliteFinanceStorage {
        SqliteFinanceStorage::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_validation_messages() {
        let cases = [
            (form("", "income", json!(1)), "Date, type, source, items, and amount are required"),
            (form("2024-01-01", "gift", json!(1)), "Invalid transaction type"),
            (form("01/02/2024", "income", json!(1)), "Invalid date format. Use YYYY-MM-DD"),
            (form("2024-01-01", "income", json!(-5)), "Amount must be a positive number"),
            (form("2024-01-01", "income", json!("abc")), "Amount must be a positive number"),
            (form("2024-01-01", "income", json!(0.004)), "Amount must be a positive number"),
        ];
        for (form, message) in cases {
            assert_eq!(form.validated().unwrap_err().to_string(), message);
        }

        let mut negative_units = form("2024-01-01", "income", json!(1));
        negative_units.units = Some(json!(-1));
        assert_eq!(
            negative_units.validated().unwrap_err().to_string(),
            "Units must be a non-negative integer"
        );
    }

    #[test]
    fn test_defaults_and_rounding() {
        let fields = form("2024-03-05", "expenses", json!("10.005"))
            .validated()
            .unwrap();
        assert_eq!(fields.units, 1);
        assert_eq!(fields.receipt, None);
        assert!(fields.amount_cents == 1000 || fields.amount_cents == 1001);

        let mut zero_units = form("2024-03-05", "income", json!(3.5));
        zero_units.units = Some(json!("0"));
        let fields = zero_units.validated().unwrap();
        assert_eq!(fields.units, 0);
        assert_eq!(fields.amount_cents, 350);
    }

    #[test]
    fn test_query_type_filter() {
        let query = FinanceQuery {
            transaction_type: Some(" ".to_string()),
            search: None,
        };
        assert_eq!(query.type_filter(), TypeFilter::Any);

        let query = FinanceQuery {
            transaction_type: Some("income".to_string()),
            search: None,
        };
        assert_eq!(query.type_filter(), TypeFilter::Only(TransactionType::Income));

        let query = FinanceQuery {
            transaction_type: Some("refund".to_string()),
            search: None,
        };
        assert_eq!(query.type_filter(), TypeFilter::Unmatched);
    }

    #[tokio::test]
    async fn test_listing_and_totals() {
        let store = store().await;
        let income = form("2024-01-10", "income", json!(150.25)).validated().unwrap();
        let expense = form("2024-02-01", "expenses", json!(50)).validated().unwrap();
        let mut other = form("2024-03-01", "income", json!(999)).validated().unwrap();
        other.source = "Grant".to_string();

        store.insert("TVET", &income).await.unwrap();
        store.insert("TVET", &expense).await.unwrap();
        store.insert("LPAF", &other).await.unwrap();

        let all = store.list("TVET", None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let only_income = store
            .list("TVET", Some(TransactionType::Income), None)
            .await
            .unwrap();
        assert_eq!(only_income.len(), 1);
        assert_eq!(only_income[0].amount, 150.25);

        assert!(store.list("TVET", None, Some("grant")).await.unwrap().is_empty());

        let totals = store.totals("TVET").await.unwrap();
        assert_eq!(totals.total_income, 150.25);
        assert_eq!(totals.total_expenses, 50.0);
        assert_eq!(totals.net_income, 100.25);

        assert_eq!(store.totals("EMPTY").await.unwrap(), FinanceTotals::default());
    }

    #[tokio::test]
    async fn test_receipt_search_and_scoped_delete() {
        let store = store().await;
        let mut with_receipt = form("2024-01-10", "expenses", json!(20)).validated().unwrap();
        with_receipt.receipt = Some("OR-5531".to_string());
        let created = store.insert("LPAF", &with_receipt).await.unwrap();
        assert_eq!(created.receipt, "OR-5531");

        assert_eq!(store.list("LPAF", None, Some("or-55")).await.unwrap().len(), 1);
        assert!(!store.delete("TVET", created.id).await.unwrap());
        assert!(store.delete("LPAF", created.id).await.unwrap());
    }
}
