//! Department record stores
//!
//! Personnel and finance rows carry the department tag of the role that
//! created them and are only visible from that department. Student records
//! belong to TVET alone, the study library to LPAF alone. Each department
//! keeps its own inventory.

pub mod employees;
pub mod finance;
pub mod inventory;
pub mod students;
pub mod study;

pub use employees::{Employee, EmployeeForm, EmployeeStorage, SqliteEmployeeStorage};
pub use finance::{
    FinanceLedger, FinanceQuery, FinanceStorage, FinanceTotals, FinanceTransaction,
    SqliteFinanceStorage, TransactionFields, TransactionForm, TransactionType, TypeFilter,
};
pub use inventory::{
    Catalog, CatalogEntry, CatalogForm, CatalogStorage, LpafInventory, LpafMaterial,
    LpafMaterialFields, LpafMaterialForm, LpafMaterialStorage, SqliteCatalogStorage, SqliteLpafMaterialStorage,
    SqliteTvetMaterialStorage, TvetInventory, TvetMaterial, TvetMaterialFields,
    TvetMaterialForm, TvetMaterialStorage,
};
pub use students::{SqliteStudentStorage, Student, StudentFields, StudentForm, StudentStorage};
pub use study::{
    SqliteStudyFolderStorage, StudyFolder, StudyFolderFields, StudyFolderForm, StudyFolderQuery,
    StudyFolderStorage,
};

use serde_json::Value;

/// `LIKE` pattern matching `search` anywhere, with wildcards escaped
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Trimmed search term, `None` when blank
pub(crate) fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

/// Whether a loosely typed form value was supplied at all
pub(crate) fn is_present(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Accept integers sent either as JSON numbers or numeric strings
pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept decimals sent either as JSON numbers or numeric strings
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_loose_numbers() {
        assert_eq!(value_as_i64(&json!(21)), Some(21));
        assert_eq!(value_as_i64(&json!(" 21 ")), Some(21));
        assert_eq!(value_as_i64(&json!(2.0)), Some(2));
        assert_eq!(value_as_i64(&json!(2.5)), None);
        assert_eq!(value_as_i64(&json!("x")), None);
        assert_eq!(value_as_f64(&json!("12.50")), Some(12.5));
        assert_eq!(value_as_f64(&json!(true)), None);
    }

    #[test]
    fn test_presence() {
        assert!(!is_present(&None));
        assert!(!is_present(&Some(Value::Null)));
        assert!(!is_present(&Some(json!("  "))));
        assert!(is_present(&Some(json!(0))));
    }
}
