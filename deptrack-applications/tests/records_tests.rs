//! Department-scoped record operations through the application facade

use deptrack_applications::{
    database, AccessError, ApplicationError, DeptrackApplication, EmployeeForm, FinanceQuery,
    Role, SessionContext, StudentForm, TransactionForm, UserForm,
};
use deptrack_core::{BootstrapConfig, SessionBackend};
use serde_json::json;

async fn setup() -> DeptrackApplication {
    let pool = database::connect_in_memory().await.unwrap();
    let app = DeptrackApplication::sqlite(pool, SessionBackend::Memory)
        .await
        .unwrap();
    app.ensure_bootstrap_admin(&BootstrapConfig::default())
        .await
        .unwrap();

    let staff = UserForm {
        name: "Staff".to_string(),
        username: "staff".to_string(),
        password: "pw".to_string(),
        user_type: "user".to_string(),
        position: String::new(),
    };
    app.users()
        .insert(staff.into_new_user().unwrap())
        .await
        .unwrap();
    app
}

async fn login_as(app: &DeptrackApplication, role: Role) -> SessionContext {
    let mut ctx = app.authenticate("staff", "pw").await.unwrap().context();
    app.select_role(&mut ctx, role).await.unwrap();
    ctx
}

fn employee(name: &str) -> EmployeeForm {
    EmployeeForm {
        name: name.to_string(),
        position: "Instructor".to_string(),
        job_description: "Teaches welding".to_string(),
    }
}

fn transaction(date: &str, kind: &str, amount: f64) -> TransactionForm {
    TransactionForm {
        date: date.to_string(),
        transaction_type: kind.to_string(),
        source: "Tuition".to_string(),
        description: "Fees".to_string(),
        units: None,
        amount: Some(json!(amount)),
        receipt: String::new(),
    }
}

#[tokio::test]
async fn employees_follow_the_active_department() {
    let app = setup().await;
    let mut ctx = login_as(&app, Role::Tvet).await;

    let created = app.create_employee(&ctx, employee("Ana")).await.unwrap();
    assert_eq!(created.department, "TVET");

    app.select_role(&mut ctx, Role::Lpaf).await.unwrap();
    assert!(app.list_employees(&ctx, None).await.unwrap().is_empty());

    let err = app.get_employee(&ctx, created.id).await.unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound { .. }));
    assert_eq!(err.to_string(), "Employee not found");

    let err = app.delete_employee(&ctx, created.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Employee not found");

    app.select_role(&mut ctx, Role::Tvet).await.unwrap();
    let updated = app
        .update_employee(&ctx, created.id, employee("Ana Cruz"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana Cruz");
    assert_eq!(app.list_employees(&ctx, Some("welding")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn students_are_tvet_only() {
    let app = setup().await;
    let lpaf = login_as(&app, Role::Lpaf).await;

    let err = app.list_students(&lpaf, None).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Access(AccessError::RoleNotSelected { .. })
    ));

    let tvet = login_as(&app, Role::Tvet).await;
    let form = StudentForm {
        batch: "2024-A".to_string(),
        name: "Ben".to_string(),
        age: Some(json!("18")),
        address: "Barangay 1".to_string(),
        contact_no: "0917".to_string(),
    };
    let created = app.create_student(&tvet, form).await.unwrap();
    assert_eq!(created.age, 18);
    assert_eq!(app.get_student(&tvet, created.id).await.unwrap().name, "Ben");

    app.delete_student(&tvet, created.id).await.unwrap();
    assert_eq!(
        app.get_student(&tvet, created.id).await.unwrap_err().to_string(),
        "Student not found"
    );
}

#[tokio::test]
async fn finance_totals_ignore_list_filters() {
    let app = setup().await;
    let ctx = login_as(&app, Role::Lpaf).await;

    app.create_transaction(&ctx, transaction("2024-05-01", "income", 1000.0))
        .await
        .unwrap();
    app.create_transaction(&ctx, transaction("2024-05-03", "expenses", 250.5))
        .await
        .unwrap();

    let query = FinanceQuery {
        transaction_type: Some("expenses".to_string()),
        search: None,
    };
    let ledger = app.finance_ledger(&ctx, &query).await.unwrap();
    assert_eq!(ledger.transactions.len(), 1);
    assert_eq!(ledger.totals.total_income, 1000.0);
    assert_eq!(ledger.totals.total_expenses, 250.5);
    assert_eq!(ledger.totals.net_income, 749.5);

    let body = serde_json::to_value(&ledger).unwrap();
    assert_eq!(body["net_income"], json!(749.5));
    assert_eq!(body["transactions"][0]["date"], json!("2024-05-03"));
}

#[tokio::test]
async fn unknown_transaction_type_lists_nothing() {
    let app = setup().await;
    let ctx = login_as(&app, Role::Lpaf).await;
    app.create_transaction(&ctx, transaction("2024-06-01", "income", 40.0))
        .await
        .unwrap();

    let query = FinanceQuery {
        transaction_type: Some("refund".to_string()),
        search: None,
    };
    let ledger = app.finance_ledger(&ctx, &query).await.unwrap();
    assert!(ledger.transactions.is_empty());
    // Totals still cover the whole department
    assert_eq!(ledger.totals.total_income, 40.0);
}

#[tokio::test]
async fn finance_update_checks_department_before_validation() {
    let app = setup().await;
    let mut ctx = login_as(&app, Role::Tvet).await;
    let created = app
        .create_transaction(&ctx, transaction("2024-05-01", "income", 10.0))
        .await
        .unwrap();

    app.select_role(&mut ctx, Role::Lpaf).await.unwrap();
    let err = app
        .update_transaction(&ctx, created.id, TransactionForm::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Transaction not found");

    app.select_role(&mut ctx, Role::Tvet).await.unwrap();
    let err = app
        .update_transaction(&ctx, created.id, TransactionForm::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Validation { .. }));
}
