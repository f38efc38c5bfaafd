//! End-to-end checks of the session lifecycle and its audit trail

use deptrack_applications::{
    database, AccessError, AccountKind, ActivityAction, ApplicationError, DepartmentFilter,
    DeptrackApplication, Role, RoleRequirement, SessionContext, UserForm, LOG_PAGE_SIZE,
};
use deptrack_core::{BootstrapConfig, SessionBackend};

async fn setup(backend: SessionBackend) -> DeptrackApplication {
    let pool = database::connect_in_memory().await.unwrap();
    let app = DeptrackApplication::sqlite(pool, backend).await.unwrap();
    app.ensure_bootstrap_admin(&BootstrapConfig::default())
        .await
        .unwrap();
    app
}

async fn add_user(app: &DeptrackApplication, username: &str, kind: AccountKind) -> i64 {
    let form = UserForm {
        name: format!("{} Name", username),
        username: username.to_string(),
        password: "secret".to_string(),
        user_type: kind.to_string(),
        position: "Staff".to_string(),
    };
    app.users()
        .insert(form.into_new_user().unwrap())
        .await
        .unwrap()
        .id
}

async fn admin_context(app: &DeptrackApplication) -> SessionContext {
    let mut ctx = app.authenticate("admin", "admin").await.unwrap().context();
    app.select_role(&mut ctx, Role::Admin).await.unwrap();
    ctx
}

async fn all_logs(app: &DeptrackApplication) -> Vec<deptrack_applications::ActivityLogEntry> {
    app.audit().list_logs(&DepartmentFilter::All).await.unwrap()
}

#[tokio::test]
async fn admin_login_select_logout_scenario() {
    let app = setup(SessionBackend::Memory).await;

    let mut ctx = app.authenticate("admin", "admin").await.unwrap().context();
    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, ActivityAction::Login);
    assert_eq!(logs[0].department, None);

    let target = app.select_role(&mut ctx, Role::Admin).await.unwrap();
    assert_eq!(target, "/admin/logs");
    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, ActivityAction::Access);
    assert_eq!(logs[0].department.as_deref(), Some("ADMIN"));

    let visible = app
        .query_audit_log(&ctx, &DepartmentFilter::All)
        .await
        .unwrap();
    assert_eq!(visible.len(), 2);

    app.end_session(&mut ctx).await.unwrap();
    assert!(!ctx.is_authenticated());

    let logs = all_logs(&app).await;
    let actions: Vec<_> = logs.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            ActivityAction::Logout,
            ActivityAction::Access,
            ActivityAction::Login
        ]
    );
    assert_eq!(logs[0].department.as_deref(), Some("ADMIN"));
    assert!(logs.iter().all(|e| e.username == "admin"));
    assert!(logs.iter().all(|e| e.position == "System Administrator"));
}

#[tokio::test]
async fn member_cannot_select_admin_role() {
    let app = setup(SessionBackend::Database).await;
    add_user(&app, "staff1", AccountKind::Member).await;

    let mut ctx = app.authenticate("staff1", "secret").await.unwrap().context();
    let before = all_logs(&app).await.len();

    let err = app.select_role(&mut ctx, Role::Admin).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Access(AccessError::Forbidden { .. })
    ));
    assert_eq!(ctx.selected_role, None);
    assert_eq!(all_logs(&app).await.len(), before);

    // The stored session is unchanged too
    let reloaded = app.session_context(ctx.token.as_deref()).await.unwrap();
    assert_eq!(reloaded.selected_role, None);
}

#[tokio::test]
async fn logout_without_role_records_empty_department() {
    let app = setup(SessionBackend::Memory).await;
    let mut ctx = app.authenticate("admin", "admin").await.unwrap().context();

    app.end_session(&mut ctx).await.unwrap();

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, ActivityAction::Logout);
    assert_eq!(logs[0].department.as_deref(), Some(""));
    assert_eq!(
        logs.iter()
            .filter(|e| e.action == ActivityAction::Logout)
            .count(),
        1
    );
}

#[tokio::test]
async fn role_switch_writes_only_access_entries() {
    let app = setup(SessionBackend::Memory).await;
    let mut ctx = app.authenticate("admin", "admin").await.unwrap().context();

    app.select_role(&mut ctx, Role::Tvet).await.unwrap();
    app.select_role(&mut ctx, Role::Lpaf).await.unwrap();

    let logs = all_logs(&app).await;
    let actions: Vec<_> = logs.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            ActivityAction::Access,
            ActivityAction::Access,
            ActivityAction::Login
        ]
    );
    assert_eq!(logs[0].department.as_deref(), Some("LPAF"));
    assert_eq!(logs[1].department.as_deref(), Some("TVET"));
}

#[tokio::test]
async fn guard_needs_selected_role() {
    let app = setup(SessionBackend::Memory).await;
    let mut ctx = app.authenticate("admin", "admin").await.unwrap().context();

    let err = app
        .require_role(&ctx, &RoleRequirement::One(Role::Admin))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Access(AccessError::RoleNotSelected { .. })
    ));

    // Operating in TVET does not open LPAF-only or admin operations
    app.select_role(&mut ctx, Role::Tvet).await.unwrap();
    assert!(app
        .require_role(&ctx, &RoleRequirement::One(Role::Lpaf))
        .await
        .is_err());
    assert!(app
        .query_audit_log(&ctx, &DepartmentFilter::All)
        .await
        .is_err());

    let authorized = app
        .require_role(&ctx, &RoleRequirement::OPERATIONAL)
        .await
        .unwrap();
    assert_eq!(authorized.role, Role::Tvet);
}

#[tokio::test]
async fn anonymous_and_stale_sessions_are_rejected() {
    let app = setup(SessionBackend::Memory).await;

    let err = app
        .require_role(&SessionContext::anonymous(), &RoleRequirement::One(Role::Tvet))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Access(AccessError::NotAuthenticated)
    ));

    let id = add_user(&app, "temp", AccountKind::Member).await;
    let mut ctx = app.authenticate("temp", "secret").await.unwrap().context();
    app.select_role(&mut ctx, Role::Tvet).await.unwrap();

    let admin = admin_context(&app).await;
    app.delete_user(&admin, id).await.unwrap();

    let err = app
        .require_role(&ctx, &RoleRequirement::One(Role::Tvet))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Access(AccessError::UserNotFound { .. })
    ));
}

#[tokio::test]
async fn log_entries_survive_rename_and_delete() {
    let app = setup(SessionBackend::Memory).await;
    let id = add_user(&app, "clerk", AccountKind::Member).await;

    let mut ctx = app.authenticate("clerk", "secret").await.unwrap().context();
    app.select_role(&mut ctx, Role::Lpaf).await.unwrap();

    let admin = admin_context(&app).await;
    let rename = UserForm {
        name: "Someone Else".to_string(),
        username: "clerk2".to_string(),
        password: String::new(),
        user_type: "user".to_string(),
        position: "Manager".to_string(),
    };
    app.update_user(&admin, id, rename).await.unwrap();

    let clerk_logs = |logs: Vec<deptrack_applications::ActivityLogEntry>| {
        logs.into_iter()
            .filter(|e| e.user_id == id)
            .collect::<Vec<_>>()
    };

    let renamed = clerk_logs(all_logs(&app).await);
    assert_eq!(renamed.len(), 2);
    assert!(renamed.iter().all(|e| e.username == "clerk"));
    assert!(renamed.iter().all(|e| e.name == "clerk Name"));
    assert!(renamed.iter().all(|e| e.position == "Staff"));

    app.delete_user(&admin, id).await.unwrap();
    assert_eq!(clerk_logs(all_logs(&app).await), renamed);
}

#[tokio::test]
async fn last_admin_deletion_is_rejected() {
    let app = setup(SessionBackend::Memory).await;
    let admin = admin_context(&app).await;
    let bootstrap_id = admin.user_id.unwrap();

    let err = app.delete_user(&admin, bootstrap_id).await.unwrap_err();
    assert!(matches!(err, ApplicationError::LastAdministrator));
    assert_eq!(err.to_string(), "Cannot delete the last admin user");

    let second = add_user(&app, "admin2", AccountKind::Administrator).await;
    let member = add_user(&app, "member", AccountKind::Member).await;
    app.delete_user(&admin, member).await.unwrap();
    app.delete_user(&admin, second).await.unwrap();

    let users = app.list_users(&admin).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "admin");
}

#[tokio::test]
async fn department_filter_and_page_cap() {
    let app = setup(SessionBackend::Memory).await;
    add_user(&app, "busy", AccountKind::Member).await;

    let mut busy = app.authenticate("busy", "secret").await.unwrap().context();
    for _ in 0..(LOG_PAGE_SIZE / 2 + 5) {
        app.select_role(&mut busy, Role::Tvet).await.unwrap();
        app.select_role(&mut busy, Role::Lpaf).await.unwrap();
    }

    let admin = admin_context(&app).await;

    let all = app
        .query_audit_log(&admin, &DepartmentFilter::parse(Some("all")))
        .await
        .unwrap();
    assert_eq!(all.len(), LOG_PAGE_SIZE);
    assert_eq!(all[0].department.as_deref(), Some("ADMIN"));

    let tvet = app
        .query_audit_log(&admin, &DepartmentFilter::parse(Some("tvet")))
        .await
        .unwrap();
    assert_eq!(tvet.len(), LOG_PAGE_SIZE / 2 + 5);
    assert!(tvet.iter().all(|e| e.department.as_deref() == Some("TVET")));
    assert!(tvet.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}
