//! Route definitions for the deptrack web server

use crate::{handlers, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}

/// Entry point and the per-role landing resources
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/admin/logs", get(handlers::admin_logs))
        .route("/tvet/inventory", get(handlers::tvet_inventory))
        .route("/lpaf/inventory", get(handlers::lpaf_inventory))
}

/// Session lifecycle, mounted under `/auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/role", get(handlers::available_roles))
        .route("/select-role/{role}", post(handlers::select_role))
        .route("/logout", post(handlers::logout))
}

/// Guarded resources, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Administration
        .route("/logs", get(handlers::list_logs))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        // Personnel
        .route(
            "/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/employees/{id}",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        // Students
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        // Finance
        .route(
            "/finance/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/finance/transactions/{id}",
            put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // TVET inventory
        .route(
            "/tvet/inventory/materials",
            get(handlers::list_tvet_materials).post(handlers::create_tvet_material),
        )
        .route(
            "/tvet/inventory/materials/{id}",
            put(handlers::update_tvet_material).delete(handlers::delete_tvet_material),
        )
        .route(
            "/tvet/inventory/{catalog}",
            get(handlers::list_tvet_entries).post(handlers::create_tvet_entry),
        )
        .route(
            "/tvet/inventory/{catalog}/{id}",
            put(handlers::update_tvet_entry).delete(handlers::delete_tvet_entry),
        )
        // LPAF inventory
        .route(
            "/lpaf/inventory/materials",
            get(handlers::list_lpaf_materials).post(handlers::create_lpaf_material),
        )
        .route(
            "/lpaf/inventory/materials/{id}",
            put(handlers::update_lpaf_material).delete(handlers::delete_lpaf_material),
        )
        .route(
            "/lpaf/inventory/{catalog}",
            get(handlers::list_lpaf_entries).post(handlers::create_lpaf_entry),
        )
        .route(
            "/lpaf/inventory/{catalog}/{id}",
            put(handlers::update_lpaf_entry).delete(handlers::delete_lpaf_entry),
        )
        // Study library
        .route(
            "/study/folders",
            get(handlers::list_study_folders).post(handlers::create_study_folder),
        )
        .route(
            "/study/folders/{id}",
            put(handlers::update_study_folder).delete(handlers::delete_study_folder),
        )
}
