//! Department finance ledger
//!
//! Listing totals always cover the whole department, whatever filter the
//! listing itself uses.

use super::types::MessageResponse;
use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use deptrack_applications::{FinanceQuery, TransactionForm};
use serde_json::{json, Value};

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Query(query): Query<FinanceQuery>,
) -> ApiResult<Json<Value>> {
    let ledger = state.application.finance_ledger(&ctx, &query).await?;
    Ok(Json(json!({
        "success": true,
        "transactions": ledger.transactions,
        "total_income": ledger.totals.total_income,
        "total_expenses": ledger.totals.total_expenses,
        "net_income": ledger.totals.net_income,
    })))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(form): Json<TransactionForm>,
) -> ApiResult<Json<Value>> {
    let transaction = state.application.create_transaction(&ctx, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Transaction added successfully",
        "transaction": transaction,
    })))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
    Json(form): Json<TransactionForm>,
) -> ApiResult<Json<Value>> {
    let transaction = state
        .application
        .update_transaction(&ctx, id, form)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Transaction updated successfully",
        "transaction": transaction,
    })))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.application.delete_transaction(&ctx, id).await?;
    Ok(Json(MessageResponse::ok("Transaction deleted successfully")))
}
