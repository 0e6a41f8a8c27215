use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{PointTransaction, TransactionId};
use super::ledger::LoyaltyLedger;
use super::repository::LedgerStore;
use crate::engine::customers::CustomerId;
use crate::engine::error_response;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Router builder exposing point balances and administrative corrections.
pub fn loyalty_router<S>(ledger: Arc<LoyaltyLedger<S>>) -> Router
where
    S: LedgerStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/customers/:customer_id/points/adjust",
            post(adjust_handler::<S>),
        )
        .route(
            "/api/v1/customers/:customer_id/points/redeem",
            post(redeem_handler::<S>),
        )
        .route(
            "/api/v1/customers/:customer_id/points/summary",
            get(summary_handler::<S>),
        )
        .route(
            "/api/v1/customers/:customer_id/points/history",
            get(history_handler::<S>),
        )
        .with_state(ledger)
}

#[derive(Debug, Deserialize)]
pub struct AdjustPointsRequest {
    pub amount: i64,
    pub reason: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_actor() -> String {
    "admin".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RedeemPointsRequest {
    pub points: i64,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceView {
    pub customer_id: CustomerId,
    pub transaction_id: TransactionId,
    pub new_balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    pub customer_id: CustomerId,
    pub transactions: Vec<PointTransaction>,
}

pub(crate) async fn adjust_handler<S>(
    State(ledger): State<Arc<LoyaltyLedger<S>>>,
    Path(customer_id): Path<String>,
    Json(request): Json<AdjustPointsRequest>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let customer_id = CustomerId(customer_id);
    match ledger
        .adjust(&customer_id, request.amount, &request.reason, &request.actor)
        .await
    {
        Ok(receipt) => {
            let view = BalanceView {
                customer_id,
                transaction_id: receipt.transaction.id,
                new_balance: receipt.balance,
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn redeem_handler<S>(
    State(ledger): State<Arc<LoyaltyLedger<S>>>,
    Path(customer_id): Path<String>,
    Json(request): Json<RedeemPointsRequest>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let customer_id = CustomerId(customer_id);
    match ledger
        .redeem(
            &customer_id,
            request.points,
            request.reference_id,
            request.description,
        )
        .await
    {
        Ok(receipt) => {
            let view = BalanceView {
                customer_id,
                transaction_id: receipt.transaction.id,
                new_balance: receipt.balance,
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn summary_handler<S>(
    State(ledger): State<Arc<LoyaltyLedger<S>>>,
    Path(customer_id): Path<String>,
) -> Response
where
    S: LedgerStore + 'static,
{
    match ledger.summary(&CustomerId(customer_id)).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn history_handler<S>(
    State(ledger): State<Arc<LoyaltyLedger<S>>>,
    Path(customer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: LedgerStore + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let customer_id = CustomerId(customer_id);
    let history = ledger.history(&customer_id, limit);

    match history.collect().await {
        Ok(transactions) => (
            StatusCode::OK,
            Json(HistoryView {
                customer_id,
                transactions,
            }),
        )
            .into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}
