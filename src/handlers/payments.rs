use crate::handlers::common::success_response;
use crate::{
    auth::AuthUser, errors::ServiceError, services::payments::InitiatePaymentRequest, AppState,
};
use axum::{
    extract::{Form, Json, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

/// Creates the router for payment endpoints.
///
/// The gateway calls the callback URLs with a trailing slash; the
/// path-normalization layer in front of the router strips it.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/success", get(payment_success).post(payment_success))
        .route("/cancel", get(payment_cancel).post(payment_cancel))
        .route("/fail", get(payment_fail).post(payment_fail))
}

/// Create a gateway checkout session for an order
#[utoipa::path(
    post,
    path = "/api/v1/payment/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Redirect URL for the hosted checkout",
            body = crate::services::payments::PaymentInitiationResponse),
        (status = 400, description = "Missing parameters", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway rejected the session", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state
        .services
        .payments
        .initiate_payment(&user, payload)
        .await?;

    Ok(success_response(response))
}

/// Gateway success callback.
///
/// Unauthenticated by the gateway's nature; authenticity rests on knowledge
/// of the transaction id. The id arrives in the form body (POST) or the
/// query string (GET). Parse and lookup failures surface as their HTTP
/// statuses; on success the client is redirected to their orders page.
pub async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<CallbackParams>,
    form: Option<Form<CallbackParams>>,
) -> Result<impl IntoResponse, ServiceError> {
    let tran_id = form.and_then(|f| f.0.tran_id).or(query.tran_id);

    let redirect_to = state
        .services
        .payments
        .handle_success_callback(tran_id)
        .await?;

    Ok(Redirect::to(&redirect_to))
}

/// Gateway cancel callback: no state change, redirect only
pub async fn payment_cancel(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::to(&state.services.payments.redirect_url())
}

/// Gateway fail callback: no state change, redirect only
pub async fn payment_fail(State(state): State<AppState>) -> impl IntoResponse {
    Redirect::to(&state.services.payments.redirect_url())
}

/// Callback parameters delivered by the gateway
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub tran_id: Option<String>,
}
