use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::OrderStatus,
    errors::ServiceError,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/update_status", patch(update_status))
        .route("/has_ordered/:flower_id", get(has_ordered))
}

/// Create an order from a cart
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::services::orders::OrderView),
        (status = 400, description = "Empty cart", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(&user, payload.cart_id)
        .await?;

    Ok(created_response(order))
}

/// List orders: staff see all, everyone else only their own
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Orders", body = crate::services::orders::OrderListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state
        .services
        .orders
        .list_orders(&user, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(orders))
}

/// Fetch one order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order", body = crate::services::orders::OrderView),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id, &user).await?;
    Ok(success_response(order))
}

/// User-initiated cancellation; only the owner, only while pending
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    responses(
        (status = 200, description = "Order canceled"),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.orders.cancel_order(id, &user).await?;
    Ok(success_response(json!({ "status": "Order canceled" })))
}

/// Staff-only status update, validated against the transition table
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/update_status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 403, description = "Not a staff actor", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .update_status(id, payload.status, &user)
        .await?;

    Ok(success_response(json!({
        "status": format!("Order status updated to {}", order.status)
    })))
}

/// Whether the current user has ever ordered this flower
#[utoipa::path(
    get,
    path = "/api/v1/orders/has_ordered/{flower_id}",
    responses(
        (status = 200, description = "Review-eligibility flag")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn has_ordered(
    State(state): State<AppState>,
    user: AuthUser,
    Path(flower_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let has_ordered = state.services.orders.has_ordered(&user, flower_id).await?;
    Ok(success_response(json!({ "has_ordered": has_ordered })))
}

// Request DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub cart_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}
