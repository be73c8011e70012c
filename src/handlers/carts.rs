use crate::handlers::common::{
    created_response, no_content_response, success_response, validate_input,
};
use crate::{auth::AuthUser, errors::ServiceError, services::carts::AddItemInput, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{patch, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/:id", axum::routing::get(get_cart).delete(delete_cart))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", patch(update_item).delete(remove_item))
}

/// Get-or-create the authenticated user's cart.
///
/// Idempotent: re-posting returns the existing cart, still with 201, the
/// way the storefront client expects.
pub async fn create_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.get_or_create_cart(&user).await?;
    let view = state.services.carts.build_view(cart).await?;

    Ok(created_response(view))
}

/// Cart with items joined to current flower name/price
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.carts.get_cart(id, &user).await?;
    Ok(success_response(view))
}

/// Delete the authenticated user's cart
pub async fn delete_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.carts.delete_cart(id, &user).await?;
    Ok(no_content_response())
}

/// Add an item to the cart, merging with an existing row if present
pub async fn add_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let item = state
        .services
        .carts
        .add_item(
            cart_id,
            AddItemInput {
                flower_id: payload.flower_id,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(created_response(item))
}

/// Replace a cart item's quantity
pub async fn update_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let item = state
        .services
        .carts
        .update_item(cart_id, item_id, payload.quantity)
        .await?;

    Ok(success_response(item))
}

/// Remove an item from the cart
pub async fn remove_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.carts.remove_item(cart_id, item_id).await?;
    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub flower_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}
