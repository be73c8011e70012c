use crate::{
    auth::AuthUser,
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Flower},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shopping cart service.
///
/// Carts are mutable pre-checkout state: one active cart per user, one row
/// per (cart, flower) pair. Display prices always come from the live
/// catalog; nothing here is frozen. The cart is consumed (its items, not
/// the row) when an order is created from it.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the actor's cart, creating one if none exists.
    ///
    /// Idempotent: posting twice returns the same cart rather than a
    /// duplicate.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_or_create_cart(&self, actor: &AuthUser) -> Result<CartModel, ServiceError> {
        let existing = Cart::find()
            .filter(cart::Column::UserId.eq(Some(actor.user_id)))
            .one(&*self.db)
            .await?;

        if let Some(cart) = existing {
            return Ok(cart);
        }

        let cart_id = Uuid::new_v4();
        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(cart_id),
            user_id: Set(Some(actor.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart {} for user {}", cart_id, actor.user_id);
        Ok(cart)
    }

    /// Adds an item to the cart, merging into an existing row when the
    /// flower is already present.
    ///
    /// The read-increment-write runs inside a transaction with an exclusive
    /// row lock so concurrent adds for the same (cart, flower) pair
    /// serialize instead of losing updates. Stock is not checked here;
    /// it is validated at order-creation time.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartItemModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        Flower::find_by_id(input.flower_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Flower {} does not exist", input.flower_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::FlowerId.eq(input.flower_id))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let item = if let Some(item) = existing {
            // Accumulate, never replace: adding qty 2 then 3 yields 5.
            let quantity = item.quantity + input.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?
        } else {
            let now = Utc::now();
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                flower_id: Set(input.flower_id),
                quantity: Set(input.quantity),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                flower_id: input.flower_id,
            })
            .await;

        info!(
            "Added flower {} x{} to cart {}",
            input.flower_id, input.quantity, cart_id
        );
        Ok(item)
    }

    /// Replaces the quantity of a cart item outright (no accumulation).
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(item_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.cart_id != cart_id {
            return Err(ServiceError::InvalidRequest(
                "item does not belong to this cart".to_string(),
            ));
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        let item = item.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated { cart_id, item_id })
            .await;

        Ok(item)
    }

    /// Removes an item from the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.cart_id != cart_id {
            return Err(ServiceError::InvalidRequest(
                "item does not belong to this cart".to_string(),
            ));
        }

        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved { cart_id, item_id })
            .await;

        Ok(())
    }

    /// Retrieves the actor's cart with items joined to current flower
    /// name/price for display. These display prices are NOT what gets
    /// frozen into an order.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_cart(&self, cart_id: Uuid, actor: &AuthUser) -> Result<CartView, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .filter(|c| c.user_id == Some(actor.user_id))
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        self.build_view(cart).await
    }

    /// Deletes the actor's cart along with its items.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn delete_cart(&self, cart_id: Uuid, actor: &AuthUser) -> Result<(), ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .filter(|c| c.user_id == Some(actor.user_id))
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let txn = self.db.begin().await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
        cart.delete(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartDeleted(cart_id))
            .await;

        info!("Deleted cart {}", cart_id);
        Ok(())
    }

    /// Hydrates a cart model into its display representation.
    pub async fn build_view(&self, cart: CartModel) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Flower)
            .all(&*self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut total_price = Decimal::ZERO;

        for (item, flower) in rows {
            // Flower rows are never deleted by this subsystem; a dangling
            // reference means the catalog broke its contract.
            let flower = flower.ok_or(ServiceError::InternalServerError)?;
            let line_total = flower.price * Decimal::from(item.quantity);
            total_price += line_total;

            items.push(CartItemView {
                id: item.id,
                flower: FlowerSummary {
                    id: flower.id,
                    name: flower.name,
                    price: flower.price,
                },
                quantity: item.quantity,
                total_price: line_total,
            });
        }

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items,
            total_price,
        })
    }
}

/// Input for adding an item to a cart
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub flower_id: Uuid,
    pub quantity: i32,
}

/// Abbreviated catalog entry embedded in cart views
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlowerSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// Cart item joined with current catalog data for display
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub id: Uuid,
    pub flower: FlowerSummary,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Cart with display-priced items
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub items: Vec<CartItemView>,
    pub total_price: Decimal,
}
