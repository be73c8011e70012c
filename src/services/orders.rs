use crate::{
    auth::AuthUser,
    entities::{
        cart_item, flower, order, order_item, Cart, CartItem, Flower, Order, OrderItem,
        OrderModel, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order lifecycle service.
///
/// Owns the cart-to-order transition (price snapshotting, stock
/// consistency, and cart emptying, all inside one transaction) and the
/// order state machine (cancellation, staff status updates, the
/// gateway-driven paid transition).
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Converts the cart into an order.
    ///
    /// Preconditions, each a distinct failure: the cart must exist
    /// (`NotFound`) and contain at least one item (`EmptyCart`). The whole
    /// conversion is a single transaction: order + items are inserted with
    /// prices frozen at this instant, stock is validated and decremented,
    /// and the cart items are deleted. Any failure rolls everything back;
    /// a partial order is never observable. The cart items are loaded under
    /// an exclusive lock so two concurrent conversions of the same cart
    /// cannot both consume the same item set.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, cart_id = %cart_id))]
    pub async fn create_order(
        &self,
        actor: &AuthUser,
        cart_id: Uuid,
    ) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;

        Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let cart_items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .lock_exclusive()
            .all(&txn)
            .await?;

        if cart_items.is_empty() {
            return Err(ServiceError::EmptyCart(cart_id));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut total_price = Decimal::ZERO;
        let mut item_views = Vec::with_capacity(cart_items.len());

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(actor.user_id),
            status: Set(OrderStatus::Pending),
            total_price: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for cart_item in &cart_items {
            let flower = Flower::find_by_id(cart_item.flower_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Flower {} does not exist",
                        cart_item.flower_id
                    ))
                })?;

            if flower.stock < cart_item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "flower {} has {} in stock, {} requested",
                    flower.id, flower.stock, cart_item.quantity
                )));
            }

            // Freeze the catalog price at this instant; later catalog
            // changes never touch the order.
            let price = flower.price;
            let line_total = price * Decimal::from(cart_item.quantity);
            total_price += line_total;

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                flower_id: Set(cart_item.flower_id),
                price: Set(price),
                quantity: Set(cart_item.quantity),
                total_price: Set(line_total),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let new_stock = flower.stock - cart_item.quantity;
            let mut flower: flower::ActiveModel = flower.into();
            flower.stock = Set(new_stock);
            flower.updated_at = Set(now);
            flower.update(&txn).await?;

            item_views.push(OrderItemView::from(item));
        }

        let mut order: order::ActiveModel = order.into();
        order.total_price = Set(total_price);
        let order = order.update(&txn).await?;

        // Consume the cart: items go, the cart row stays for reuse.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(
            "Created order {} from cart {} with total {}",
            order_id, cart_id, total_price
        );

        Ok(OrderView::assemble(order, item_views))
    }

    /// Retrieves an order with its items. Staff see every order; a regular
    /// user only their own (a foreign order reads as absent).
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        actor: &AuthUser,
    ) -> Result<OrderView, ServiceError> {
        let order = self.find_visible(order_id, actor).await?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderView::assemble(
            order,
            items.into_iter().map(OrderItemView::from).collect(),
        ))
    }

    /// Lists orders with pagination. The visibility rule is a query-time
    /// filter: staff see all orders, everyone else only their own.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);

        if !actor.is_staff() {
            query = query.filter(order::Column::UserId.eq(actor.user_id));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse {
            orders: orders.into_iter().map(OrderSummary::from).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Cancels the order. Only the owning user may cancel, and only while
    /// the order is still `Pending`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor: &AuthUser,
    ) -> Result<OrderSummary, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "only the order owner can cancel".to_string(),
            ));
        }

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Canceled,
            });
        }

        let mut order: order::ActiveModel = order.into();
        order.status = Set(OrderStatus::Canceled);
        order.updated_at = Set(Utc::now());
        let order = order.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCanceled(order_id))
            .await;

        info!("Canceled order {}", order_id);
        Ok(OrderSummary::from(order))
    }

    /// Staff-driven status update, validated against the transition table.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: &AuthUser,
    ) -> Result<OrderSummary, ServiceError> {
        if !actor.is_staff() {
            return Err(ServiceError::Forbidden(
                "only staff can update order status".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition {
                from: old_status,
                to: new_status,
            });
        }

        if old_status == new_status {
            txn.commit().await?;
            return Ok(OrderSummary::from(order));
        }

        let mut order: order::ActiveModel = order.into();
        order.status = Set(new_status);
        order.updated_at = Set(Utc::now());
        let order = order.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        info!(
            "Order {} status updated: {} to {}",
            order_id, old_status, new_status
        );
        Ok(OrderSummary::from(order))
    }

    /// Gateway-success transition: `Pending` moves to `Ready to ship`.
    ///
    /// No actor: the callback is unauthenticated by the gateway's nature,
    /// so authenticity rests on knowledge of the transaction id alone.
    /// Idempotent: a duplicate callback for an already ready-to-ship order
    /// redundantly reapplies the same status. This path deliberately
    /// bypasses the transition table; the wire protocol gives no choice.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<OrderSummary, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.status == OrderStatus::ReadyToShip {
            txn.commit().await?;
            return Ok(OrderSummary::from(order));
        }

        let old_status = order.status;
        if old_status != OrderStatus::Pending {
            warn!(
                "Payment success callback overriding status {} on order {}",
                old_status, order_id
            );
        }

        let mut order: order::ActiveModel = order.into();
        order.status = Set(OrderStatus::ReadyToShip);
        order.updated_at = Set(Utc::now());
        let order = order.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: OrderStatus::ReadyToShip,
            })
            .await;

        Ok(OrderSummary::from(order))
    }

    /// Whether the actor has ever ordered the given flower. Gates review
    /// eligibility upstream.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn has_ordered(
        &self,
        actor: &AuthUser,
        flower_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let count = OrderItem::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order::Column::UserId.eq(actor.user_id))
            .filter(order_item::Column::FlowerId.eq(flower_id))
            .count(&*self.db)
            .await?;

        Ok(count > 0)
    }

    async fn find_visible(
        &self,
        order_id: Uuid,
        actor: &AuthUser,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !actor.is_staff() && order.user_id != actor.user_id {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        Ok(order)
    }
}

/// Order line item representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub id: Uuid,
    pub flower_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl From<order_item::Model> for OrderItemView {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            flower_id: model.flower_id,
            price: model.price,
            quantity: model.quantity,
            total_price: model.total_price,
        }
    }
}

/// Order without its items, for list responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for OrderSummary {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            total_price: model.total_price,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fully hydrated order representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    fn assemble(order: OrderModel, items: Vec<OrderItemView>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_price: order.total_price,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items,
        }
    }
}

/// Paginated order listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}
