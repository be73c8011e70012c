pub mod carts;
pub mod common;
pub mod orders;
pub mod payments;

use crate::{
    config::AppConfig,
    events::EventSender,
    gateway::PaymentGateway,
    services::{CartService, OrderService, PaymentService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
    ) -> Self {
        let carts = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let orders = Arc::new(OrderService::new(db, event_sender.clone()));
        let payments = Arc::new(PaymentService::new(
            orders.clone(),
            gateway,
            event_sender,
            config,
        ));

        Self {
            carts,
            orders,
            payments,
        }
    }
}
