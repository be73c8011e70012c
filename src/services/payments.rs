use crate::{
    auth::AuthUser,
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{GatewaySessionRequest, PaymentGateway, TransactionId},
    services::orders::OrderService,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Payment coordination service.
///
/// Builds gateway checkout sessions for orders and applies the
/// asynchronous success/fail/cancel callbacks. The gateway call happens
/// outside any database transaction: an external network round-trip must
/// never hold row locks.
#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<OrderService>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    config: AppConfig,
}

impl PaymentService {
    pub fn new(
        orders: Arc<OrderService>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        config: AppConfig,
    ) -> Self {
        Self {
            orders,
            gateway,
            event_sender,
            config,
        }
    }

    /// Creates a gateway checkout session and returns the redirect URL.
    ///
    /// Missing amount/order id/item count fails fast with `InvalidRequest`
    /// before any gateway traffic. A non-success gateway status or a
    /// missing redirect URL is `PaymentInitiationFailed`; this service
    /// never retries (retry policy belongs to the client).
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn initiate_payment(
        &self,
        actor: &AuthUser,
        request: InitiatePaymentRequest,
    ) -> Result<PaymentInitiationResponse, ServiceError> {
        let (amount, order_id, items_num) =
            match (request.amount, request.order_id, request.items_num) {
                (Some(amount), Some(order_id), Some(items_num)) => (amount, order_id, items_num),
                _ => {
                    return Err(ServiceError::InvalidRequest(
                        "Missing required parameters.".to_string(),
                    ))
                }
            };

        if amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }

        let tran_id = TransactionId::for_order(order_id);
        let session_request = GatewaySessionRequest {
            total_amount: amount,
            currency: self.config.gateway.currency.clone(),
            tran_id: tran_id.to_string(),
            success_url: self.config.callback_url("success"),
            fail_url: self.config.callback_url("fail"),
            cancel_url: self.config.callback_url("cancel"),
            cus_name: actor.display_name(),
            cus_email: actor.email.clone().unwrap_or_default(),
            cus_phone: actor.phone.clone().unwrap_or_default(),
            cus_add1: actor.address.clone().unwrap_or_default(),
            num_of_item: items_num,
        };

        // External call; deliberately not inside any database transaction.
        let session = self.gateway.create_session(session_request).await?;

        if !session.is_success() {
            warn!(
                "Gateway rejected session for order {}: {:?}",
                order_id, session.failed_reason
            );
            return Err(ServiceError::PaymentInitiationFailed(
                session
                    .failed_reason
                    .unwrap_or_else(|| "gateway reported non-success".to_string()),
            ));
        }

        let payment_url = session.gateway_page_url.ok_or_else(|| {
            ServiceError::PaymentInitiationFailed(
                "gateway did not return a redirect URL".to_string(),
            )
        })?;

        self.event_sender
            .send_or_log(Event::PaymentInitiated { order_id, amount })
            .await;

        info!("Payment initiated for order {}", order_id);
        Ok(PaymentInitiationResponse { payment_url })
    }

    /// Applies a gateway success callback and returns the front-end URL to
    /// redirect to.
    ///
    /// The transaction id must parse (`InvalidRequest`) and reference an
    /// existing order (`NotFound`). Idempotent: a duplicate callback for an
    /// already ready-to-ship order still redirects successfully.
    #[instrument(skip(self))]
    pub async fn handle_success_callback(
        &self,
        raw_tran_id: Option<String>,
    ) -> Result<String, ServiceError> {
        let raw = raw_tran_id.ok_or_else(|| {
            ServiceError::InvalidRequest("invalid or missing transaction id".to_string())
        })?;

        let tran_id = TransactionId::parse(&raw)?;
        let order = self.orders.mark_paid(tran_id.order_id()).await?;

        self.event_sender
            .send_or_log(Event::PaymentSucceeded {
                order_id: order.id,
            })
            .await;

        info!("Payment success callback applied to order {}", order.id);
        Ok(self.config.orders_page_url())
    }

    /// Cancel/fail callbacks mutate nothing; the client is simply sent back
    /// to their orders page.
    pub fn redirect_url(&self) -> String {
        self.config.orders_page_url()
    }
}

/// Body of `POST /payment/initiate`. All fields are required; they are
/// optional here only so their absence can be reported as a 400 rather
/// than a deserialization error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub amount: Option<Decimal>,
    #[serde(rename = "orderId")]
    pub order_id: Option<Uuid>,
    #[serde(rename = "itemsNum")]
    pub items_num: Option<u32>,
}

/// Redirect URL for the hosted checkout page
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentInitiationResponse {
    pub payment_url: String,
}
