//! Payment gateway port and the SSLCommerz HTTP adapter.
//!
//! The gateway is an external collaborator reached over a request/response
//! boundary: we create a hosted-checkout session and later receive
//! success/fail/cancel callbacks correlated by a transaction identifier.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{config::GatewayConfig, errors::ServiceError};

/// Correlation token tying a gateway session to an order.
///
/// The wire encoding is exactly `txn_<order-id>` and the order id is
/// recovered by splitting on the first underscore. The gateway echoes the
/// token back verbatim in callbacks, so this format must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId {
    order_id: Uuid,
}

impl TransactionId {
    const PREFIX: &'static str = "txn";

    pub fn for_order(order_id: Uuid) -> Self {
        Self { order_id }
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// Parses the wire form received in a gateway callback.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let (_, rest) = raw.split_once('_').ok_or_else(|| {
            ServiceError::InvalidRequest("invalid or missing transaction id".to_string())
        })?;

        let order_id = Uuid::parse_str(rest).map_err(|_| {
            ServiceError::InvalidRequest(format!(
                "transaction id does not carry an order id: {}",
                raw
            ))
        })?;

        Ok(Self { order_id })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.order_id)
    }
}

/// Hosted-checkout session request handed to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySessionRequest {
    pub total_amount: Decimal,
    pub currency: String,
    pub tran_id: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub cus_name: String,
    pub cus_email: String,
    pub cus_phone: String,
    pub cus_add1: String,
    pub num_of_item: u32,
}

/// Raw gateway response for a session-creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySessionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "GatewayPageURL")]
    pub gateway_page_url: Option<String>,
    #[serde(rename = "failedreason")]
    pub failed_reason: Option<String>,
}

impl GatewaySessionResponse {
    pub fn is_success(&self) -> bool {
        self.status == "SUCCESS"
    }
}

/// Port to the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted-checkout session. Transport failures surface as
    /// [`ServiceError::PaymentInitiationFailed`]; interpreting a non-success
    /// payload is the caller's concern.
    async fn create_session(
        &self,
        request: GatewaySessionRequest,
    ) -> Result<GatewaySessionResponse, ServiceError>;
}

/// HTTP adapter for the SSLCommerz session API.
#[derive(Clone)]
pub struct SslcommerzGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl SslcommerzGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ServiceError::PaymentInitiationFailed(format!(
                    "failed to build gateway client: {}",
                    e
                ))
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for SslcommerzGateway {
    #[instrument(skip(self, request), fields(tran_id = %request.tran_id))]
    async fn create_session(
        &self,
        request: GatewaySessionRequest,
    ) -> Result<GatewaySessionResponse, ServiceError> {
        let endpoint = self.config.session_endpoint();

        let params = [
            ("store_id", self.config.store_id.clone()),
            ("store_passwd", self.config.store_pass.clone()),
            ("total_amount", request.total_amount.to_string()),
            ("currency", request.currency.clone()),
            ("tran_id", request.tran_id.clone()),
            ("success_url", request.success_url.clone()),
            ("fail_url", request.fail_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("emi_option", "0".to_string()),
            ("cus_name", request.cus_name.clone()),
            ("cus_email", request.cus_email.clone()),
            ("cus_phone", request.cus_phone.clone()),
            ("cus_add1", request.cus_add1.clone()),
            ("cus_city", "Dhaka".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("shipping_method", "NO".to_string()),
            ("num_of_item", request.num_of_item.to_string()),
            ("product_name", "E-commerce products".to_string()),
            ("product_category", "General".to_string()),
            ("product_profile", "general".to_string()),
        ];

        let response = self
            .client
            .post(&endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!("Gateway session request failed: {}", e);
                ServiceError::PaymentInitiationFailed(format!("gateway unreachable: {}", e))
            })?;

        let session: GatewaySessionResponse = response.json().await.map_err(|e| {
            warn!("Gateway returned malformed session payload: {}", e);
            ServiceError::PaymentInitiationFailed(format!("malformed gateway response: {}", e))
        })?;

        info!(status = %session.status, "Gateway session response received");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_wire_format() {
        let order_id = Uuid::new_v4();
        let tran_id = TransactionId::for_order(order_id);

        assert_eq!(tran_id.to_string(), format!("txn_{}", order_id));
    }

    #[test]
    fn transaction_id_round_trip() {
        let order_id = Uuid::new_v4();
        let wire = TransactionId::for_order(order_id).to_string();

        let parsed = TransactionId::parse(&wire).unwrap();
        assert_eq!(parsed.order_id(), order_id);
    }

    #[test]
    fn transaction_id_without_separator_is_rejected() {
        let err = TransactionId::parse("not-a-transaction").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[test]
    fn transaction_id_with_garbage_order_id_is_rejected() {
        let err = TransactionId::parse("txn_12345").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[test]
    fn session_response_success_requires_exact_status() {
        let ok = GatewaySessionResponse {
            status: "SUCCESS".to_string(),
            gateway_page_url: Some("https://pay.example/session".to_string()),
            failed_reason: None,
        };
        assert!(ok.is_success());

        let failed = GatewaySessionResponse {
            status: "FAILED".to_string(),
            gateway_page_url: None,
            failed_reason: Some("store credentials invalid".to_string()),
        };
        assert!(!failed.is_success());
    }
}
