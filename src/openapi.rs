use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation for the HTTP surface
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bloomshop API",
        description = "Flower shop backend: carts, order lifecycle, and payment checkout"
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::update_status,
        crate::handlers::orders::has_ordered,
        crate::handlers::payments::initiate_payment,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::OrderStatus,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::UpdateStatusRequest,
        crate::services::orders::OrderView,
        crate::services::orders::OrderItemView,
        crate::services::orders::OrderSummary,
        crate::services::orders::OrderListResponse,
        crate::services::payments::InitiatePaymentRequest,
        crate::services::payments::PaymentInitiationResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Orders", description = "Order lifecycle"),
        (name = "Payments", description = "Payment gateway coordination")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI mounted at `/docs`
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
