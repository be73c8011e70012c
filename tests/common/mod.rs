use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use uuid::Uuid;

use bloomshop_api::{
    auth::{AuthService, AuthUser},
    config::AppConfig,
    db,
    entities::flower,
    errors::ServiceError,
    events::{self, EventSender},
    gateway::{GatewaySessionRequest, GatewaySessionResponse, PaymentGateway},
    handlers::AppServices,
    AppState,
};

/// Gateway stub that always approves a session. Adapter-level behavior is
/// covered separately against a wiremock server.
#[derive(Clone)]
pub struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_session(
        &self,
        request: GatewaySessionRequest,
    ) -> Result<GatewaySessionResponse, ServiceError> {
        Ok(GatewaySessionResponse {
            status: "SUCCESS".to_string(),
            gateway_page_url: Some(format!(
                "https://sandbox.gateway.test/session/{}",
                request.tran_id
            )),
            failed_reason: None,
        })
    }
}

/// Helper harness spinning up application state backed by a throwaway
/// SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub router: NormalizePath<Router>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(StubGateway)).await
    }

    /// Construct a test application with a custom gateway port.
    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("bloomshop_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let db_arc = Arc::new(pool);
        let auth = AuthService::new(cfg.jwt_secret.clone(), cfg.jwt_expiration);
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            gateway,
            cfg.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            auth,
            services,
        };

        let router = NormalizePathLayer::trim_trailing_slash().layer(
            Router::new()
                .nest("/api/v1", bloomshop_api::api_v1_routes())
                .with_state(state.clone()),
        );

        Self {
            state,
            router,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Inserts a catalog entry directly; the catalog has no HTTP surface in
    /// this subsystem.
    pub async fn seed_flower(&self, name: &str, price: Decimal, stock: i32) -> flower::Model {
        let now = Utc::now();
        flower::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed flower")
    }

    pub fn token_for(&self, user: &AuthUser) -> String {
        self.state
            .auth
            .issue_token(user)
            .expect("failed to issue test token")
    }
}

/// A regular storefront customer.
pub fn customer() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: Some("Rosa Gardener".to_string()),
        email: Some("rosa@example.com".to_string()),
        phone: Some("01700000000".to_string()),
        address: Some("12 Petal Lane".to_string()),
        roles: vec!["customer".to_string()],
    }
}

/// A staff actor allowed to drive status updates and see all orders.
pub fn staff() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: Some("Sam Florist".to_string()),
        email: Some("sam@example.com".to_string()),
        phone: None,
        address: None,
        roles: vec!["staff".to_string()],
    }
}
