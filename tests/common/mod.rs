#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Duration;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use millwork_api::{
    auth::{AuthConfig, AuthService, AuthUser, Role},
    config::AppConfig,
    db,
    entities::{project, scope_item, user},
    events::{self, EventSender},
    handlers::AppServices,
    notifications::LogMailer,
    pdf::HttpPhotoFetcher,
    services::{
        projects::{AssignUserRequest, CreateProjectRequest},
        scope_items::CreateScopeItemRequest,
    },
    AppState,
};

pub const TEST_SECRET: &str =
    "integration_tests_signing_key_for_millwork_api_with_plenty_of_entropy_0a9f";

/// Application backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("millwork_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", path.display()),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(
            event_rx,
            db.clone(),
            Arc::new(LogMailer),
        ));

        let photos = Arc::new(
            HttpPhotoFetcher::new(std::time::Duration::from_secs(2)).expect("photo client"),
        );
        let services = AppServices::new(db.clone(), event_sender, &cfg, photos);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));

        let state = AppState {
            db,
            config: cfg,
            services,
        };
        let router = millwork_api::app(state.clone(), auth.clone(), CorsLayer::permissive());

        Self {
            router,
            state,
            auth,
            _event_task: event_task,
            _dir: dir,
        }
    }

    /// Inserts a directory row and returns the matching identity.
    pub async fn user(&self, role: Role) -> AuthUser {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            email: Set(format!("{}-{}@example.com", role, id.simple())),
            name: Set(format!("Test {}", role)),
            role: Set(role.to_string()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed user");
        AuthUser::new(id, role)
    }

    pub fn token(&self, user: &AuthUser) -> String {
        self.auth
            .issue_token(user, Duration::minutes(30))
            .expect("issue token")
    }

    pub async fn admin(&self) -> AuthUser {
        self.user(Role::Admin).await
    }

    /// Creates a project as a fresh admin.
    pub async fn project(&self, code: &str) -> project::Model {
        let admin = self.admin().await;
        self.state
            .services
            .projects
            .create(
                &admin,
                CreateProjectRequest {
                    project_code: code.to_string(),
                    name: format!("Project {}", code),
                    client_name: "Harbour Hotel".to_string(),
                    status: None,
                    currency: "USD".to_string(),
                    contract_value: Some(250_000.0),
                    start_date: None,
                    installation_date: None,
                },
            )
            .await
            .expect("create project")
    }

    pub async fn assign(&self, project_id: Uuid, member: &AuthUser) {
        let admin = self.admin().await;
        self.state
            .services
            .projects
            .assign(&admin, project_id, AssignUserRequest { user_id: member.user_id })
            .await
            .expect("assign user");
    }

    /// Seeds a user with `role` already assigned to `project_id`.
    pub async fn member(&self, project_id: Uuid, role: Role) -> AuthUser {
        let member = self.user(role).await;
        self.assign(project_id, &member).await;
        member
    }

    pub async fn item(&self, project_id: Uuid, code: &str) -> scope_item::Model {
        let admin = self.admin().await;
        self.state
            .services
            .scope_items
            .create(&admin, project_id, item_request(code))
            .await
            .expect("create scope item")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&AuthUser>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router.clone().oneshot(request).await.expect("router response")
    }
}

pub fn item_request(code: &str) -> CreateScopeItemRequest {
    CreateScopeItemRequest {
        item_code: code.to_string(),
        name: format!("Item {}", code),
        description: None,
        item_path: Default::default(),
        status: Default::default(),
        quantity: 4.0,
        unit: Some("pcs".to_string()),
        production_percentage: 0,
        initial_unit_cost: Some(100.0),
        initial_total_cost: None,
        actual_unit_cost: None,
        unit_sales_price: Some(150.0),
        notes: None,
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
