//! Router assembly and the state shared by every handler.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::AuthService;
use crate::bootstrap::Defaults;
use crate::config::SecurityConfig;
use crate::database::{DatabaseManager, Store};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, Authorizer};
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthService,
    pub authorizer: Authorizer,
    /// Present when serving from Postgres; `/health` pings it.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, defaults: Defaults, auth: AuthService, pool: Option<PgPool>) -> Self {
        let services = Services::new(store, defaults);
        let authorizer = Authorizer::new(services.staff.clone());
        Self {
            services,
            auth,
            authorizer,
            pool,
        }
    }
}

pub fn router(state: AppState, security: &SecurityConfig) -> Router {
    let api = Router::new()
        .merge(event_routes())
        .merge(step_routes())
        .merge(prize_routes())
        .merge(user_routes())
        .merge(position_routes())
        .merge(organization_routes())
        .merge(team_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/sign-up", post(public::auth::sign_up))
        .route("/auth/sign-in", post(public::auth::sign_in))
        .nest("/api", api)
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

fn event_routes() -> Router<AppState> {
    use protected::events;

    Router::new()
        .route("/event", post(events::create))
        .route("/event/invitation", get(events::invitations))
        .route("/event/invitation/:id", post(events::answer_invitation))
        .route("/event/invite/:id", post(events::invite))
        .route("/event/staff/:role", get(events::own_events))
        .route("/event/team/:id", get(events::by_team))
        .route("/event/org/:id", get(events::by_organization))
        .route("/event/score/:id", get(events::score))
        .route("/event/remove/:id", delete(events::remove_staff))
        .route(
            "/event/:id",
            get(events::get).put(events::update).delete(events::delete),
        )
}

fn step_routes() -> Router<AppState> {
    use protected::steps;

    Router::new()
        .route("/event/step", post(steps::create))
        .route("/event/step/steps/:id", get(steps::list))
        .route("/event/step/prizes/:id", get(steps::prizes))
        .route("/event/step/status/:id", put(steps::pass))
        .route("/event/step/assign/:id", put(steps::assign))
        .route("/event/step/cancel/:id", put(steps::cancel))
        .route(
            "/event/step/:id",
            get(steps::get).put(steps::update).delete(steps::delete),
        )
}

fn prize_routes() -> Router<AppState> {
    use protected::prizes;

    Router::new()
        .route("/prize", post(prizes::create).get(prizes::own))
        .route("/prize/all", get(prizes::all))
        .route("/prize/type/:type", get(prizes::by_type))
        .route("/prize/give/:id", post(prizes::give))
        .route(
            "/prize/:id",
            get(prizes::get).put(prizes::update).delete(prizes::delete),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::staff;

    Router::new()
        .route("/user", post(staff::create))
        .route("/user/me", get(staff::me))
        .route("/user/image", put(staff::image))
        .route("/user/prizes/:id", get(staff::prizes))
        .route("/user/event/:id", get(staff::by_event))
        .route("/user/step/:id", get(staff::by_step))
        .route(
            "/user/:id",
            get(staff::get).put(staff::update).delete(staff::delete),
        )
}

fn position_routes() -> Router<AppState> {
    use protected::positions;

    Router::new()
        .route("/user/position", post(positions::create))
        .route("/user/position/org/:id", get(positions::by_organization))
        .route("/user/position/perm/:id", put(positions::remove_permissions))
        .route("/user/position/give/:id", put(positions::give))
        .route("/user/position/take/:id", put(positions::take))
        .route(
            "/user/position/:id",
            get(positions::get).put(positions::update).delete(positions::delete),
        )
}

fn organization_routes() -> Router<AppState> {
    use protected::organizations;

    Router::new()
        .route("/org", get(organizations::list).post(organizations::create))
        .route("/org/type", get(organizations::types).post(organizations::create_type))
        .route(
            "/org/type/:id",
            get(organizations::get_type)
                .put(organizations::update_type)
                .delete(organizations::delete_type),
        )
        .route(
            "/org/staff/:id",
            get(organizations::staff).put(organizations::add_staff),
        )
        .route(
            "/org/:id",
            get(organizations::get)
                .put(organizations::update)
                .delete(organizations::delete),
        )
}

fn team_routes() -> Router<AppState> {
    use protected::teams;

    Router::new()
        .route("/team", post(teams::create))
        .route("/team/org/:id", get(teams::by_organization))
        .route("/team/event/:id", get(teams::by_event))
        .route(
            "/team/:id",
            get(teams::get).put(teams::update).delete(teams::delete),
        )
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let storage = match &state.pool {
        Some(pool) => {
            DatabaseManager::health_check(pool).await.map_err(|e| {
                warn!("Health check failed: {}", e);
                ApiError::service_unavailable("database unreachable")
            })?;
            "postgres"
        }
        None => "memory",
    };
    Ok(Json(json!({
        "success": true,
        "data": { "status": "ok", "storage": storage }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::bootstrap::ensure_defaults;
    use crate::config::{AppConfig, BootstrapConfig};
    use crate::database::MemoryStore;

    async fn test_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let bootstrap = BootstrapConfig {
            admin_email: Some("root@acheer.test".into()),
            admin_password: Some("root-password".into()),
            ..Default::default()
        };
        let defaults = ensure_defaults(store.as_ref(), &bootstrap).await.unwrap();
        let security = AppConfig::development().security;
        let state = AppState::new(store, defaults, AuthService::from_config(&security), None);
        router(state, &security)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_the_storage_backend() {
        let response = test_app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["storage"], "memory");
    }

    #[tokio::test]
    async fn api_routes_reject_anonymous_callers() {
        let response = test_app()
            .await
            .oneshot(Request::builder().uri("/api/user/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signed_in_admin_reaches_the_api() {
        let app = test_app().await;
        let sign_in = Request::builder()
            .method("POST")
            .uri("/auth/sign-in")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "email": "ROOT@acheer.test", "password": "root-password" }).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(sign_in).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_body(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let me = Request::builder()
            .uri("/api/user/me")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(me).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["email"], "root@acheer.test");
    }
}
