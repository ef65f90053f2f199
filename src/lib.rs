pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::database::models::{
    Blog, Category, Media, Portfolio, Resource, Service, Setting, Team, Testimonial, UseCase, User,
};
use crate::handlers::{auth as auth_handlers, health, media, portfolio, resource, user, AppState};
use crate::middleware::session_gate;

/// The full router: resource CRUD, auth endpoints and health, behind the
/// session gate.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);
    let body_limit = state.config.server.max_request_size_bytes;

    Router::new()
        .route("/health", get(health::health))
        .merge(auth_routes())
        .merge(resource_routes())
        .layer(from_fn_with_state(state.tokens.clone(), session_gate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-in", post(auth_handlers::sign_in))
        .route("/api/auth/sign-up", post(auth_handlers::sign_up))
        .route("/api/auth/send-invite", post(auth_handlers::send_invite))
        .route("/api/auth/validate-token", post(auth_handlers::validate_token))
        .route("/api/auth/set-password", patch(auth_handlers::set_password))
        .route("/api/auth/sign-out", post(auth_handlers::sign_out))
}

fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/api/blog", crud::<Blog>())
        .route("/api/category", crud::<Category>())
        .route("/api/media", crud::<Media>())
        .route("/api/media/asset", delete(media::delete_asset))
        .route(
            "/api/portfolio",
            get(resource::get_resource::<Portfolio>)
                .post(portfolio::create_portfolio)
                .patch(portfolio::update_portfolio)
                .delete(resource::delete_resource::<Portfolio>),
        )
        .route("/api/service", crud::<Service>())
        .route("/api/team", crud::<Team>())
        .route("/api/testimonial", crud::<Testimonial>())
        .route("/api/use-case", crud::<UseCase>())
        .route("/api/setting", crud::<Setting>())
        .route(
            "/api/user",
            get(resource::get_resource::<User>)
                .post(resource::create_resource::<User>)
                .patch(resource::update_resource::<User>)
                .delete(user::delete_user),
        )
}

fn crud<R: Resource>() -> MethodRouter<AppState> {
    get(resource::get_resource::<R>)
        .post(resource::create_resource::<R>)
        .patch(resource::update_resource::<R>)
        .delete(resource::delete_resource::<R>)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
