//! API handlers for Librarium REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod requests;
pub mod reservations;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::actor::{Actor, Role},
    AppState,
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Caller identity as asserted by the upstream identity service.
///
/// Only presence is checked here; the engine makes no authorization decisions.
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing X-Actor-Id header".to_string()))?;
        let role: Role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing X-Actor-Role header".to_string()))?
            .parse()
            .map_err(AppError::Authentication)?;

        Ok(AuthenticatedActor(Actor::new(id, role)))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/categories", get(books::list_categories))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        .route("/books/:id/stock", post(books::adjust_stock))
        .route("/books/:id/reservations", get(reservations::list_for_book))
        // Circulation
        .route("/loans", get(loans::list_loans).post(loans::issue_loan))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/fine", get(loans::get_fine))
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route(
            "/reservations/:id",
            get(reservations::get_reservation).delete(reservations::cancel_reservation),
        )
        .route("/borrowers/:roll/reservations", get(reservations::list_for_requester))
        .route("/borrowers/:roll/stats", get(stats::get_borrower_stats))
        // Self-service intake
        .route(
            "/issue-requests",
            get(requests::list_requests).post(requests::submit_request),
        )
        .route("/issue-requests/:id", get(requests::get_request))
        .route("/issue-requests/:id/approve", post(requests::approve_request))
        .route("/issue-requests/:id/decline", post(requests::decline_request))
        // Statistics
        .route("/stats", get(stats::get_summary))
        .route("/stats/overdue", get(stats::get_overdue))
        .route("/stats/actors", get(stats::get_actor_stats))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
