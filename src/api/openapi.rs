//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, requests, reservations, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Librarium API",
        version = "0.3.0",
        description = "School library circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::list_categories,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::adjust_stock,
        // Loans
        loans::list_loans,
        loans::issue_loan,
        loans::get_loan,
        loans::return_loan,
        loans::get_fine,
        // Reservations
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::cancel_reservation,
        reservations::list_for_book,
        reservations::list_for_requester,
        // Issue requests
        requests::submit_request,
        requests::list_requests,
        requests::get_request,
        requests::approve_request,
        requests::decline_request,
        // Stats
        stats::get_summary,
        stats::get_overdue,
        stats::get_actor_stats,
        stats::get_borrower_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookPage,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::AdjustStock,
            crate::models::book::CatalogTotals,
            // Loans
            crate::models::loan::Borrower,
            crate::models::loan::LoanRecord,
            crate::models::loan::LoanStatus,
            crate::models::loan::IssueLoan,
            crate::models::report::FineQuote,
            crate::models::report::ReturnReceipt,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::CreateReservation,
            // Issue requests
            crate::models::issue_request::IssueRequest,
            crate::models::issue_request::RequestStatus,
            crate::models::issue_request::SubmitIssueRequest,
            crate::models::issue_request::ApproveIssueRequest,
            // Stats
            crate::models::report::LibrarySummary,
            crate::models::report::OverdueLoan,
            crate::models::report::BorrowerStats,
            crate::models::report::ActorStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "loans", description = "Issuing, returns and fines"),
        (name = "reservations", description = "Reservation queue"),
        (name = "issue-requests", description = "Self-service issue requests awaiting staff review"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
