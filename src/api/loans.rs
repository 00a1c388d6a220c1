//! Circulation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        loan::{IssueLoan, LoanFilter, LoanRecord},
        report::{AsOfQuery, FineQuote, ReturnReceipt},
    },
    AppState,
};

use super::AuthenticatedActor;

/// List loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanFilter),
    responses(
        (status = 200, description = "Matching loans, most recently issued first", body = Vec<LoanRecord>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(filter): Query<LoanFilter>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let loans = state.services.loans.list_loans(&filter).await?;
    Ok(Json(loans))
}

/// Issue a copy to a borrower
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = IssueLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanRecord),
        (status = 400, description = "Invalid borrower or due date", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_loan(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<IssueLoan>,
) -> AppResult<(StatusCode, Json<LoanRecord>)> {
    let loan = state.services.loans.issue(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Get a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanRecord),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanRecord>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan closed, with the fine owed", body = ReturnReceipt),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnReceipt>> {
    let receipt = state.services.loans.return_loan(id, &actor).await?;
    Ok(Json(receipt))
}

/// Fine owed on a loan
#[utoipa::path(
    get,
    path = "/loans/{id}/fine",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Loan ID"),
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Fine at the given instant", body = FineQuote),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_fine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<FineQuote>> {
    let fine = state.services.loans.fine(id, query.as_of).await?;
    Ok(Json(fine))
}
