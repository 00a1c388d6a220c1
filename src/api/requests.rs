//! Self-service issue request endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::issue_request::{ApproveIssueRequest, IssueRequest, IssueRequestQuery, SubmitIssueRequest},
    AppState,
};

use super::AuthenticatedActor;

/// Submit a request for review.
///
/// Open to any identified caller, including students.
#[utoipa::path(
    post,
    path = "/issue-requests",
    tag = "issue-requests",
    request_body = SubmitIssueRequest,
    responses(
        (status = 201, description = "Request recorded as pending", body = IssueRequest),
        (status = 400, description = "No book reference given", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_request(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Json(submit): Json<SubmitIssueRequest>,
) -> AppResult<(StatusCode, Json<IssueRequest>)> {
    let request = state.services.requests.submit(submit).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/issue-requests",
    tag = "issue-requests",
    params(IssueRequestQuery),
    responses(
        (status = 200, description = "Requests, oldest first", body = Vec<IssueRequest>)
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<IssueRequestQuery>,
) -> AppResult<Json<Vec<IssueRequest>>> {
    let requests = state.services.requests.list(query.status).await?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/issue-requests/{id}",
    tag = "issue-requests",
    params(("id" = Uuid, Path, description = "Issue request ID")),
    responses(
        (status = 200, description = "Request details", body = IssueRequest),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IssueRequest>> {
    let request = state.services.requests.get(id).await?;
    Ok(Json(request))
}

/// Approve a request and issue the book
#[utoipa::path(
    post,
    path = "/issue-requests/{id}/approve",
    tag = "issue-requests",
    params(("id" = Uuid, Path, description = "Issue request ID")),
    request_body = ApproveIssueRequest,
    responses(
        (status = 200, description = "Request approved and loan created", body = IssueRequest),
        (status = 400, description = "No confirmed book", body = crate::error::ErrorResponse),
        (status = 404, description = "Request or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Out of stock or already processed", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    AuthenticatedActor(staff): AuthenticatedActor,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<IssueRequest>> {
    let corrections = parse_corrections(&body)?;
    let request = state.services.requests.approve(id, corrections, &staff).await?;
    Ok(Json(request))
}

/// An absent body approves the request as submitted; anything else must be
/// a well-formed correction.
fn parse_corrections(body: &[u8]) -> AppResult<ApproveIssueRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApproveIssueRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid approval body: {}", e)))
}

#[utoipa::path(
    post,
    path = "/issue-requests/{id}/decline",
    tag = "issue-requests",
    params(("id" = Uuid, Path, description = "Issue request ID")),
    responses(
        (status = 200, description = "Request declined", body = IssueRequest),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Request already processed", body = crate::error::ErrorResponse)
    )
)]
pub async fn decline_request(
    State(state): State<AppState>,
    AuthenticatedActor(staff): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IssueRequest>> {
    let request = state.services.requests.decline(id, &staff).await?;
    Ok(Json(request))
}
