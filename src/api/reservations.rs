//! Reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation},
    AppState,
};

use super::AuthenticatedActor;

/// Place a hold on a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Requester already holds a pending reservation", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state.services.reservations.reserve(request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(id).await?;
    Ok(Json(reservation))
}

/// Cancel a hold (no-op when already closed)
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation closed", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(id).await?;
    Ok(Json(reservation))
}

/// Pending holds on a book in request order
#[utoipa::path(
    get,
    path = "/books/{id}/reservations",
    tag = "reservations",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Pending reservations, oldest first", body = Vec<Reservation>),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_for_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list_for(id).await?;
    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/borrowers/{roll}/reservations",
    tag = "reservations",
    params(("roll" = String, Path, description = "Requester roll or ID")),
    responses(
        (status = 200, description = "All reservations of the requester", body = Vec<Reservation>)
    )
)]
pub async fn list_for_requester(
    State(state): State<AppState>,
    Path(roll): Path<String>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list_by_requester(&roll).await?;
    Ok(Json(reservations))
}
