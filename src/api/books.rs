//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::book::{AdjustStock, Book, BookPage, BookQuery, CreateBook, UpdateBook},
    AppState,
};

use super::AuthenticatedActor;

/// Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "One page of matching books, newest first", body = BookPage)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<BookPage>> {
    let page = state.services.catalog.find_by_query(&query).await?;
    Ok(Json(page))
}

/// Standard category list
#[utoipa::path(
    get,
    path = "/books/categories",
    tag = "books",
    responses(
        (status = 200, description = "Category names", body = Vec<String>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    Json(state.services.catalog.categories())
}

/// Get a book
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a title to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing actor headers", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(create): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.add_book(create, &actor).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Edit book metadata
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.update_book(id, update).await?;
    Ok(Json(book))
}

/// Remove a title
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book removed"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copies are still on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.remove_book(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add or retire physical copies
#[utoipa::path(
    post,
    path = "/books/{id}/stock",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = AdjustStock,
    responses(
        (status = 200, description = "New copy counts", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Adjustment would break copy counts", body = crate::error::ErrorResponse)
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(adjust): Json<AdjustStock>,
) -> AppResult<Json<Book>> {
    let book = state
        .services
        .catalog
        .adjust_stock(id, adjust.delta, &actor)
        .await?;
    Ok(Json(book))
}
