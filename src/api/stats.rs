//! Statistics endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::report::{ActorStats, AsOfQuery, BorrowerStats, LibrarySummary, OverdueLoan, OverdueQuery},
    AppState,
};

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Library summary", body = LibrarySummary)
    )
)]
pub async fn get_summary(State(state): State<AppState>) -> AppResult<Json<LibrarySummary>> {
    let summary = state.services.stats.summary().await?;
    Ok(Json(summary))
}

/// Overdue loans, optionally for one class and section
#[utoipa::path(
    get,
    path = "/stats/overdue",
    tag = "stats",
    params(OverdueQuery),
    responses(
        (status = 200, description = "Overdue loans, most overdue first", body = Vec<OverdueLoan>)
    )
)]
pub async fn get_overdue(
    State(state): State<AppState>,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let overdue = state.services.stats.overdue_loans(&query).await?;
    Ok(Json(overdue))
}

#[utoipa::path(
    get,
    path = "/stats/actors",
    tag = "stats",
    responses(
        (status = 200, description = "Loans per issuing actor", body = Vec<ActorStats>)
    )
)]
pub async fn get_actor_stats(State(state): State<AppState>) -> AppResult<Json<Vec<ActorStats>>> {
    let stats = state.services.stats.actor_stats().await?;
    Ok(Json(stats))
}

/// Reading record of a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{roll}/stats",
    tag = "stats",
    params(
        ("roll" = String, Path, description = "Borrower roll or ID"),
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Borrower statistics", body = BorrowerStats)
    )
)]
pub async fn get_borrower_stats(
    State(state): State<AppState>,
    Path(roll): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<BorrowerStats>> {
    let stats = state.services.stats.borrower_stats(&roll, query.as_of).await?;
    Ok(Json(stats))
}
