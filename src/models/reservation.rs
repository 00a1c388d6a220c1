//! Reservation (hold) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::book::Book;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    /// The requester was issued the book
    Fulfilled,
    /// Removed by staff
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "fulfilled" => Ok(ReservationStatus::Fulfilled),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(AppError::Internal(format!(
                "Unknown reservation status '{}'",
                other
            ))),
        }
    }
}

/// A borrower's standing request for a copy of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    /// Same identifier space as `Borrower::roll`
    pub requester_id: String,
    pub requester_name: String,
    pub requested_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new(book: &Book, request: CreateReservation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: book.id,
            book_title: book.title.clone(),
            requester_id: request.requester_id.trim().to_string(),
            requester_name: request.requester_name.trim().to_string(),
            requested_at: now,
            status: ReservationStatus::Pending,
            closed_at: None,
        }
    }

    /// Move a pending hold to `status`. Returns `false` when the hold was
    /// already closed, leaving it untouched.
    pub fn close(&mut self, status: ReservationStatus, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.closed_at = Some(at);
        true
    }
}

#[derive(Debug, FromRow)]
pub struct ReservationRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub requester_id: String,
    pub requester_name: String,
    pub requested_at: DateTime<Utc>,
    pub status: String,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            book_title: row.book_title,
            requester_id: row.requester_id,
            requester_name: row.requester_name,
            requested_at: row.requested_at,
            status: row.status.parse()?,
            closed_at: row.closed_at,
        })
    }
}

/// Reserve request body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    pub book_id: Uuid,
    #[validate(length(min = 1, message = "Requester ID is required"))]
    pub requester_id: String,
    #[validate(length(min = 1, message = "Requester name is required"))]
    pub requester_name: String,
}

/// Which reservations to list
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub book_id: Option<Uuid>,
    pub requester_id: Option<String>,
    pub status: Option<ReservationStatus>,
}

impl ReservationFilter {
    pub fn accepts(&self, reservation: &Reservation) -> bool {
        self.book_id.map_or(true, |id| reservation.book_id == id)
            && self
                .requester_id
                .as_deref()
                .map_or(true, |requester| reservation.requester_id == requester)
            && self.status.map_or(true, |status| reservation.status == status)
    }
}
