//! Reservation queue

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation, ReservationFilter, ReservationStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
}

impl ReservationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Place a hold. Availability does not matter; one pending hold per
    /// requester and book.
    pub async fn reserve(&self, mut request: CreateReservation) -> AppResult<Reservation> {
        request.requester_id = request.requester_id.trim().to_string();
        request.requester_name = request.requester_name.trim().to_string();
        request.validate()?;

        let book = self.repository.get_book(request.book_id).await?;
        let reservation = Reservation::new(&book, request, Utc::now());
        self.repository.insert_reservation(&reservation).await?;

        tracing::info!(
            reservation_id = %reservation.id,
            book_id = %reservation.book_id,
            requester = %reservation.requester_id,
            "Reservation placed"
        );
        Ok(reservation)
    }

    /// Cancelling a hold that is already closed is a no-op
    pub async fn cancel(&self, id: Uuid) -> AppResult<Reservation> {
        let reservation = self
            .repository
            .close_reservation(id, ReservationStatus::Cancelled, Utc::now())
            .await?;
        tracing::info!(
            reservation_id = %id,
            status = reservation.status.as_str(),
            "Reservation cancelled"
        );
        Ok(reservation)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Reservation> {
        self.repository.get_reservation(id).await
    }

    /// Pending holds on a book, first come first served
    pub async fn list_for(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.repository.get_book(book_id).await?;
        self.repository
            .list_reservations(&ReservationFilter {
                book_id: Some(book_id),
                status: Some(ReservationStatus::Pending),
                ..ReservationFilter::default()
            })
            .await
    }

    /// Every hold a requester has placed, open or closed
    pub async fn list_by_requester(&self, requester_id: &str) -> AppResult<Vec<Reservation>> {
        self.repository
            .list_reservations(&ReservationFilter {
                requester_id: Some(requester_id.trim().to_string()),
                ..ReservationFilter::default()
            })
            .await
    }
}
