//! Repository layer: the `LibraryStore` seam and its backends

pub mod memory;
pub mod postgres;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CatalogTotals, UpdateBook},
        issue_request::{IssueRequest, RequestStatus},
        loan::{LoanFilter, LoanRecord},
        reservation::{Reservation, ReservationFilter, ReservationStatus},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence for the circulation engine.
///
/// Every method is one transaction. `issue`, `return_loan`,
/// `adjust_stock` and `approve_issue_request` are the only writers of
/// `Book::available_copies` and must apply the copy-count change and the
/// record change together or not at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> AppResult<()>;

    // Catalog

    async fn insert_book(&self, book: &Book) -> AppResult<()>;

    async fn get_book(&self, id: Uuid) -> AppResult<Book>;

    /// Metadata only; copy counts are left alone
    async fn update_book(&self, id: Uuid, update: UpdateBook, at: DateTime<Utc>) -> AppResult<Book>;

    /// Shift both counts by `delta`; `InvariantViolation` if available copies would go negative
    async fn adjust_stock(&self, id: Uuid, delta: i32, at: DateTime<Utc>) -> AppResult<Book>;

    /// `Conflict` while any issued loan references the book. Pending holds are cancelled.
    async fn delete_book(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// One page of matches, newest first, plus the total match count
    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;

    async fn catalog_totals(&self) -> AppResult<CatalogTotals>;

    // Circulation

    /// Take one copy off the shelf and record the loan. `OutOfStock` when no
    /// copy is available. A pending hold of the borrower on this book is
    /// marked fulfilled in the same transaction.
    async fn issue(&self, loan: &LoanRecord) -> AppResult<()>;

    /// Close the loan and put the copy back on the shelf
    async fn return_loan(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<LoanRecord>;

    async fn get_loan(&self, id: Uuid) -> AppResult<LoanRecord>;

    /// Matching loans, most recently issued first
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>>;

    // Reservations

    /// `DuplicateReservation` if the requester already holds a pending one for the book
    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()>;

    async fn get_reservation(&self, id: Uuid) -> AppResult<Reservation>;

    /// Close a pending hold; an already-closed one is returned unchanged
    async fn close_reservation(
        &self,
        id: Uuid,
        status: ReservationStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation>;

    /// Matching reservations in request order (oldest first)
    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>>;

    // Self-service intake

    async fn insert_issue_request(&self, request: &IssueRequest) -> AppResult<()>;

    async fn get_issue_request(&self, id: Uuid) -> AppResult<IssueRequest>;

    /// Requests in submission order (oldest first)
    async fn list_issue_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<IssueRequest>>;

    /// Issue `loan` exactly like [`LibraryStore::issue`] and mark the request
    /// approved, atomically. On any failure the request stays pending.
    async fn approve_issue_request(
        &self,
        id: Uuid,
        loan: &LoanRecord,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest>;

    async fn decline_issue_request(
        &self,
        id: Uuid,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest>;
}

/// Shared handle to the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn LibraryStore>,
}

impl Repository {
    pub fn new(store: impl LibraryStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// In-process store, used by tests and the `memory` backend
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl Deref for Repository {
    type Target = dyn LibraryStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
