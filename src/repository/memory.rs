//! In-process store.
//!
//! All tables sit behind a single async mutex, so every operation runs as one
//! serialized transaction: the lock is taken once, nothing is awaited while
//! it is held, and an operation either applies all of its writes or returns
//! an error before touching anything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::LibraryStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CatalogTotals, UpdateBook},
        issue_request::{IssueRequest, RequestStatus},
        loan::{LoanFilter, LoanRecord, LoanStatus},
        reservation::{Reservation, ReservationFilter, ReservationStatus},
    },
};

/// Tables keep insertion order, which doubles as the tie-breaker for
/// "newest first" and FIFO listings.
#[derive(Default)]
struct Tables {
    books: IndexMap<Uuid, Book>,
    loans: IndexMap<Uuid, LoanRecord>,
    reservations: IndexMap<Uuid, Reservation>,
    requests: IndexMap<Uuid, IssueRequest>,
}

fn book_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

impl Tables {
    fn book(&self, id: Uuid) -> AppResult<&Book> {
        self.books.get(&id).ok_or_else(|| book_not_found(id))
    }

    /// Shared by direct issues and request approvals
    fn issue(&mut self, loan: &LoanRecord) -> AppResult<()> {
        if self.loans.contains_key(&loan.id) {
            return Err(AppError::Conflict(format!("Loan {} already exists", loan.id)));
        }
        let book = self
            .books
            .get_mut(&loan.book_id)
            .ok_or_else(|| book_not_found(loan.book_id))?;
        if book.available_copies <= 0 {
            return Err(AppError::OutOfStock(format!(
                "No copy of '{}' is available",
                book.title
            )));
        }
        book.available_copies -= 1;

        for reservation in self.reservations.values_mut() {
            if reservation.book_id == loan.book_id
                && reservation.requester_id == loan.borrower.roll
            {
                reservation.close(ReservationStatus::Fulfilled, loan.issued_at);
            }
        }

        self.loans.insert(loan.id, loan.clone());
        Ok(())
    }
}

/// Store backed by process memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_book(&self, book: &Book) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.books.contains_key(&book.id) {
            return Err(AppError::Conflict(format!("Book {} already exists", book.id)));
        }
        tables.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        let tables = self.tables.lock().await;
        tables.book(id).cloned()
    }

    async fn update_book(&self, id: Uuid, update: UpdateBook, at: DateTime<Utc>) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let book = tables.books.get_mut(&id).ok_or_else(|| book_not_found(id))?;
        book.apply_update(update, at);
        Ok(book.clone())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32, at: DateTime<Utc>) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let book = tables.books.get_mut(&id).ok_or_else(|| book_not_found(id))?;
        let (total, available) = book.stock_after(delta)?;
        book.total_copies = total;
        book.available_copies = available;
        book.updated_at = at;
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.book(id)?;
        let outstanding = tables
            .loans
            .values()
            .filter(|loan| loan.book_id == id && loan.status == LoanStatus::Issued)
            .count();
        if outstanding > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copies on loan",
                id, outstanding
            )));
        }
        for reservation in tables.reservations.values_mut() {
            if reservation.book_id == id {
                reservation.close(ReservationStatus::Cancelled, at);
            }
        }
        tables.books.shift_remove(&id);
        Ok(())
    }

    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let tables = self.tables.lock().await;
        let needle = query.needle();
        let matches = tables
            .books
            .values()
            .rev()
            .filter(|book| book.matches(&needle))
            .filter(|book| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |category| book.category.as_deref() == Some(category))
            });

        let total = matches.clone().count() as i64;
        let page = matches
            .skip(query.offset() as usize)
            .take(query.per_page() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn catalog_totals(&self) -> AppResult<CatalogTotals> {
        let tables = self.tables.lock().await;
        Ok(tables
            .books
            .values()
            .fold(CatalogTotals::default(), |mut totals, book| {
                totals.titles += 1;
                totals.total_copies += i64::from(book.total_copies);
                totals.available_copies += i64::from(book.available_copies);
                totals
            }))
    }

    async fn issue(&self, loan: &LoanRecord) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.issue(loan)
    }

    async fn return_loan(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut tables = self.tables.lock().await;
        let Tables { books, loans, .. } = &mut *tables;

        let loan = loans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        if loan.status == LoanStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Loan {} was already returned",
                id
            )));
        }

        let book = books.get_mut(&loan.book_id).ok_or_else(|| {
            AppError::invariant(format!(
                "Loan {} references missing book {}",
                id, loan.book_id
            ))
        })?;
        if book.available_copies >= book.total_copies {
            return Err(AppError::invariant(format!(
                "Returning loan {} would raise book {} above {} copies",
                id, book.id, book.total_copies
            )));
        }

        loan.mark_returned(at)?;
        book.available_copies += 1;
        book.updated_at = at;
        Ok(loan.clone())
    }

    async fn get_loan(&self, id: Uuid) -> AppResult<LoanRecord> {
        let tables = self.tables.lock().await;
        tables
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<LoanRecord> = tables
            .loans
            .values()
            .rev()
            .filter(|loan| filter.accepts(loan))
            .cloned()
            .collect();
        // stable: insertion order breaks ties
        loans.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(loans)
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.book(reservation.book_id)?;
        let duplicate = tables.reservations.values().any(|existing| {
            existing.book_id == reservation.book_id
                && existing.requester_id == reservation.requester_id
                && existing.status == ReservationStatus::Pending
        });
        if duplicate {
            return Err(AppError::DuplicateReservation(format!(
                "{} already has a pending reservation for '{}'",
                reservation.requester_id, reservation.book_title
            )));
        }
        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn get_reservation(&self, id: Uuid) -> AppResult<Reservation> {
        let tables = self.tables.lock().await;
        tables
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn close_reservation(
        &self,
        id: Uuid,
        status: ReservationStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut tables = self.tables.lock().await;
        let reservation = tables
            .reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;
        reservation.close(status, at);
        Ok(reservation.clone())
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let tables = self.tables.lock().await;
        let mut reservations: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|reservation| filter.accepts(reservation))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(reservations)
    }

    async fn insert_issue_request(&self, request: &IssueRequest) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_issue_request(&self, id: Uuid) -> AppResult<IssueRequest> {
        let tables = self.tables.lock().await;
        tables
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Issue request with id {} not found", id)))
    }

    async fn list_issue_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<IssueRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .values()
            .filter(|request| status.map_or(true, |status| request.status == status))
            .cloned()
            .collect())
    }

    async fn approve_issue_request(
        &self,
        id: Uuid,
        loan: &LoanRecord,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .requests
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Issue request with id {} not found", id)))?;
        request.ensure_pending()?;

        tables.issue(loan)?;

        // issue() succeeded, so nothing below can fail after stock moved
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::invariant(format!("Issue request {} vanished", id)))?;
        request.book_id = Some(loan.book_id);
        request.requester = loan.borrower.clone();
        request.approve(processed_by, at, loan.id)?;
        Ok(request.clone())
    }

    async fn decline_issue_request(
        &self,
        id: Uuid,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Issue request with id {} not found", id)))?;
        request.decline(processed_by, at)?;
        Ok(request.clone())
    }
}
