//! PostgreSQL store.
//!
//! Copy counts are never read-modified-written from Rust: the decrement and
//! increment are conditional `UPDATE`s inside the same transaction as the
//! loan write, so concurrent issues against the last copy serialize on the
//! book row and exactly one of them sees `available_copies > 0`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::LibraryStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CatalogTotals, UpdateBook},
        issue_request::{IssueRequest, IssueRequestRow, RequestStatus},
        loan::{LoanFilter, LoanRecord, LoanRow, LoanStatus},
        reservation::{Reservation, ReservationFilter, ReservationRow, ReservationStatus},
    },
};

const BOOK_COLUMNS: &str = "id, title, author, isbn, subject, category, shelf_row, shelf, \
     unit_price, total_copies, available_copies, added_by, added_at, updated_at";

const LOAN_COLUMNS: &str = "id, book_id, book_title, borrower_name, borrower_roll, class_name, \
     section, issued_at, due_at, status, returned_at, issued_by";

const RESERVATION_COLUMNS: &str =
    "id, book_id, book_title, requester_id, requester_name, requested_at, status, closed_at";

const REQUEST_COLUMNS: &str = "id, book_id, book_guess, requester_name, requester_roll, \
     class_name, section, status, requested_at, processed_at, processed_by, loan_id";

/// Escape LIKE metacharacters so user text is matched literally
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn book_exists(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND archived_at IS NULL)",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// Decrement + loan insert + hold fulfilment, on a caller-owned transaction
    async fn issue_in(conn: &mut PgConnection, loan: &LoanRecord) -> AppResult<()> {
        let decremented = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1, updated_at = $2
            WHERE id = $1 AND archived_at IS NULL AND available_copies > 0
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.issued_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if decremented == 0 {
            return Err(if Self::book_exists(&mut *conn, loan.book_id).await? {
                AppError::OutOfStock(format!("No copy of '{}' is available", loan.book_title))
            } else {
                AppError::NotFound(format!("Book with id {} not found", loan.book_id))
            });
        }

        sqlx::query(
            r#"
            INSERT INTO loans (id, book_id, book_title, borrower_name, borrower_roll,
                               class_name, section, issued_at, due_at, status, returned_at, issued_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, $11)
            "#,
        )
        .bind(loan.id)
        .bind(loan.book_id)
        .bind(&loan.book_title)
        .bind(&loan.borrower.name)
        .bind(&loan.borrower.roll)
        .bind(&loan.borrower.class_name)
        .bind(&loan.borrower.section)
        .bind(loan.issued_at)
        .bind(loan.due_at)
        .bind(LoanStatus::Issued.as_str())
        .bind(&loan.issued_by)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $3, closed_at = $4
            WHERE book_id = $1 AND requester_id = $2 AND status = $5
            "#,
        )
        .bind(loan.book_id)
        .bind(&loan.borrower.roll)
        .bind(ReservationStatus::Fulfilled.as_str())
        .bind(loan.issued_at)
        .bind(ReservationStatus::Pending.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_book(&self, book: &Book) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, subject, category, shelf_row, shelf,
                               unit_price, total_copies, available_copies, added_by, added_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.subject)
        .bind(&book.category)
        .bind(&book.shelf_row)
        .bind(&book.shelf)
        .bind(book.unit_price)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.added_by)
        .bind(book.added_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        let sql = format!(
            "SELECT {} FROM books WHERE id = $1 AND archived_at IS NULL",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn update_book(&self, id: Uuid, update: UpdateBook, at: DateTime<Utc>) -> AppResult<Book> {
        let mut book = self.get_book(id).await?;
        book.apply_update(update, at);

        // copy counts are not part of the SET list
        let sql = format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, subject = $5, category = $6,
                shelf_row = $7, shelf = $8, unit_price = $9, updated_at = $10
            WHERE id = $1 AND archived_at IS NULL
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(&book.subject)
            .bind(&book.category)
            .bind(&book.shelf_row)
            .bind(&book.shelf)
            .bind(book.unit_price)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32, at: DateTime<Utc>) -> AppResult<Book> {
        let sql = format!(
            r#"
            UPDATE books
            SET total_copies = total_copies + $2,
                available_copies = available_copies + $2,
                updated_at = $3
            WHERE id = $1 AND archived_at IS NULL AND available_copies + $2 >= 0
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let updated = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .bind(delta)
            .bind(at)
            .fetch_optional(&self.pool)
            .await;

        match updated {
            Ok(Some(book)) => Ok(book),
            // numeric_value_out_of_range
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("22003") => {
                Err(AppError::Validation(format!(
                    "Adjusting book {} by {} exceeds the supported copy count",
                    id, delta
                )))
            }
            Err(e) => Err(e.into()),
            Ok(None) => {
                // classify the refusal against the current row
                let book = self.get_book(id).await?;
                book.stock_after(delta)?;
                Err(AppError::Conflict(format!(
                    "Stock of book {} changed concurrently, retry",
                    id
                )))
            }
        }
    }

    async fn delete_book(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM books WHERE id = $1 AND archived_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if book.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let outstanding: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = $2")
                .bind(id)
                .bind(LoanStatus::Issued.as_str())
                .fetch_one(&mut *tx)
                .await?;
        if outstanding > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copies on loan",
                id, outstanding
            )));
        }

        sqlx::query(
            "UPDATE reservations SET status = $2, closed_at = $3 WHERE book_id = $1 AND status = $4",
        )
        .bind(id)
        .bind(ReservationStatus::Cancelled.as_str())
        .bind(at)
        .bind(ReservationStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET archived_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let needle = query.needle();
        let pattern = like_pattern(&needle);
        let conditions = r#"
            archived_at IS NULL
            AND ($1 = '' OR title ILIKE $2 OR author ILIKE $2 OR subject ILIKE $2 OR isbn ILIKE $2)
            AND ($3::text IS NULL OR category = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM books WHERE {}",
            conditions
        ))
        .bind(&needle)
        .bind(&pattern)
        .bind(&query.category)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM books WHERE {} ORDER BY added_at DESC, seq DESC LIMIT $4 OFFSET $5",
            BOOK_COLUMNS, conditions
        );
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(&needle)
            .bind(&pattern)
            .bind(&query.category)
            .bind(query.per_page())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    async fn catalog_totals(&self) -> AppResult<CatalogTotals> {
        let totals = sqlx::query_as::<_, CatalogTotals>(
            r#"
            SELECT COUNT(*) AS titles,
                   COALESCE(SUM(total_copies), 0)::BIGINT AS total_copies,
                   COALESCE(SUM(available_copies), 0)::BIGINT AS available_copies
            FROM books
            WHERE archived_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn issue(&self, loan: &LoanRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::issue_in(&mut *tx, loan).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn return_loan(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE loans SET status = $3, returned_at = $2 WHERE id = $1 AND status = $4 RETURNING {}",
            LOAN_COLUMNS
        );
        let closed = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(id)
            .bind(at)
            .bind(LoanStatus::Returned.as_str())
            .bind(LoanStatus::Issued.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let loan: LoanRecord = match closed {
            Some(row) => row.try_into()?,
            None => {
                tx.rollback().await?;
                let mut loan = self.get_loan(id).await?;
                // surfaces AlreadyReturned for a closed loan
                loan.mark_returned(at)?;
                return Err(AppError::Conflict(format!(
                    "Loan {} changed concurrently, retry",
                    id
                )));
            }
        };

        let incremented = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies + 1, updated_at = $2
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(loan.book_id)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if incremented == 0 {
            tx.rollback().await?;
            return Err(AppError::invariant(format!(
                "Returning loan {} would raise book {} above its total copies",
                id, loan.book_id
            )));
        }

        tx.commit().await?;
        Ok(loan)
    }

    async fn get_loan(&self, id: Uuid) -> AppResult<LoanRecord> {
        let sql = format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS);
        sqlx::query_as::<_, LoanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?
            .try_into()
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM loans
            WHERE ($1::uuid IS NULL OR book_id = $1)
              AND ($2::text IS NULL OR borrower_roll = $2)
              AND ($3::text IS NULL OR class_name = $3)
              AND ($4::text IS NULL OR section = $4)
              AND ($5::text IS NULL OR status = $5)
            ORDER BY issued_at DESC, seq DESC
            "#,
            LOAN_COLUMNS
        );
        sqlx::query_as::<_, LoanRow>(&sql)
            .bind(filter.book_id)
            .bind(&filter.borrower_roll)
            .bind(&filter.class_name)
            .bind(&filter.section)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LoanRecord::try_from)
            .collect()
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (id, book_id, book_title, requester_id, requester_name,
                                      requested_at, status, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.book_id)
        .bind(&reservation.book_title)
        .bind(&reservation.requester_id)
        .bind(&reservation.requester_name)
        .bind(reservation.requested_at)
        .bind(ReservationStatus::Pending.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateReservation(format!(
                    "{} already has a pending reservation for '{}'",
                    reservation.requester_id, reservation.book_title
                )))
            }
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(
                AppError::NotFound(format!("Book with id {} not found", reservation.book_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_reservation(&self, id: Uuid) -> AppResult<Reservation> {
        let sql = format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS);
        sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?
            .try_into()
    }

    async fn close_reservation(
        &self,
        id: Uuid,
        status: ReservationStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let sql = format!(
            "UPDATE reservations SET status = $2, closed_at = $3 WHERE id = $1 AND status = $4 RETURNING {}",
            RESERVATION_COLUMNS
        );
        let closed = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(at)
            .bind(ReservationStatus::Pending.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match closed {
            Some(row) => row.try_into(),
            // already closed (or missing): idempotent read-back
            None => self.get_reservation(id).await,
        }
    }

    async fn list_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE ($1::uuid IS NULL OR book_id = $1)
              AND ($2::text IS NULL OR requester_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY requested_at, seq
            "#,
            RESERVATION_COLUMNS
        );
        sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(filter.book_id)
            .bind(&filter.requester_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    async fn insert_issue_request(&self, request: &IssueRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO issue_requests (id, book_id, book_guess, requester_name, requester_roll,
                                        class_name, section, status, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id)
        .bind(request.book_id)
        .bind(&request.book_guess)
        .bind(&request.requester.name)
        .bind(&request.requester.roll)
        .bind(&request.requester.class_name)
        .bind(&request.requester.section)
        .bind(request.status.as_str())
        .bind(request.requested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_issue_request(&self, id: Uuid) -> AppResult<IssueRequest> {
        let sql = format!("SELECT {} FROM issue_requests WHERE id = $1", REQUEST_COLUMNS);
        sqlx::query_as::<_, IssueRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue request with id {} not found", id)))?
            .try_into()
    }

    async fn list_issue_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<IssueRequest>> {
        let sql = format!(
            "SELECT {} FROM issue_requests WHERE ($1::text IS NULL OR status = $1) ORDER BY requested_at, seq",
            REQUEST_COLUMNS
        );
        sqlx::query_as::<_, IssueRequestRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(IssueRequest::try_from)
            .collect()
    }

    async fn approve_issue_request(
        &self,
        id: Uuid,
        loan: &LoanRecord,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest> {
        let mut tx = self.pool.begin().await?;

        // lock the request so two approvals cannot both issue
        let sql = format!(
            "SELECT {} FROM issue_requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        );
        let mut request: IssueRequest = sqlx::query_as::<_, IssueRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue request with id {} not found", id)))?
            .try_into()?;
        request.ensure_pending()?;

        // dropping `tx` on error rolls back and leaves the request pending
        Self::issue_in(&mut *tx, loan).await?;

        request.book_id = Some(loan.book_id);
        request.requester = loan.borrower.clone();
        request.approve(processed_by, at, loan.id)?;

        sqlx::query(
            r#"
            UPDATE issue_requests
            SET status = $2, processed_at = $3, processed_by = $4, loan_id = $5, book_id = $6,
                requester_name = $7, requester_roll = $8, class_name = $9, section = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(request.status.as_str())
        .bind(at)
        .bind(processed_by)
        .bind(loan.id)
        .bind(loan.book_id)
        .bind(&loan.borrower.name)
        .bind(&loan.borrower.roll)
        .bind(&loan.borrower.class_name)
        .bind(&loan.borrower.section)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn decline_issue_request(
        &self,
        id: Uuid,
        processed_by: &str,
        at: DateTime<Utc>,
    ) -> AppResult<IssueRequest> {
        let sql = format!(
            r#"
            UPDATE issue_requests
            SET status = $2, processed_at = $3, processed_by = $4
            WHERE id = $1 AND status = $5
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        let declined = sqlx::query_as::<_, IssueRequestRow>(&sql)
            .bind(id)
            .bind(RequestStatus::Declined.as_str())
            .bind(at)
            .bind(processed_by)
            .bind(RequestStatus::Pending.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match declined {
            Some(row) => row.try_into(),
            None => {
                let mut request = self.get_issue_request(id).await?;
                // surfaces InvalidState for a processed request
                request.decline(processed_by, at)?;
                Err(AppError::Conflict(format!(
                    "Issue request {} changed concurrently, retry",
                    id
                )))
            }
        }
    }
}
