//! Data models for Librarium

pub mod actor;
pub mod book;
pub mod issue_request;
pub mod loan;
pub mod report;
pub mod reservation;

// Re-export commonly used types
pub use actor::{Actor, Role};
pub use book::{Book, BookPage, BookQuery, CreateBook, UpdateBook};
pub use issue_request::{IssueRequest, RequestStatus, SubmitIssueRequest};
pub use loan::{Borrower, IssueLoan, LoanFilter, LoanRecord, LoanStatus};
pub use report::{FineQuote, ReturnReceipt};
pub use reservation::{CreateReservation, Reservation, ReservationFilter, ReservationStatus};
