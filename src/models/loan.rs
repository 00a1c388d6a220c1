//! Loan (issue) record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::book::Book;
use crate::error::{AppError, AppResult};

/// Loan lifecycle: a loan is issued once and returned at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Issued,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Issued => "issued",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(LoanStatus::Issued),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(AppError::Internal(format!("Unknown loan status '{}'", other))),
        }
    }
}

/// Who holds the copy, with the class context teachers filter by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Borrower {
    #[validate(length(min = 1, message = "Borrower name is required"))]
    pub name: String,
    /// Roll number or external student/staff ID
    #[validate(length(min = 1, message = "Borrower roll/ID is required"))]
    pub roll: String,
    pub class_name: Option<String>,
    pub section: Option<String>,
}

impl Borrower {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            roll: self.roll.trim().to_string(),
            class_name: self.class_name,
            section: self.section,
        }
    }
}

/// One physical copy in the hands of a borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    /// Title at issue time
    pub book_title: String,
    pub borrower: Borrower,
    pub issued_at: DateTime<Utc>,
    /// Expected return instant
    pub due_at: DateTime<Utc>,
    pub status: LoanStatus,
    pub returned_at: Option<DateTime<Utc>>,
    pub issued_by: String,
}

impl LoanRecord {
    pub fn new(
        book: &Book,
        borrower: Borrower,
        due_at: DateTime<Utc>,
        issued_by: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: book.id,
            book_title: book.title.clone(),
            borrower,
            issued_at,
            due_at,
            status: LoanStatus::Issued,
            returned_at: None,
            issued_by: issued_by.to_string(),
        }
    }

    /// Issued -> Returned. A second return is rejected so stock is never
    /// incremented twice.
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        match self.status {
            LoanStatus::Issued => {
                self.status = LoanStatus::Returned;
                self.returned_at = Some(at);
                Ok(())
            }
            LoanStatus::Returned => Err(AppError::AlreadyReturned(format!(
                "Loan {} was already returned",
                self.id
            ))),
        }
    }

    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Issued && self.due_at < as_of
    }
}

/// Flat loan row as stored in the `loans` table
#[derive(Debug, FromRow)]
pub struct LoanRow {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub borrower_name: String,
    pub borrower_roll: String,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub returned_at: Option<DateTime<Utc>>,
    pub issued_by: String,
}

impl TryFrom<LoanRow> for LoanRecord {
    type Error = AppError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            book_title: row.book_title,
            borrower: Borrower {
                name: row.borrower_name,
                roll: row.borrower_roll,
                class_name: row.class_name,
                section: row.section,
            },
            issued_at: row.issued_at,
            due_at: row.due_at,
            status: row.status.parse()?,
            returned_at: row.returned_at,
            issued_by: row.issued_by,
        })
    }
}

/// Issue request body
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IssueLoan {
    pub book_id: Uuid,
    #[validate(nested)]
    pub borrower: Borrower,
    /// Defaults to the configured loan period
    pub due_at: Option<DateTime<Utc>>,
}

/// Loan listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanFilter {
    pub book_id: Option<Uuid>,
    pub borrower_roll: Option<String>,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub status: Option<LoanStatus>,
}

impl LoanFilter {
    pub fn issued() -> Self {
        Self {
            status: Some(LoanStatus::Issued),
            ..Self::default()
        }
    }

    pub fn accepts(&self, loan: &LoanRecord) -> bool {
        self.book_id.map_or(true, |id| loan.book_id == id)
            && self
                .borrower_roll
                .as_deref()
                .map_or(true, |roll| loan.borrower.roll == roll)
            && self
                .class_name
                .as_deref()
                .map_or(true, |class| loan.borrower.class_name.as_deref() == Some(class))
            && self
                .section
                .as_deref()
                .map_or(true, |section| loan.borrower.section.as_deref() == Some(section))
            && self.status.map_or(true, |status| loan.status == status)
    }
}
