//! Self-service issue requests awaiting staff confirmation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::loan::Borrower;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
        }
    }

    /// Pending -> {Approved, Declined}; every other move is rejected.
    pub fn transition(self, to: RequestStatus) -> AppResult<RequestStatus> {
        match (self, to) {
            (RequestStatus::Pending, RequestStatus::Approved | RequestStatus::Declined) => Ok(to),
            (from, to) => Err(AppError::InvalidState(format!(
                "Issue request cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "declined" => Ok(RequestStatus::Declined),
            other => Err(AppError::Internal(format!(
                "Unknown issue request status '{}'",
                other
            ))),
        }
    }
}

/// A tentative issue proposed by an untrusted actor (scan flow, kiosk).
///
/// `book_id` and `requester` are best-effort guesses until a staff member
/// approves the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueRequest {
    pub id: Uuid,
    pub book_id: Option<Uuid>,
    /// Raw text the book match was derived from
    pub book_guess: String,
    pub requester: Borrower,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    /// Loan created on approval
    pub loan_id: Option<Uuid>,
}

impl IssueRequest {
    pub fn new(submit: SubmitIssueRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: submit.book_id,
            book_guess: submit.book_guess,
            requester: submit.requester,
            status: RequestStatus::Pending,
            requested_at: now,
            processed_at: None,
            processed_by: None,
            loan_id: None,
        }
    }

    pub fn approve(&mut self, by: &str, at: DateTime<Utc>, loan_id: Uuid) -> AppResult<()> {
        self.status = self.status.transition(RequestStatus::Approved)?;
        self.processed_at = Some(at);
        self.processed_by = Some(by.to_string());
        self.loan_id = Some(loan_id);
        Ok(())
    }

    pub fn decline(&mut self, by: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.status = self.status.transition(RequestStatus::Declined)?;
        self.processed_at = Some(at);
        self.processed_by = Some(by.to_string());
        Ok(())
    }

    /// Fail with `InvalidState` unless the request is still pending
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Issue request {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
pub struct IssueRequestRow {
    pub id: Uuid,
    pub book_id: Option<Uuid>,
    pub book_guess: String,
    pub requester_name: String,
    pub requester_roll: String,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    pub loan_id: Option<Uuid>,
}

impl TryFrom<IssueRequestRow> for IssueRequest {
    type Error = AppError;

    fn try_from(row: IssueRequestRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            book_id: row.book_id,
            book_guess: row.book_guess,
            requester: Borrower {
                name: row.requester_name,
                roll: row.requester_roll,
                class_name: row.class_name,
                section: row.section,
            },
            status: row.status.parse()?,
            requested_at: row.requested_at,
            processed_at: row.processed_at,
            processed_by: row.processed_by,
            loan_id: row.loan_id,
        })
    }
}

/// Submission from the intake path. Nothing here is trusted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitIssueRequest {
    pub book_id: Option<Uuid>,
    #[serde(default)]
    pub book_guess: String,
    pub requester: Borrower,
}

/// Staff corrections applied before the request is issued
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApproveIssueRequest {
    /// Confirmed book, replacing the guessed match
    pub book_id: Option<Uuid>,
    /// Confirmed borrower, replacing the extracted one
    #[validate(nested)]
    pub requester: Option<Borrower>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct IssueRequestQuery {
    pub status: Option<RequestStatus>,
}
