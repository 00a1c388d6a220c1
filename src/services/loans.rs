//! Circulation ledger: issuing and returning copies

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        actor::Actor,
        loan::{IssueLoan, LoanFilter, LoanRecord},
        report::{FineQuote, ReturnReceipt},
    },
    repository::Repository,
    services::fines::FinePolicy,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    circulation: CirculationConfig,
    fines: FinePolicy,
}

impl LoansService {
    pub fn new(repository: Repository, circulation: CirculationConfig) -> Self {
        let fines = FinePolicy::new(&circulation);
        Self {
            repository,
            circulation,
            fines,
        }
    }

    /// Resolve the due instant of a new loan.
    ///
    /// `None` means the configured default period. An explicit date must lie
    /// between `now` and `now + max_loan_days`.
    pub fn due_at(&self, requested: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let Some(due_at) = requested else {
            return Ok(now + Duration::days(self.circulation.default_loan_days));
        };
        if due_at < now {
            return Err(AppError::Validation(
                "Due date must not be in the past".to_string(),
            ));
        }
        if due_at > now + Duration::days(self.circulation.max_loan_days) {
            return Err(AppError::Validation(format!(
                "Loans cannot run longer than {} days",
                self.circulation.max_loan_days
            )));
        }
        Ok(due_at)
    }

    /// Issue one copy to a borrower
    pub async fn issue(&self, request: IssueLoan, actor: &Actor) -> AppResult<LoanRecord> {
        let borrower = request.borrower.trimmed();
        borrower.validate()?;
        let now = Utc::now();
        let due_at = self.due_at(request.due_at, now)?;

        let book = self.repository.get_book(request.book_id).await?;
        let loan = LoanRecord::new(&book, borrower, due_at, &actor.id, now);
        self.repository.issue(&loan).await?;

        tracing::info!(
            loan_id = %loan.id,
            book_id = %loan.book_id,
            borrower = %loan.borrower.roll,
            actor = %actor.id,
            due_at = %loan.due_at,
            "Book issued"
        );
        Ok(loan)
    }

    /// Close a loan and put the copy back. The fine is frozen at this instant.
    pub async fn return_loan(&self, id: Uuid, actor: &Actor) -> AppResult<ReturnReceipt> {
        let now = Utc::now();
        let loan = self.repository.return_loan(id, now).await?;
        let fine = self.fines.quote(&loan, now);

        tracing::info!(
            loan_id = %loan.id,
            book_id = %loan.book_id,
            actor = %actor.id,
            days_overdue = fine.days_overdue,
            "Book returned"
        );
        Ok(ReturnReceipt { loan, fine })
    }

    pub async fn get_loan(&self, id: Uuid) -> AppResult<LoanRecord> {
        self.repository.get_loan(id).await
    }

    pub async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        self.repository.list_loans(filter).await
    }

    pub async fn fine(&self, id: Uuid, as_of: Option<DateTime<Utc>>) -> AppResult<FineQuote> {
        let loan = self.repository.get_loan(id).await?;
        Ok(self.fines.quote(&loan, as_of.unwrap_or_else(Utc::now)))
    }
}
