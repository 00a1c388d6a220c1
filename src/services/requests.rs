//! Self-service intake: untrusted issue requests awaiting staff review

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        actor::Actor,
        issue_request::{ApproveIssueRequest, IssueRequest, RequestStatus, SubmitIssueRequest},
        loan::LoanRecord,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
    default_loan_days: i64,
}

impl RequestsService {
    pub fn new(repository: Repository, circulation: &CirculationConfig) -> Self {
        Self {
            repository,
            default_loan_days: circulation.default_loan_days,
        }
    }

    /// Record a pending request. Book and requester are stored as given.
    pub async fn submit(&self, mut submit: SubmitIssueRequest) -> AppResult<IssueRequest> {
        submit.book_guess = submit.book_guess.trim().to_string();
        submit.requester = submit.requester.trimmed();
        if submit.book_id.is_none() && submit.book_guess.is_empty() {
            return Err(AppError::Validation(
                "Either a book id or a book description is required".to_string(),
            ));
        }

        let request = IssueRequest::new(submit, Utc::now());
        self.repository.insert_issue_request(&request).await?;
        tracing::info!(
            request_id = %request.id,
            book_id = ?request.book_id,
            requester = %request.requester.roll,
            "Issue request submitted"
        );
        Ok(request)
    }

    /// Confirm a request and issue the book in the same transaction.
    ///
    /// On `OutOfStock` (or any other failure) the request stays pending.
    pub async fn approve(
        &self,
        id: Uuid,
        corrections: ApproveIssueRequest,
        staff: &Actor,
    ) -> AppResult<IssueRequest> {
        corrections.validate()?;
        let request = self.repository.get_issue_request(id).await?;
        request.ensure_pending()?;

        let book_id = corrections.book_id.or(request.book_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Issue request {} has no matched book; confirm one before approving",
                id
            ))
        })?;
        let requester = corrections.requester.unwrap_or(request.requester).trimmed();
        requester.validate()?;

        let now = Utc::now();
        let book = self.repository.get_book(book_id).await?;
        let loan = LoanRecord::new(
            &book,
            requester,
            now + Duration::days(self.default_loan_days),
            &staff.id,
            now,
        );
        let approved = self
            .repository
            .approve_issue_request(id, &loan, &staff.id, now)
            .await?;

        tracing::info!(
            request_id = %id,
            loan_id = %loan.id,
            book_id = %book_id,
            actor = %staff.id,
            "Issue request approved"
        );
        Ok(approved)
    }

    pub async fn decline(&self, id: Uuid, staff: &Actor) -> AppResult<IssueRequest> {
        let declined = self
            .repository
            .decline_issue_request(id, &staff.id, Utc::now())
            .await?;
        tracing::info!(request_id = %id, actor = %staff.id, "Issue request declined");
        Ok(declined)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<IssueRequest> {
        self.repository.get_issue_request(id).await
    }

    /// Oldest first
    pub async fn list(&self, status: Option<RequestStatus>) -> AppResult<Vec<IssueRequest>> {
        self.repository.list_issue_requests(status).await
    }
}
