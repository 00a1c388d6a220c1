//! Statistics service

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{
        issue_request::RequestStatus,
        loan::{LoanFilter, LoanStatus},
        report::{ActorStats, BorrowerStats, LibrarySummary, OverdueLoan, OverdueQuery},
        reservation::{ReservationFilter, ReservationStatus},
    },
    repository::Repository,
    services::fines::{days_overdue, FinePolicy},
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    fines: FinePolicy,
}

impl StatsService {
    pub fn new(repository: Repository, fines: FinePolicy) -> Self {
        Self { repository, fines }
    }

    /// Dashboard counters as of now
    pub async fn summary(&self) -> AppResult<LibrarySummary> {
        let now = Utc::now();
        let catalog = self.repository.catalog_totals().await?;
        let active = self.repository.list_loans(&LoanFilter::issued()).await?;
        let pending_reservations = self
            .repository
            .list_reservations(&ReservationFilter {
                status: Some(ReservationStatus::Pending),
                ..ReservationFilter::default()
            })
            .await?
            .len() as i64;
        let pending_requests = self
            .repository
            .list_issue_requests(Some(RequestStatus::Pending))
            .await?
            .len() as i64;

        let overdue_loans = active.iter().filter(|loan| loan.is_overdue(now)).count() as i64;
        let outstanding_fines = active
            .iter()
            .map(|loan| self.fines.compute_fine(loan, now))
            .sum();

        Ok(LibrarySummary {
            catalog,
            active_loans: active.len() as i64,
            overdue_loans,
            pending_reservations,
            pending_requests,
            outstanding_fines,
            currency: self.fines.currency.clone(),
            generated_at: now,
        })
    }

    /// Issued loans past due, most overdue first
    pub async fn overdue_loans(&self, query: &OverdueQuery) -> AppResult<Vec<OverdueLoan>> {
        let as_of = query.as_of.unwrap_or_else(Utc::now);
        let filter = LoanFilter {
            class_name: query.class_name.clone(),
            section: query.section.clone(),
            ..LoanFilter::issued()
        };
        let mut overdue: Vec<OverdueLoan> = self
            .repository
            .list_loans(&filter)
            .await?
            .into_iter()
            .filter(|loan| loan.is_overdue(as_of))
            .map(|loan| OverdueLoan {
                days_overdue: days_overdue(&loan, as_of),
                fine: self.fines.compute_fine(&loan, as_of),
                loan,
            })
            .collect();
        overdue.sort_by(|a, b| a.loan.due_at.cmp(&b.loan.due_at));
        Ok(overdue)
    }

    /// Reading record and dues of one borrower
    pub async fn borrower_stats(&self, roll: &str, as_of: Option<DateTime<Utc>>) -> AppResult<BorrowerStats> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let roll = roll.trim().to_string();
        let loans = self
            .repository
            .list_loans(&LoanFilter {
                borrower_roll: Some(roll.clone()),
                ..LoanFilter::default()
            })
            .await?;

        let books_read = loans
            .iter()
            .filter(|loan| loan.status == LoanStatus::Returned)
            .count() as i64;
        let overdue_loans = loans.iter().filter(|loan| loan.is_overdue(as_of)).count() as i64;
        let outstanding_fines: Decimal = loans
            .iter()
            .map(|loan| self.fines.compute_fine(loan, as_of))
            .sum();
        let current_loans = loans
            .into_iter()
            .filter(|loan| loan.status == LoanStatus::Issued)
            .collect();

        Ok(BorrowerStats {
            roll,
            books_read,
            current_loans,
            overdue_loans,
            outstanding_fines,
            currency: self.fines.currency.clone(),
        })
    }

    /// Loans per issuing actor, busiest first
    pub async fn actor_stats(&self) -> AppResult<Vec<ActorStats>> {
        let loans = self.repository.list_loans(&LoanFilter::default()).await?;
        let mut by_actor: BTreeMap<String, ActorStats> = BTreeMap::new();
        for loan in &loans {
            let entry = by_actor
                .entry(loan.issued_by.clone())
                .or_insert_with(|| ActorStats {
                    actor_id: loan.issued_by.clone(),
                    loans_issued: 0,
                    loans_open: 0,
                });
            entry.loans_issued += 1;
            if loan.status == LoanStatus::Issued {
                entry.loans_open += 1;
            }
        }
        let mut stats: Vec<ActorStats> = by_actor.into_values().collect();
        stats.sort_by(|a, b| b.loans_issued.cmp(&a.loans_issued));
        Ok(stats)
    }
}
