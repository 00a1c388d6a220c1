//! Overdue fine computation.
//!
//! Pure functions of a loan and an instant: nothing here reads the clock or
//! touches storage.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    config::CirculationConfig,
    models::{
        loan::{LoanRecord, LoanStatus},
        report::FineQuote,
    },
};

/// Whole days late, rounding any started day up. Zero when not late.
///
/// An issued loan is measured against `as_of`; a returned loan against its
/// return instant, so its fine is frozen once it comes back.
pub fn days_overdue(loan: &LoanRecord, as_of: DateTime<Utc>) -> i64 {
    let end = match (loan.status, loan.returned_at) {
        (LoanStatus::Returned, Some(returned_at)) => returned_at,
        (LoanStatus::Returned, None) => return 0,
        (LoanStatus::Issued, _) => as_of,
    };
    let late = end - loan.due_at;
    if late <= Duration::zero() {
        return 0;
    }
    let whole = late.num_days();
    if late > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

#[derive(Debug, Clone)]
pub struct FinePolicy {
    pub fine_per_day: Decimal,
    pub currency: String,
}

impl FinePolicy {
    pub fn new(config: &CirculationConfig) -> Self {
        Self {
            fine_per_day: config.fine_per_day,
            currency: config.currency.clone(),
        }
    }

    pub fn compute_fine(&self, loan: &LoanRecord, as_of: DateTime<Utc>) -> Decimal {
        Decimal::from(days_overdue(loan, as_of)) * self.fine_per_day
    }

    pub fn quote(&self, loan: &LoanRecord, as_of: DateTime<Utc>) -> FineQuote {
        FineQuote {
            loan_id: loan.id,
            days_overdue: days_overdue(loan, as_of),
            amount: self.compute_fine(loan, as_of),
            currency: self.currency.clone(),
            as_of,
        }
    }
}
