//! Read-only report shapes returned by the stats and fine endpoints

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{book::CatalogTotals, loan::LoanRecord};

/// Amount owed on one loan at a given instant
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FineQuote {
    pub loan_id: Uuid,
    pub days_overdue: i64,
    pub amount: Decimal,
    pub currency: String,
    pub as_of: DateTime<Utc>,
}

/// Instant a fine or report is evaluated at
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AsOfQuery {
    /// Defaults to now
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueLoan {
    pub loan: LoanRecord,
    pub days_overdue: i64,
    pub fine: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OverdueQuery {
    /// Defaults to now
    pub as_of: Option<DateTime<Utc>>,
    pub class_name: Option<String>,
    pub section: Option<String>,
}

/// Reading record of one borrower
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerStats {
    pub roll: String,
    /// Loans already returned
    pub books_read: i64,
    pub current_loans: Vec<LoanRecord>,
    pub overdue_loans: i64,
    /// Fines on open loans plus fines frozen on late returns
    pub outstanding_fines: Decimal,
    pub currency: String,
}

/// Loans issued by one staff member or approver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActorStats {
    pub actor_id: String,
    pub loans_issued: i64,
    pub loans_open: i64,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibrarySummary {
    pub catalog: CatalogTotals,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub pending_reservations: i64,
    pub pending_requests: i64,
    pub outstanding_fines: Decimal,
    pub currency: String,
    pub generated_at: DateTime<Utc>,
}

/// Closed loan plus the fine frozen at its return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub loan: LoanRecord,
    pub fine: FineQuote,
}
