//! Penalty model and the late-return policy

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::loan::Loan;

/// Penalty model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Penalty {
    pub id: i32,
    pub description: Option<String>,
    /// End of the sanction; NULL means indefinite
    pub ends_on: Option<NaiveDate>,
    pub user_id: i32,
    pub loan_id: Option<i32>,
}

impl Penalty {
    /// A penalty blocks new loans while its end date is null or still ahead.
    pub fn is_active(&self, on: NaiveDate) -> bool {
        self.ends_on.map_or(true, |end| end > on)
    }
}

/// Penalty row ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPenalty {
    pub description: String,
    pub ends_on: NaiveDate,
    pub user_id: i32,
    pub loan_id: Option<i32>,
}

impl NewPenalty {
    /// Build the sanction for a late return, if the return is late at all.
    ///
    /// The penalty runs for as many days past the return date as the return
    /// was past the due date. Loans without a due date never accrue one.
    pub fn late_return(loan: &Loan, returned_on: NaiveDate) -> Option<NewPenalty> {
        let due_on = loan.due_on?;
        let days_late = (returned_on - due_on).num_days();
        if days_late <= 0 {
            return None;
        }

        Some(NewPenalty {
            description: format!("Returned {} day(s) late", days_late),
            ends_on: returned_on + Duration::days(days_late),
            user_id: loan.user_id,
            loan_id: Some(loan.id),
        })
    }
}

/// Penalty with its activity flag for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PenaltyStatus {
    pub id: i32,
    pub description: Option<String>,
    pub ends_on: Option<NaiveDate>,
    pub loan_id: Option<i32>,
    pub active: bool,
}

impl PenaltyStatus {
    pub fn from_penalty(penalty: Penalty, on: NaiveDate) -> Self {
        let active = penalty.is_active(on);
        Self {
            id: penalty.id,
            description: penalty.description,
            ends_on: penalty.ends_on,
            loan_id: penalty.loan_id,
            active,
        }
    }
}
