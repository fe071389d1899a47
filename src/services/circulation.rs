//! Circulation service: loan lifecycle and penalty settlement

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, Loan, LoanReport, LoanSummary, NewLoan},
        penalty::{NewPenalty, PenaltyStatus},
    },
    repository::CirculationStore,
};

#[derive(Clone)]
pub struct CirculationService {
    store: Arc<dyn CirculationStore>,
    default_loan_days: i64,
}

impl CirculationService {
    pub fn new(store: Arc<dyn CirculationStore>, loans: &LoansConfig) -> Self {
        Self {
            store,
            default_loan_days: loans.default_duration_days,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Check whether a stock copy can be borrowed right now.
    ///
    /// A copy with no matching row would satisfy the no-open-loan query
    /// vacuously, so existence is checked first and reported as its own
    /// failure.
    pub async fn is_available(&self, stock_copy_id: i32) -> AppResult<bool> {
        if self.store.stock_copy(stock_copy_id).await?.is_none() {
            return Err(AppError::ReferenceNotFound {
                entity: "stock copy",
                id: stock_copy_id,
            });
        }

        Ok(!self.store.has_open_loan(stock_copy_id).await?)
    }

    /// Check whether a user is blocked from borrowing by an active penalty
    pub async fn has_active_penalty(&self, user_id: i32) -> AppResult<bool> {
        if !self.store.user_exists(user_id).await? {
            return Err(AppError::ReferenceNotFound {
                entity: "user",
                id: user_id,
            });
        }

        self.store.has_active_penalty(user_id, Self::today()).await
    }

    /// Create a new loan (borrow an item).
    ///
    /// Preconditions, first failure wins: the user exists, the copy exists,
    /// the copy has no open loan, the user has no active penalty. The loan
    /// date defaults to today and the due date to the loan date plus the
    /// configured duration.
    pub async fn create_loan(&self, request: CreateLoan) -> AppResult<Loan> {
        let loaned_on = request.loaned_on.unwrap_or_else(Self::today);
        let due_on = request
            .due_on
            .unwrap_or(loaned_on + Duration::days(self.default_loan_days));

        if due_on < loaned_on {
            return Err(AppError::Validation(
                "due date cannot be before the loan date".to_string(),
            ));
        }

        if !self.store.user_exists(request.user_id).await? {
            return Err(AppError::ReferenceNotFound {
                entity: "user",
                id: request.user_id,
            });
        }

        if self.store.stock_copy(request.stock_copy_id).await?.is_none() {
            return Err(AppError::ReferenceNotFound {
                entity: "stock copy",
                id: request.stock_copy_id,
            });
        }

        if self.store.has_open_loan(request.stock_copy_id).await? {
            return Err(AppError::Conflict("item already on loan".to_string()));
        }

        if self
            .store
            .has_active_penalty(request.user_id, Self::today())
            .await?
        {
            return Err(AppError::Forbidden(
                "user has active penalty".to_string(),
            ));
        }

        // A racing create for the same copy can pass the availability check
        // above; the store's open-loan uniqueness constraint turns the losing
        // insert into a Conflict.
        self.store
            .insert_loan(NewLoan {
                loaned_on,
                due_on: Some(due_on),
                stock_copy_id: request.stock_copy_id,
                user_id: request.user_id,
            })
            .await
    }

    /// Return a borrowed item, sanctioning a late return.
    ///
    /// The return date defaults to today. A return after the due date inserts
    /// one penalty lasting as many days as the return was late; the store
    /// persists the return date and the penalty in one transaction.
    pub async fn return_item(
        &self,
        loan_id: i32,
        returned_on: Option<NaiveDate>,
    ) -> AppResult<Loan> {
        let returned_on = returned_on.unwrap_or_else(Self::today);

        let mut loan = self
            .store
            .loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.returned_on.is_some() {
            return Err(AppError::Conflict("loan already returned".to_string()));
        }

        if returned_on < loan.loaned_on {
            return Err(AppError::Validation(
                "return date cannot be before the loan date".to_string(),
            ));
        }

        let penalty = NewPenalty::late_return(&loan, returned_on);
        self.store.record_return(loan_id, returned_on, penalty).await?;

        loan.returned_on = Some(returned_on);
        Ok(loan)
    }

    /// Get a loan by ID
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.store
            .loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Get all open loans
    pub async fn open_loans(&self) -> AppResult<Vec<LoanSummary>> {
        self.store.open_loans(Self::today()).await
    }

    /// Get open loans past their due date
    pub async fn overdue_loans(&self) -> AppResult<Vec<LoanSummary>> {
        self.store.overdue_loans(Self::today()).await
    }

    /// Get open loans for a user
    pub async fn user_loans(&self, user_id: i32) -> AppResult<Vec<LoanSummary>> {
        if !self.store.user_exists(user_id).await? {
            return Err(AppError::ReferenceNotFound {
                entity: "user",
                id: user_id,
            });
        }

        self.store.user_loans(user_id, Self::today()).await
    }

    /// Get a user's penalties, flagged active or expired
    pub async fn user_penalties(&self, user_id: i32) -> AppResult<Vec<PenaltyStatus>> {
        if !self.store.user_exists(user_id).await? {
            return Err(AppError::ReferenceNotFound {
                entity: "user",
                id: user_id,
            });
        }

        let today = Self::today();
        let penalties = self.store.user_penalties(user_id).await?;

        Ok(penalties
            .into_iter()
            .map(|p| PenaltyStatus::from_penalty(p, today))
            .collect())
    }

    /// Aggregate loan counts
    pub async fn report(&self) -> AppResult<LoanReport> {
        self.store.loan_report(Self::today()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Penalty, StockCopy};
    use crate::repository::MockCirculationStore;
    use mockall::predicate::{always, eq};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(store: MockCirculationStore) -> CirculationService {
        CirculationService::new(Arc::new(store), &LoansConfig::default())
    }

    fn copy(id: i32) -> StockCopy {
        StockCopy {
            id,
            condition: Some("good".to_string()),
            title_id: 1,
            library_id: 1,
        }
    }

    fn open_loan(id: i32, user_id: i32, stock_copy_id: i32, due_on: NaiveDate) -> Loan {
        Loan {
            id,
            loaned_on: date(2024, 1, 1),
            due_on: Some(due_on),
            returned_on: None,
            stock_copy_id,
            user_id,
        }
    }

    fn expect_happy_checks(store: &mut MockCirculationStore, user_id: i32, copy_id: i32) {
        store
            .expect_user_exists()
            .with(eq(user_id))
            .returning(|_| Ok(true));
        store
            .expect_stock_copy()
            .with(eq(copy_id))
            .returning(|id| Ok(Some(copy(id))));
        store
            .expect_has_open_loan()
            .with(eq(copy_id))
            .returning(|_| Ok(false));
        store
            .expect_has_active_penalty()
            .with(eq(user_id), always())
            .returning(|_, _| Ok(false));
    }

    // Scenario A: no due date supplied resolves to loan date + 14 days.
    #[tokio::test]
    async fn create_loan_applies_default_due_date() {
        let mut store = MockCirculationStore::new();
        expect_happy_checks(&mut store, 1, 10);
        store
            .expect_insert_loan()
            .with(eq(NewLoan {
                loaned_on: date(2024, 1, 1),
                due_on: Some(date(2024, 1, 15)),
                stock_copy_id: 10,
                user_id: 1,
            }))
            .returning(|new| {
                Ok(Loan {
                    id: 1,
                    loaned_on: new.loaned_on,
                    due_on: new.due_on,
                    returned_on: None,
                    stock_copy_id: new.stock_copy_id,
                    user_id: new.user_id,
                })
            });

        let loan = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 10,
                loaned_on: Some(date(2024, 1, 1)),
                due_on: None,
            })
            .await
            .unwrap();

        assert_eq!(loan.due_on, Some(date(2024, 1, 15)));
        assert_eq!(loan.returned_on, None);
    }

    #[tokio::test]
    async fn create_loan_keeps_explicit_due_date() {
        let mut store = MockCirculationStore::new();
        expect_happy_checks(&mut store, 1, 10);
        store
            .expect_insert_loan()
            .withf(|new| new.due_on == Some(date(2024, 1, 5)))
            .returning(|new| {
                Ok(Loan {
                    id: 2,
                    loaned_on: new.loaned_on,
                    due_on: new.due_on,
                    returned_on: None,
                    stock_copy_id: new.stock_copy_id,
                    user_id: new.user_id,
                })
            });

        let loan = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 10,
                loaned_on: Some(date(2024, 1, 1)),
                due_on: Some(date(2024, 1, 5)),
            })
            .await
            .unwrap();

        assert_eq!(loan.due_on, Some(date(2024, 1, 5)));
    }

    #[tokio::test]
    async fn create_loan_rejects_due_date_before_loan_date() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().never();
        store.expect_insert_loan().never();

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 10,
                loaned_on: Some(date(2024, 1, 10)),
                due_on: Some(date(2024, 1, 5)),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_for_unknown_user() {
        let mut store = MockCirculationStore::new();
        store
            .expect_user_exists()
            .with(eq(99))
            .returning(|_| Ok(false));
        // First failure wins: the copy is never consulted.
        store.expect_stock_copy().never();
        store.expect_insert_loan().never();

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 99,
                stock_copy_id: 10,
                loaned_on: None,
                due_on: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::ReferenceNotFound { entity: "user", id: 99 }
        ));
    }

    #[tokio::test]
    async fn create_loan_fails_for_unknown_stock_copy() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().returning(|_| Ok(true));
        store.expect_stock_copy().with(eq(77)).returning(|_| Ok(None));
        store.expect_has_open_loan().never();
        store.expect_insert_loan().never();

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 77,
                loaned_on: None,
                due_on: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::ReferenceNotFound {
                entity: "stock copy",
                id: 77
            }
        ));
    }

    // Scenario B / P3: a copy with an open loan conflicts, and the
    // availability check wins over eligibility.
    #[tokio::test]
    async fn create_loan_conflicts_when_copy_is_on_loan() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().returning(|_| Ok(true));
        store.expect_stock_copy().returning(|id| Ok(Some(copy(id))));
        store.expect_has_open_loan().with(eq(10)).returning(|_| Ok(true));
        store.expect_has_active_penalty().never();
        store.expect_insert_loan().never();

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 2,
                stock_copy_id: 10,
                loaned_on: None,
                due_on: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "item already on loan"));
    }

    // Scenario D / P2: an active penalty blocks the loan, nothing is inserted.
    #[tokio::test]
    async fn create_loan_forbidden_for_penalized_user() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().returning(|_| Ok(true));
        store.expect_stock_copy().returning(|id| Ok(Some(copy(id))));
        store.expect_has_open_loan().returning(|_| Ok(false));
        store
            .expect_has_active_penalty()
            .with(eq(1), always())
            .returning(|_, _| Ok(true));
        store.expect_insert_loan().never();

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 11,
                loaned_on: None,
                due_on: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    // P1: the losing side of a create race gets the store's constraint
    // violation back as a Conflict.
    #[tokio::test]
    async fn create_loan_propagates_store_conflict_on_race() {
        let mut store = MockCirculationStore::new();
        expect_happy_checks(&mut store, 1, 10);
        store
            .expect_insert_loan()
            .returning(|_| Err(AppError::Conflict("item already on loan".to_string())));

        let err = service(store)
            .create_loan(CreateLoan {
                user_id: 1,
                stock_copy_id: 10,
                loaned_on: None,
                due_on: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    // Scenario C / P5: five days late means one penalty ending five days
    // after the return.
    #[tokio::test]
    async fn late_return_records_proportional_penalty() {
        let mut store = MockCirculationStore::new();
        store
            .expect_loan()
            .with(eq(7))
            .returning(|_| Ok(Some(open_loan(7, 1, 10, date(2024, 1, 15)))));
        store
            .expect_record_return()
            .with(
                eq(7),
                eq(date(2024, 1, 20)),
                eq(Some(NewPenalty {
                    description: "Returned 5 day(s) late".to_string(),
                    ends_on: date(2024, 1, 25),
                    user_id: 1,
                    loan_id: Some(7),
                })),
            )
            .returning(|_, _, _| Ok(()));

        let loan = service(store)
            .return_item(7, Some(date(2024, 1, 20)))
            .await
            .unwrap();

        assert_eq!(loan.returned_on, Some(date(2024, 1, 20)));
    }

    #[tokio::test]
    async fn on_time_return_records_no_penalty() {
        let mut store = MockCirculationStore::new();
        store
            .expect_loan()
            .returning(|_| Ok(Some(open_loan(7, 1, 10, date(2024, 1, 15)))));
        store
            .expect_record_return()
            .with(eq(7), eq(date(2024, 1, 15)), eq(None))
            .returning(|_, _, _| Ok(()));

        let loan = service(store)
            .return_item(7, Some(date(2024, 1, 15)))
            .await
            .unwrap();

        assert_eq!(loan.returned_on, Some(date(2024, 1, 15)));
    }

    // Scenario E / P4: a second return conflicts and writes nothing.
    #[tokio::test]
    async fn double_return_is_rejected() {
        let mut store = MockCirculationStore::new();
        store.expect_loan().returning(|_| {
            let mut loan = open_loan(7, 1, 10, date(2024, 1, 15));
            loan.returned_on = Some(date(2024, 1, 20));
            Ok(Some(loan))
        });
        store.expect_record_return().never();

        let err = service(store)
            .return_item(7, Some(date(2024, 1, 21)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "loan already returned"));
    }

    #[tokio::test]
    async fn return_fails_for_unknown_loan() {
        let mut store = MockCirculationStore::new();
        store.expect_loan().with(eq(404)).returning(|_| Ok(None));
        store.expect_record_return().never();

        let err = service(store).return_item(404, None).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn return_rejects_date_before_loan_date() {
        let mut store = MockCirculationStore::new();
        store
            .expect_loan()
            .returning(|_| Ok(Some(open_loan(7, 1, 10, date(2024, 1, 15)))));
        store.expect_record_return().never();

        let err = service(store)
            .return_item(7, Some(date(2023, 12, 31)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn availability_reflects_open_loans() {
        let mut store = MockCirculationStore::new();
        store.expect_stock_copy().returning(|id| Ok(Some(copy(id))));
        store
            .expect_has_open_loan()
            .with(eq(10))
            .returning(|_| Ok(true));

        assert!(!service(store).is_available(10).await.unwrap());

        let mut store = MockCirculationStore::new();
        store.expect_stock_copy().returning(|id| Ok(Some(copy(id))));
        store
            .expect_has_open_loan()
            .with(eq(11))
            .returning(|_| Ok(false));

        assert!(service(store).is_available(11).await.unwrap());
    }

    #[tokio::test]
    async fn availability_fails_for_unknown_copy() {
        let mut store = MockCirculationStore::new();
        store.expect_stock_copy().with(eq(5)).returning(|_| Ok(None));
        store.expect_has_open_loan().never();

        let err = service(store).is_available(5).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::ReferenceNotFound {
                entity: "stock copy",
                id: 5
            }
        ));
    }

    #[tokio::test]
    async fn penalty_check_fails_for_unknown_user() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().with(eq(8)).returning(|_| Ok(false));
        store.expect_has_active_penalty().never();

        let err = service(store).has_active_penalty(8).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::ReferenceNotFound { entity: "user", id: 8 }
        ));
    }

    #[tokio::test]
    async fn user_penalties_carry_activity_flags() {
        let mut store = MockCirculationStore::new();
        store.expect_user_exists().returning(|_| Ok(true));
        store.expect_user_penalties().with(eq(1)).returning(|_| {
            Ok(vec![
                Penalty {
                    id: 1,
                    description: Some("Returned 5 day(s) late".to_string()),
                    ends_on: Some(date(2000, 1, 1)),
                    user_id: 1,
                    loan_id: Some(7),
                },
                Penalty {
                    id: 2,
                    description: None,
                    ends_on: None,
                    user_id: 1,
                    loan_id: None,
                },
            ])
        });

        let penalties = service(store).user_penalties(1).await.unwrap();

        assert_eq!(penalties.len(), 2);
        // Long expired vs. indefinite.
        assert!(!penalties[0].active);
        assert!(penalties[1].active);
    }
}
