//! # Expense Repository
//!
//! Operating expenses, netted against gross profit in the profit report.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use bistro_core::validation::{normalize_optional, validate_name, validate_positive_cents};
use bistro_core::{Expense, ExpenseCategory};

use crate::error::DbResult;
use crate::repository::{generate_id, DateRange};

/// A new expense. `expense_date` defaults to now.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub expense_date: Option<DateTime<Utc>>,
}

/// Filters for [`ExpenseRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub range: DateRange,
    pub category: Option<ExpenseCategory>,
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Lists expenses, newest first.
    pub async fn list(&self, filter: &ExpenseFilter) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, description, amount_cents, category, notes, expense_date, user_id, created_at
            FROM expenses
            WHERE (?1 IS NULL OR expense_date >= ?1)
              AND (?2 IS NULL OR expense_date <= ?2)
              AND (?3 IS NULL OR category = ?3)
            ORDER BY expense_date DESC
            "#,
        )
        .bind(filter.range.start)
        .bind(filter.range.end)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Records an expense against the staff member who entered it.
    pub async fn insert(&self, user_id: &str, new: NewExpense) -> DbResult<Expense> {
        let description = validate_name("description", &new.description, 500)?;
        validate_positive_cents("amountCents", new.amount_cents)?;

        let now = Utc::now();
        let expense = Expense {
            id: generate_id(),
            description,
            amount_cents: new.amount_cents,
            category: new.category,
            notes: normalize_optional(new.notes),
            expense_date: new.expense_date.unwrap_or(now),
            user_id: user_id.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (id, description, amount_cents, category, notes, expense_date, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(expense.category)
        .bind(&expense.notes)
        .bind(expense.expense_date)
        .bind(&expense.user_id)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %expense.id, category = %expense.category, amount_cents = expense.amount_cents, "Expense recorded");
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};
    use bistro_core::Role;
    use chrono::Duration;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let admin = db
            .users()
            .insert(NewUser {
                email: "admin@restaurant.com".to_string(),
                password: "admin123".to_string(),
                name: "Admin".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        (db, admin.id)
    }

    fn expense(category: ExpenseCategory, cents: i64, at: DateTime<Utc>) -> NewExpense {
        NewExpense {
            description: format!("{category} payment"),
            amount_cents: cents,
            category,
            notes: None,
            expense_date: Some(at),
        }
    }

    #[tokio::test]
    async fn test_filters() {
        let (db, admin) = setup().await;
        let repo = db.expenses();
        let now = Utc::now();

        repo.insert(&admin, expense(ExpenseCategory::Rent, 5_000_000, now - Duration::days(40)))
            .await
            .unwrap();
        repo.insert(&admin, expense(ExpenseCategory::Utilities, 300_000, now - Duration::days(2)))
            .await
            .unwrap();
        repo.insert(&admin, expense(ExpenseCategory::Rent, 5_000_000, now))
            .await
            .unwrap();

        let all = repo.list(&ExpenseFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let recent = repo
            .list(&ExpenseFilter {
                range: DateRange::new(Some(now - Duration::days(7)), None),
                category: None,
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        let rent = repo
            .list(&ExpenseFilter {
                range: DateRange::all(),
                category: Some(ExpenseCategory::Rent),
            })
            .await
            .unwrap();
        assert_eq!(rent.len(), 2);
    }

    #[tokio::test]
    async fn test_amount_must_be_positive() {
        let (db, admin) = setup().await;
        let err = db
            .expenses()
            .insert(&admin, expense(ExpenseCategory::Other, 0, Utc::now()))
            .await;
        assert!(err.is_err());
    }
}
