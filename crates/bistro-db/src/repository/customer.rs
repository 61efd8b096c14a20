//! # Customer Repository
//!
//! Customers and their loyalty balance.
//!
//! Loyalty is only ever credited with in-database arithmetic
//! (`loyalty_points = loyalty_points + n`) inside the sale or billing
//! transaction that earned it.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use bistro_core::validation::{normalize_optional, validate_email, validate_name, validate_search_query};
use bistro_core::{CoreError, Customer};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

const CUSTOMER_COLUMNS: &str =
    "id, name, email, phone, address, loyalty_points, created_at, updated_at";

/// A new customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update; `None` leaves a field unchanged. Loyalty is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists customers by name, optionally filtered on name, email or phone.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Customer>> {
        let search = validate_search_query(search.unwrap_or_default())?;
        let pattern = (!search.is_empty()).then(|| format!("%{}%", search));

        let sql = format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE ?1 IS NULL OR name LIKE ?1 OR email LIKE ?1 OR phone LIKE ?1
            ORDER BY name
            "#
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    pub async fn insert(&self, new: NewCustomer) -> DbResult<Customer> {
        let name = validate_name("name", &new.name, 200)?;
        let email = normalize_optional(new.email)
            .map(|e| validate_email(&e))
            .transpose()?;

        let now = Utc::now();
        let customer = Customer {
            id: generate_id(),
            name,
            email,
            phone: normalize_optional(new.phone),
            address: normalize_optional(new.address),
            loyalty_points: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, address, loyalty_points, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, customer.email.clone().unwrap_or_default())
            }
            other => other,
        })?;

        info!(id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn update(&self, id: &str, update: CustomerUpdate) -> DbResult<Customer> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name("name", n, 200))
            .transpose()?;
        let email = normalize_optional(update.email)
            .map(|e| validate_email(&e))
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                phone = COALESCE(?4, phone),
                address = COALESCE(?5, address),
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(normalize_optional(update.phone))
        .bind(normalize_optional(update.address))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()).into());
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Fails with `CustomerNotFound` unless the customer exists.
pub(crate) async fn ensure_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    name.ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
}

/// Credits loyalty points inside an open transaction.
pub(crate) async fn credit_loyalty(
    conn: &mut SqliteConnection,
    customer_id: &str,
    points: i64,
) -> DbResult<()> {
    if points <= 0 {
        return Ok(());
    }

    let result = sqlx::query(
        "UPDATE customers SET loyalty_points = loyalty_points + ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(customer_id)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
    }

    debug!(customer_id = %customer_id, points = points, "Loyalty credited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn walk_in(name: &str, email: Option<&str>) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: Some("555-0100".to_string()),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_insert_update_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let c = repo
            .insert(walk_in("Asha Rao", Some("Asha@Example.com")))
            .await
            .unwrap();
        assert_eq!(c.email.as_deref(), Some("asha@example.com"));
        assert_eq!(c.loyalty_points, 0);

        let updated = repo
            .update(
                &c.id,
                CustomerUpdate {
                    address: Some("12 MG Road".to_string()),
                    ..CustomerUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("12 MG Road"));
        assert_eq!(updated.name, "Asha Rao");

        assert_eq!(repo.list(Some("asha")).await.unwrap().len(), 1);
        assert_eq!(repo.list(Some("nobody")).await.unwrap().len(), 0);
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.insert(walk_in("A", Some("a@example.com"))).await.unwrap();
        let err = repo.insert(walk_in("B", Some("a@example.com"))).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Customers without email never collide.
        repo.insert(walk_in("C", None)).await.unwrap();
        repo.insert(walk_in("D", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .customers()
            .update("missing", CustomerUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn test_credit_loyalty_is_additive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let c = db.customers().insert(walk_in("A", None)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        credit_loyalty(&mut conn, &c.id, 262).await.unwrap();
        credit_loyalty(&mut conn, &c.id, 10).await.unwrap();
        credit_loyalty(&mut conn, &c.id, 0).await.unwrap();
        drop(conn);

        let c = db.customers().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(c.loyalty_points, 272);
    }
}
