//! # Supplier Repository

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use bistro_core::validation::{normalize_optional, validate_email, validate_name};
use bistro_core::Supplier;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, email, phone, address, contact_person, created_at
            FROM suppliers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn insert(&self, new: NewSupplier) -> DbResult<Supplier> {
        let supplier = Supplier {
            id: generate_id(),
            name: validate_name("name", &new.name, 200)?,
            email: normalize_optional(new.email)
                .map(|e| validate_email(&e))
                .transpose()?,
            phone: normalize_optional(new.phone),
            address: normalize_optional(new.address),
            contact_person: normalize_optional(new.contact_person),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, email, phone, address, contact_person, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.contact_person)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, supplier.email.clone().unwrap_or_default())
            }
            other => other,
        })?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.suppliers()
            .insert(NewSupplier {
                name: "Spice Traders".to_string(),
                email: Some("orders@spice.example".to_string()),
                phone: None,
                address: None,
                contact_person: Some("Ravi".to_string()),
            })
            .await
            .unwrap();

        let list = db.suppliers().list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].contact_person.as_deref(), Some("Ravi"));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .suppliers()
            .insert(NewSupplier {
                name: "  ".to_string(),
                email: None,
                phone: None,
                address: None,
                contact_person: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }
}
