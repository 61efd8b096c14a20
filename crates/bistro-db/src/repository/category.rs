//! # Category Repository
//!
//! Menu categories. Listing includes the number of active products in each.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use bistro_core::validation::{normalize_optional, validate_name};
use bistro_core::{Category, CategorySummary};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists categories by name with their active product counts.
    pub async fn list(&self) -> DbResult<Vec<CategorySummary>> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT
                c.id,
                c.name,
                c.description,
                COUNT(p.id) AS product_count,
                c.created_at
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id AND p.is_active = 1
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Creates a category. Names are unique.
    pub async fn insert(&self, name: &str, description: Option<String>) -> DbResult<Category> {
        let category = Category {
            id: generate_id(),
            name: validate_name("name", name, 100)?,
            description: normalize_optional(description),
            created_at: Utc::now(),
        };

        debug!(name = %category.name, "Inserting category");

        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.name),
            other => other,
        })?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_list_counts_active_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let breads = db.categories().insert("Breads", None).await.unwrap();
        db.categories()
            .insert("Desserts", Some("Sweet things".to_string()))
            .await
            .unwrap();

        for sku in ["BREAD-001", "BREAD-002"] {
            db.products()
                .insert(NewProduct {
                    name: sku.to_string(),
                    description: None,
                    sku: sku.to_string(),
                    barcode: None,
                    price_cents: 4000,
                    cost_price_cents: 1000,
                    stock: 200,
                    min_stock: None,
                    category_id: breads.id.clone(),
                    image_url: None,
                })
                .await
                .unwrap();
        }

        let list = db.categories().list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Breads");
        assert_eq!(list[0].product_count, 2);
        assert_eq!(list[1].product_count, 0);
        assert_eq!(list[1].description.as_deref(), Some("Sweet things"));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().insert("Beverages", None).await.unwrap();
        let err = db.categories().insert("Beverages", None).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
