//! # Product Repository
//!
//! Database operations for menu items and the stock ledger.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, compute, write back                                    │
//! │     SELECT stock → 5;  UPDATE products SET stock = 3                   │
//! │     (two concurrent orders both read 5, one decrement is lost)         │
//! │                                                                         │
//! │  ✅ CORRECT: in-database arithmetic with an optional floor             │
//! │     UPDATE products SET stock = stock - 2                              │
//! │      WHERE id = ? AND is_active = 1 AND stock >= 2                     │
//! │                                                                         │
//! │  0 rows affected?                                                      │
//! │     product missing/inactive  → ProductNotFound                        │
//! │     otherwise                 → InsufficientStock (whole order rolls   │
//! │                                 back)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Manual adjustments from the inventory screen either overwrite the level
//! ([`ProductRepository::set_stock`]) or apply a delta
//! ([`ProductRepository::adjust_stock`]).

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use bistro_core::validation::{
    normalize_optional, validate_amount_cents, validate_name, validate_search_query, validate_sku,
    validate_stock_delta, validate_stock_level,
};
use bistro_core::{
    CoreError, Product, StockPolicy, ValidationError, DEFAULT_MIN_STOCK, MAX_STOCK_LEVEL,
};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

const PRODUCT_COLUMNS: &str = "id, name, description, sku, barcode, price_cents, cost_price_cents, \
     stock, min_stock, category_id, image_url, is_active, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// Filters for [`ProductRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Matches name or SKU (substring) or barcode (exact).
    pub search: Option<String>,
    pub category_id: Option<String>,
    /// Only products at or below their threshold.
    pub low_stock: bool,
}

/// A new menu item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub min_stock: Option<i64>,
    pub category_id: String,
    pub image_url: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    /// Overwrites the stock level.
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = match filter.search.as_deref() {
            Some(s) => validate_search_query(s)?,
            None => String::new(),
        };

        debug!(search = %search, category_id = ?filter.category_id, low_stock = filter.low_stock, "Listing products");

        let pattern = if search.is_empty() {
            None
        } else {
            Some(format!("%{}%", search))
        };

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR name LIKE ?1 OR sku LIKE ?1 OR barcode = ?2)
              AND (?3 IS NULL OR category_id = ?3)
              AND (?4 = 0 OR stock <= min_stock)
            ORDER BY name
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(&search)
            .bind(filter.category_id.as_deref())
            .bind(filter.low_stock)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Product list returned");
        Ok(products)
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets an active product or fails with `ProductNotFound`.
    pub async fn require_active(&self, id: &str) -> DbResult<Product> {
        match self.get_by_id(id).await? {
            Some(p) if p.is_active => Ok(p),
            _ => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    /// * `Err(DbError::ForeignKeyViolation)` - unknown category
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        let name = validate_name("name", &new.name, 200)?;
        validate_sku(&new.sku)?;
        validate_amount_cents("priceCents", new.price_cents)?;
        validate_amount_cents("costPriceCents", new.cost_price_cents)?;
        validate_stock_level("stock", new.stock)?;
        let min_stock = new.min_stock.unwrap_or(DEFAULT_MIN_STOCK);
        validate_stock_level("minStock", min_stock)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name,
            description: normalize_optional(new.description),
            sku: new.sku.trim().to_string(),
            barcode: normalize_optional(new.barcode),
            price_cents: new.price_cents,
            cost_price_cents: new.cost_price_cents,
            stock: new.stock,
            min_stock,
            category_id: new.category_id,
            image_url: normalize_optional(new.image_url),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, sku, barcode,
                price_cents, cost_price_cents, stock, min_stock,
                category_id, image_url, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.cost_price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(&product.category_id)
        .bind(&product.image_url)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Applies a partial update and returns the new row.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name("name", n, 200))
            .transpose()?;
        if let Some(sku) = update.sku.as_deref() {
            validate_sku(sku)?;
        }
        if let Some(price) = update.price_cents {
            validate_amount_cents("priceCents", price)?;
        }
        if let Some(cost) = update.cost_price_cents {
            validate_amount_cents("costPriceCents", cost)?;
        }
        if let Some(stock) = update.stock {
            validate_stock_level("stock", stock)?;
        }
        if let Some(min_stock) = update.min_stock {
            validate_stock_level("minStock", min_stock)?;
        }

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                sku = COALESCE(?4, sku),
                barcode = COALESCE(?5, barcode),
                price_cents = COALESCE(?6, price_cents),
                cost_price_cents = COALESCE(?7, cost_price_cents),
                stock = COALESCE(?8, stock),
                min_stock = COALESCE(?9, min_stock),
                category_id = COALESCE(?10, category_id),
                image_url = COALESCE(?11, image_url),
                is_active = COALESCE(?12, is_active),
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(normalize_optional(update.description))
        .bind(update.sku.map(|s| s.trim().to_string()))
        .bind(normalize_optional(update.barcode))
        .bind(update.price_cents)
        .bind(update.cost_price_cents)
        .bind(update.stock)
        .bind(update.min_stock)
        .bind(update.category_id)
        .bind(normalize_optional(update.image_url))
        .bind(update.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Overwrites the stock level (inventory count).
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<Product> {
        self.update(
            id,
            ProductUpdate {
                stock: Some(stock),
                ..ProductUpdate::default()
            },
        )
        .await
    }

    /// Applies a stock delta (restock or write-off).
    ///
    /// Under [`StockPolicy::RejectInsufficient`] the result may not go
    /// below zero. It may never exceed [`MAX_STOCK_LEVEL`].
    pub async fn adjust_stock(&self, id: &str, delta: i64, policy: StockPolicy) -> DbResult<Product> {
        debug!(id = %id, delta = delta, ?policy, "Adjusting stock");
        validate_stock_delta(delta)?;

        let floor_checked = policy == StockPolicy::RejectInsufficient;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1
              AND stock + ?2 <= ?5
              AND (?4 = 0 OR stock + ?2 >= 0)
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .bind(floor_checked)
        .bind(MAX_STOCK_LEVEL)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let product = self.require_active(id).await?;
            if delta > 0 {
                return Err(ValidationError::OutOfRange {
                    field: "stock".to_string(),
                    min: 0,
                    max: MAX_STOCK_LEVEL,
                }
                .into());
            }
            return Err(CoreError::InsufficientStock {
                sku: product.sku,
                available: product.stock,
                requested: delta.saturating_neg(),
            }
            .into());
        }

        let product = self.require_active(id).await?;
        info!(id = %id, stock = product.stock, "Stock adjusted");
        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sale items still reference the row.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Reads an active product inside an open transaction.
pub(crate) async fn fetch_active(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1");
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

/// Takes `quantity` units off a product inside an open transaction.
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
    policy: StockPolicy,
) -> DbResult<()> {
    let floor_checked = policy == StockPolicy::RejectInsufficient;

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND (?4 = 0 OR stock >= ?2)
        "#,
    )
    .bind(&product.id)
    .bind(quantity)
    .bind(Utc::now())
    .bind(floor_checked)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Re-read: an earlier line of the same order may have consumed stock.
        let current = fetch_active(conn, &product.id).await?;
        return Err(CoreError::InsufficientStock {
            sku: current.sku,
            available: current.stock,
            requested: quantity,
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
