//! # Report Repository
//!
//! Read-only aggregates for the back office. Sales and profit figures count
//! `COMPLETED` sales only; an order still in the kitchen has not earned
//! anything yet.
//!
//! ```text
//! GET /reports/sales     → SalesReport      (totals, by method, top items, per day)
//! GET /reports/inventory → InventoryReport  (stock value, alerts, per category)
//! GET /reports/profit    → ProfitReport     (revenue − cost − expenses)
//! ```
//!
//! Cost of goods uses each product's *current* cost price; sale items freeze
//! the selling price but not the cost.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use ts_rs::TS;

use bistro_core::{ExpenseCategory, PaymentMethod};

use crate::error::DbResult;
use crate::repository::DateRange;

const TOP_PRODUCTS: i64 = 10;

// =============================================================================
// Report Types
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesTotals {
    pub transactions: i64,
    pub total_sales_cents: i64,
    pub total_discount_cents: i64,
    pub total_tax_cents: i64,
    pub average_sale_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub transactions: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub transactions: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub totals: SalesTotals,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub top_products: Vec<ProductSales>,
    pub daily: Vec<DailyTotal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockValuation {
    pub total_products: i64,
    pub total_stock_units: i64,
    pub stock_value_cost_cents: i64,
    pub stock_value_retail_cents: i64,
    pub potential_profit_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub min_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStock {
    pub category_id: String,
    pub category_name: String,
    pub product_count: i64,
    pub stock_units: i64,
    pub stock_value_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    #[serde(flatten)]
    pub valuation: StockValuation,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
    pub by_category: Vec<CategoryStock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTotal {
    pub category: ExpenseCategory,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfit {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub profit_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub gross_profit_cents: i64,
    pub expenses_cents: i64,
    pub net_profit_cents: i64,
    /// Gross profit over revenue, in basis points.
    pub gross_margin_bps: i64,
    pub net_margin_bps: i64,
    pub expenses_by_category: Vec<ExpenseTotal>,
    pub top_products: Vec<ProductProfit>,
}

/// `part / whole` in basis points, 0 when there is no revenue.
fn margin_bps(part: i64, whole: i64) -> i64 {
    if whole == 0 {
        0
    } else {
        part * 10_000 / whole
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for report aggregates.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    pub async fn sales_report(&self, range: DateRange) -> DbResult<SalesReport> {
        debug!(?range, "Building sales report");

        let totals = sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT
                COUNT(*) AS transactions,
                COALESCE(SUM(total_cents), 0) AS total_sales_cents,
                COALESCE(SUM(discount_cents), 0) AS total_discount_cents,
                COALESCE(SUM(tax_cents), 0) AS total_tax_cents,
                COALESCE(SUM(total_cents) / COUNT(*), 0) AS average_sale_cents
            FROM sales
            WHERE status = 'completed'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let by_payment_method = sqlx::query_as::<_, PaymentMethodTotal>(
            r#"
            SELECT payment_method, COUNT(*) AS transactions, SUM(total_cents) AS total_cents
            FROM sales
            WHERE status = 'completed'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            GROUP BY payment_method
            ORDER BY total_cents DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                i.product_id,
                MAX(i.product_name) AS product_name,
                SUM(i.quantity) AS quantity,
                SUM(i.total_cents) AS revenue_cents
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            WHERE s.status = 'completed'
              AND (?1 IS NULL OR s.created_at >= ?1)
              AND (?2 IS NULL OR s.created_at <= ?2)
            GROUP BY i.product_id
            ORDER BY quantity DESC, revenue_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(TOP_PRODUCTS)
        .fetch_all(&self.pool)
        .await?;

        let daily = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT
                substr(created_at, 1, 10) AS date,
                COUNT(*) AS transactions,
                SUM(total_cents) AS total_cents
            FROM sales
            WHERE status = 'completed'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            GROUP BY date
            ORDER BY date
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesReport {
            totals,
            by_payment_method,
            top_products,
            daily,
        })
    }

    /// Stock position of the active menu.
    pub async fn inventory_report(&self) -> DbResult<InventoryReport> {
        debug!("Building inventory report");

        let valuation = sqlx::query_as::<_, StockValuation>(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(stock), 0) AS total_stock_units,
                COALESCE(SUM(MAX(stock, 0) * cost_price_cents), 0) AS stock_value_cost_cents,
                COALESCE(SUM(MAX(stock, 0) * price_cents), 0) AS stock_value_retail_cents,
                COALESCE(SUM(MAX(stock, 0) * (price_cents - cost_price_cents)), 0)
                    AS potential_profit_cents
            FROM products
            WHERE is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let low_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT id, name, sku, stock, min_stock
            FROM products
            WHERE is_active = 1 AND stock > 0 AND stock <= min_stock
            ORDER BY stock, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let out_of_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT id, name, sku, stock, min_stock
            FROM products
            WHERE is_active = 1 AND stock <= 0
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_category = sqlx::query_as::<_, CategoryStock>(
            r#"
            SELECT
                c.id AS category_id,
                c.name AS category_name,
                COUNT(p.id) AS product_count,
                COALESCE(SUM(p.stock), 0) AS stock_units,
                COALESCE(SUM(MAX(p.stock, 0) * p.price_cents), 0) AS stock_value_cents
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id AND p.is_active = 1
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(InventoryReport {
            valuation,
            low_stock,
            out_of_stock,
            by_category,
        })
    }

    pub async fn profit_report(&self, range: DateRange) -> DbResult<ProfitReport> {
        debug!(?range, "Building profit report");

        let revenue_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0)
            FROM sales
            WHERE status = 'completed'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let cost_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(i.quantity * p.cost_price_cents), 0)
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN products p ON p.id = i.product_id
            WHERE s.status = 'completed'
              AND (?1 IS NULL OR s.created_at >= ?1)
              AND (?2 IS NULL OR s.created_at <= ?2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let expenses_by_category = sqlx::query_as::<_, ExpenseTotal>(
            r#"
            SELECT category, SUM(amount_cents) AS total_cents
            FROM expenses
            WHERE (?1 IS NULL OR expense_date >= ?1)
              AND (?2 IS NULL OR expense_date <= ?2)
            GROUP BY category
            ORDER BY total_cents DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, ProductProfit>(
            r#"
            SELECT
                i.product_id,
                MAX(i.product_name) AS product_name,
                SUM(i.quantity) AS quantity,
                SUM(i.total_cents) AS revenue_cents,
                SUM(i.quantity * p.cost_price_cents) AS cost_cents,
                SUM(i.total_cents) - SUM(i.quantity * p.cost_price_cents) AS profit_cents
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN products p ON p.id = i.product_id
            WHERE s.status = 'completed'
              AND (?1 IS NULL OR s.created_at >= ?1)
              AND (?2 IS NULL OR s.created_at <= ?2)
            GROUP BY i.product_id
            ORDER BY profit_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(TOP_PRODUCTS)
        .fetch_all(&self.pool)
        .await?;

        let expenses_cents = expenses_by_category.iter().map(|e| e.total_cents).sum();
        let gross_profit_cents = revenue_cents - cost_cents;
        let net_profit_cents = gross_profit_cents - expenses_cents;

        Ok(ProfitReport {
            revenue_cents,
            cost_cents,
            gross_profit_cents,
            expenses_cents,
            net_profit_cents,
            gross_margin_bps: margin_bps(gross_profit_cents, revenue_cents),
            net_margin_bps: margin_bps(net_profit_cents, revenue_cents),
            expenses_by_category,
            top_products,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::expense::NewExpense;
    use crate::repository::product::NewProduct;
    use crate::repository::sale::{NewOrder, NewSale, OrderLine};
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};
    use bistro_core::Role;
    use chrono::{Duration, Utc};

    struct Fixture {
        db: Database,
        user: String,
        /// price 350.00, cost 150.00, stock 100
        biryani: String,
        /// price 80.00, cost 30.00, stock 12, min 10
        lassi: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .insert(NewUser {
                email: "cashier@restaurant.com".to_string(),
                password: "cashier123".to_string(),
                name: "Cashier".to_string(),
                role: Role::Cashier,
            })
            .await
            .unwrap();
        let mains = db.categories().insert("Main Course", None).await.unwrap();
        let drinks = db.categories().insert("Beverages", None).await.unwrap();

        let mut ids = Vec::new();
        for (sku, cat, price, cost, stock) in [
            ("MAIN-001", &mains.id, 35000, 15000, 100),
            ("BEV-001", &drinks.id, 8000, 3000, 12),
            ("BEV-002", &drinks.id, 4000, 1500, 0),
        ] {
            let p = db
                .products()
                .insert(NewProduct {
                    name: sku.to_string(),
                    description: None,
                    sku: sku.to_string(),
                    barcode: None,
                    price_cents: price,
                    cost_price_cents: cost,
                    stock,
                    min_stock: None,
                    category_id: cat.clone(),
                    image_url: None,
                })
                .await
                .unwrap();
            ids.push(p.id);
        }

        Fixture {
            db,
            user: user.id,
            biryani: ids[0].clone(),
            lassi: ids[1].clone(),
        }
    }

    fn counter_sale(items: Vec<(&str, i64)>, method: PaymentMethod) -> NewSale {
        NewSale {
            customer_id: None,
            customer_name: None,
            items: items
                .into_iter()
                .map(|(id, quantity)| OrderLine {
                    product_id: id.to_string(),
                    quantity,
                    discount_cents: 0,
                })
                .collect(),
            payment_method: method,
            tax_cents: 0,
            discount_cents: 0,
            notes: None,
            received_cents: None,
        }
    }

    #[test]
    fn test_margin_bps() {
        assert_eq!(margin_bps(0, 0), 0);
        assert_eq!(margin_bps(5000, 10000), 5000);
        assert_eq!(margin_bps(-2500, 10000), -2500);
    }

    #[tokio::test]
    async fn test_empty_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = db.reports();

        let sales = reports.sales_report(DateRange::all()).await.unwrap();
        assert_eq!(sales.totals, SalesTotals::default());
        assert!(sales.daily.is_empty());

        let profit = reports.profit_report(DateRange::all()).await.unwrap();
        assert_eq!(profit.revenue_cents, 0);
        assert_eq!(profit.gross_margin_bps, 0);

        let inventory = reports.inventory_report().await.unwrap();
        assert_eq!(inventory.valuation, StockValuation::default());
    }

    #[tokio::test]
    async fn test_sales_report_counts_completed_only() {
        let f = fixture().await;
        let sales = f.db.sales();

        sales
            .create_sale(&f.user, counter_sale(vec![(&f.biryani, 2)], PaymentMethod::Cash))
            .await
            .unwrap();
        sales
            .create_sale(
                &f.user,
                counter_sale(vec![(&f.lassi, 1), (&f.biryani, 1)], PaymentMethod::Card),
            )
            .await
            .unwrap();
        // Still in the kitchen: not revenue.
        sales
            .create_order(
                &f.user,
                NewOrder {
                    items: vec![OrderLine {
                        product_id: f.biryani.clone(),
                        quantity: 5,
                        discount_cents: 0,
                    }],
                    ..NewOrder::default()
                },
            )
            .await
            .unwrap();

        let report = f.db.reports().sales_report(DateRange::all()).await.unwrap();
        assert_eq!(report.totals.transactions, 2);
        assert_eq!(report.totals.total_sales_cents, 113000);
        assert_eq!(report.totals.average_sale_cents, 56500);

        assert_eq!(report.by_payment_method.len(), 2);
        assert_eq!(report.by_payment_method[0].payment_method, PaymentMethod::Cash);
        assert_eq!(report.by_payment_method[0].total_cents, 70000);

        assert_eq!(report.top_products[0].product_id, f.biryani);
        assert_eq!(report.top_products[0].quantity, 3);
        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.daily[0].date, Utc::now().format("%Y-%m-%d").to_string());

        let future = DateRange::new(Some(Utc::now() + Duration::days(1)), None);
        let empty = f.db.reports().sales_report(future).await.unwrap();
        assert_eq!(empty.totals.transactions, 0);
    }

    #[tokio::test]
    async fn test_inventory_report() {
        let f = fixture().await;
        let report = f.db.reports().inventory_report().await.unwrap();

        assert_eq!(report.valuation.total_products, 3);
        assert_eq!(report.valuation.total_stock_units, 112);
        assert_eq!(
            report.valuation.stock_value_cost_cents,
            100 * 15000 + 12 * 3000
        );
        assert_eq!(
            report.valuation.stock_value_retail_cents,
            100 * 35000 + 12 * 8000
        );
        assert_eq!(
            report.valuation.potential_profit_cents,
            report.valuation.stock_value_retail_cents - report.valuation.stock_value_cost_cents
        );

        assert!(report.low_stock.is_empty());
        assert_eq!(report.out_of_stock.len(), 1);
        assert_eq!(report.out_of_stock[0].sku, "BEV-002");

        assert_eq!(report.by_category.len(), 2);
        assert_eq!(report.by_category[0].category_name, "Beverages");
        assert_eq!(report.by_category[0].product_count, 2);

        // Selling lassi down to the reorder point raises an alert.
        f.db.sales()
            .create_sale(&f.user, counter_sale(vec![(&f.lassi, 3)], PaymentMethod::Upi))
            .await
            .unwrap();
        let report = f.db.reports().inventory_report().await.unwrap();
        assert_eq!(report.low_stock.len(), 1);
        assert_eq!(report.low_stock[0].stock, 9);
    }

    #[tokio::test]
    async fn test_profit_report() {
        let f = fixture().await;
        f.db.sales()
            .create_sale(
                &f.user,
                counter_sale(vec![(&f.biryani, 2), (&f.lassi, 2)], PaymentMethod::Cash),
            )
            .await
            .unwrap();
        f.db.expenses()
            .insert(
                &f.user,
                NewExpense {
                    description: "Gas cylinder".to_string(),
                    amount_cents: 20000,
                    category: ExpenseCategory::Utilities,
                    notes: None,
                    expense_date: None,
                },
            )
            .await
            .unwrap();

        let report = f.db.reports().profit_report(DateRange::all()).await.unwrap();
        assert_eq!(report.revenue_cents, 86000);
        assert_eq!(report.cost_cents, 36000);
        assert_eq!(report.gross_profit_cents, 50000);
        assert_eq!(report.expenses_cents, 20000);
        assert_eq!(report.net_profit_cents, 30000);
        assert_eq!(report.gross_margin_bps, 5813);
        assert_eq!(report.expenses_by_category[0].category, ExpenseCategory::Utilities);

        assert_eq!(report.top_products[0].product_id, f.biryani);
        assert_eq!(report.top_products[0].profit_cents, 40000);
        assert_eq!(report.top_products[1].profit_cents, 10000);
    }
}
