//! # Sale Repository
//!
//! Orders, direct sales and billing. A sale row *is* the order: it is created
//! `PENDING` by a waiter, walks the kitchen lifecycle and is closed by the
//! cashier at billing.
//!
//! ## Order Creation
//! ```text
//! create_order / create_sale
//!      │
//!      ▼
//! BEGIN
//!  ├── UPDATE invoice_sequence ... RETURNING last_value   (takes the write lock)
//!  ├── per line:  fetch_active → line_total → decrement_stock
//!  ├── OrderTotals::compute
//!  ├── INSERT sales, INSERT sale_items
//!  ├── (direct sale) credit loyalty
//! COMMIT ──────────────────────────────► SaleDetail
//!      │
//!      └── Busy / invoice collision → roll back, retry (max_attempts)
//!                                      └─▶ DbError::Conflict
//! ```
//!
//! Any failure rolls the whole transaction back: no stock moves, no invoice
//! number is consumed and no loyalty is credited.
//!
//! ## Billing
//! ```text
//! settle_bill(order, CASH, received 30000)
//!      │
//!      ▼
//! BEGIN
//!  ├── UPDATE sales SET updated_at ... WHERE status IN (ready, served)
//!  │        0 rows → NotFound / InvalidTransition   (already billed, too early)
//!  ├── ensure_transition(from, COMPLETED, role)
//!  ├── OrderTotals::from_parts → verify_client_total → settle
//!  ├── UPDATE sales SET status = completed ...
//!  ├── credit loyalty
//! COMMIT
//! ```
//! Billing never touches inventory; stock moved when the order was taken.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use bistro_core::invoice::format_invoice_number;
use bistro_core::lifecycle::{ensure_status_update, ensure_transition};
use bistro_core::pricing::{
    ensure_settlement_method, line_total, loyalty_points, settle, verify_client_total, OrderTotals,
};
use bistro_core::validation::{normalize_optional, validate_amount_cents, validate_order_size, validate_quantity};
use bistro_core::{
    CoreError, Money, OrderStatus, PaymentMethod, PaymentNote, Role, Sale, SaleDetail, SaleItem,
    StockPolicy, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::{customer, generate_id, product, DateRange};

const SALE_COLUMNS: &str = r#"
    id, invoice_number, invoice_seq, customer_id, customer_name, user_id, table_number,
    subtotal_cents, discount_cents, tax_cents, total_cents, payment_method, status, notes,
    received_cents, change_cents, created_at, updated_at, completed_at, settled_by
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, product_id, product_name, quantity, unit_price_cents, discount_cents,
    total_cents, created_at
"#;

// =============================================================================
// Settings & Inputs
// =============================================================================

/// How sale transactions behave under stock shortage and contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleSettings {
    pub stock_policy: StockPolicy,
    /// Attempts per sale before giving up with `Conflict`. At least 1.
    pub max_attempts: u32,
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            stock_policy: StockPolicy::default(),
            max_attempts: 3,
        }
    }
}

/// One requested line. Price and name come from the product row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// A waiter's table order. Created `PENDING`, billed later.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub table_number: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub notes: Option<String>,
    /// Accepted for client compatibility; only `PENDING` is allowed.
    pub status: Option<OrderStatus>,
}

/// A counter sale, created and paid in one step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub notes: Option<String>,
    /// Cash tendered; defaults to the exact total.
    pub received_cents: Option<i64>,
}

/// Closing a served order at the till.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub order_id: String,
    pub payment_method: PaymentMethod,
    /// Replaces the order's discount when present.
    pub discount_cents: Option<i64>,
    /// The total the client displayed; rejected if it disagrees.
    pub final_total_cents: Option<i64>,
    pub received_cents: Option<i64>,
}

/// Filters for [`SaleRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<OrderStatus>,
    /// Sales this staff member took or settled.
    pub user_id: Option<String>,
    pub range: DateRange,
    pub limit: Option<i64>,
}

/// Normalized input shared by orders and direct sales.
struct Draft<'a> {
    user_id: &'a str,
    table_number: Option<String>,
    customer_id: Option<String>,
    customer_name: Option<String>,
    lines: &'a [OrderLine],
    discount: Money,
    tax: Money,
    notes: Option<String>,
    /// `Some` for a direct sale: paid on creation.
    payment: Option<(PaymentMethod, Option<Money>)>,
}

impl Draft<'_> {
    /// Everything checkable before touching the database.
    fn validate(&self) -> DbResult<()> {
        validate_order_size(self.lines.len())?;
        for line in self.lines {
            validate_quantity(line.quantity)?;
            validate_amount_cents("discountCents", line.discount_cents)?;
        }
        validate_amount_cents("taxCents", self.tax.cents())?;
        validate_amount_cents("discountCents", self.discount.cents())?;
        if let Some((method, received)) = self.payment {
            ensure_settlement_method(method)?;
            if let Some(received) = received {
                validate_amount_cents("receivedCents", received.cents())?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders, sales and billing.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    settings: SaleSettings,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, settings: SaleSettings) -> Self {
        SaleRepository { pool, settings }
    }

    /// Takes a table order: stock is reserved now, payment comes at billing.
    pub async fn create_order(&self, user_id: &str, order: NewOrder) -> DbResult<SaleDetail> {
        if order.status.is_some_and(|s| s != OrderStatus::Pending) {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![OrderStatus::Pending.to_string()],
            }
            .into());
        }

        let draft = Draft {
            user_id,
            table_number: normalize_optional(order.table_number),
            customer_id: normalize_optional(order.customer_id),
            customer_name: normalize_optional(order.customer_name),
            lines: &order.items,
            discount: Money::from_cents(order.discount_cents),
            tax: Money::from_cents(order.tax_cents),
            notes: normalize_optional(order.notes),
            payment: None,
        };

        let detail = self.create_with_retry(&draft).await?;
        info!(
            id = %detail.sale.id,
            invoice = %detail.sale.invoice_number,
            table = ?detail.sale.table_number,
            total_cents = detail.sale.total_cents,
            "Order created"
        );
        Ok(detail)
    }

    /// Records a counter sale, completed and paid at once.
    pub async fn create_sale(&self, user_id: &str, sale: NewSale) -> DbResult<SaleDetail> {
        let draft = Draft {
            user_id,
            table_number: None,
            customer_id: normalize_optional(sale.customer_id),
            customer_name: normalize_optional(sale.customer_name),
            lines: &sale.items,
            discount: Money::from_cents(sale.discount_cents),
            tax: Money::from_cents(sale.tax_cents),
            notes: normalize_optional(sale.notes),
            payment: Some((sale.payment_method, sale.received_cents.map(Money::from_cents))),
        };

        let detail = self.create_with_retry(&draft).await?;
        info!(
            id = %detail.sale.id,
            invoice = %detail.sale.invoice_number,
            method = %detail.sale.payment_method,
            total_cents = detail.sale.total_cents,
            "Sale completed"
        );
        Ok(detail)
    }

    async fn create_with_retry(&self, draft: &Draft<'_>) -> DbResult<SaleDetail> {
        draft.validate()?;

        let mut attempt = 1;
        loop {
            match self.try_create(draft).await {
                Ok(detail) => return Ok(detail),
                Err(e) if e.is_retryable() => {
                    if attempt >= self.settings.max_attempts {
                        warn!(attempts = attempt, error = %e, "Sale transaction gave up");
                        return Err(DbError::Conflict(format!(
                            "invoice allocation failed after {attempt} attempts"
                        )));
                    }
                    warn!(attempt = attempt, error = %e, "Sale transaction collided, retrying");
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_create(&self, draft: &Draft<'_>) -> DbResult<SaleDetail> {
        let mut tx = self.pool.begin().await?;

        // Writing first makes this a write transaction from the start, so two
        // concurrent sales serialize here instead of deadlocking on upgrade.
        let seq: i64 = sqlx::query_scalar(
            "UPDATE invoice_sequence SET last_value = last_value + 1 WHERE id = 1 RETURNING last_value",
        )
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let sale_id = generate_id();

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in draft.lines {
            let product = product::fetch_active(&mut tx, &line.product_id).await?;
            let total = line_total(
                product.price(),
                line.quantity,
                Money::from_cents(line.discount_cents),
            )?;
            product::decrement_stock(&mut tx, &product, line.quantity, self.settings.stock_policy)
                .await?;

            items.push(SaleItem {
                id: generate_id(),
                sale_id: sale_id.clone(),
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                discount_cents: line.discount_cents,
                total_cents: total.cents(),
                created_at: now,
            });
        }

        let totals = OrderTotals::compute(
            items.iter().map(|i| Money::from_cents(i.total_cents)),
            draft.discount,
            draft.tax,
        )?;

        let customer_name = match &draft.customer_id {
            Some(id) => {
                let name = customer::ensure_exists(&mut tx, id).await?;
                draft.customer_name.clone().or(Some(name))
            }
            None => draft.customer_name.clone(),
        };

        let (status, payment_method, note, completed_at) = match draft.payment {
            Some((method, received)) => {
                let note = settle(totals.total, method, Some(received.unwrap_or(totals.total)))?;
                (OrderStatus::Completed, method, Some(note), Some(now))
            }
            None => (OrderStatus::Pending, PaymentMethod::Pending, None, None),
        };

        let sale = Sale {
            id: sale_id,
            invoice_number: format_invoice_number(seq),
            invoice_seq: seq,
            customer_id: draft.customer_id.clone(),
            customer_name,
            user_id: draft.user_id.to_string(),
            table_number: draft.table_number.clone(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            payment_method,
            status,
            notes: draft.notes.clone(),
            received_cents: note.map(|n| n.received_cents),
            change_cents: note.map(|n| n.change_cents),
            created_at: now,
            updated_at: now,
            completed_at,
            settled_by: draft.payment.map(|_| draft.user_id.to_string()),
        };

        insert_sale(&mut tx, &sale).await?;
        for item in &items {
            insert_item(&mut tx, item).await?;
        }

        if status == OrderStatus::Completed {
            if let Some(customer_id) = &sale.customer_id {
                customer::credit_loyalty(&mut tx, customer_id, loyalty_points(sale.total())).await?;
            }
        }

        tx.commit().await?;

        debug!(invoice = %sale.invoice_number, lines = items.len(), "Sale transaction committed");
        Ok(SaleDetail::new(sale, items))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// An order with its line items.
    pub async fn get_detail(&self, id: &str) -> DbResult<SaleDetail> {
        let sale = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        let mut details = self.attach_items(vec![sale]).await?;
        details
            .pop()
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()).into())
    }

    /// Lists orders newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<SaleDetail>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR user_id = ?2 OR settled_by = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at <= ?4)
            ORDER BY created_at DESC
            LIMIT ?5
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(filter.status)
            .bind(&filter.user_id)
            .bind(filter.range.start)
            .bind(filter.range.end)
            .bind(filter.limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(sales).await
    }

    /// Orders the kitchen still has to deal with, oldest first.
    pub async fn kitchen_queue(&self) -> DbResult<Vec<SaleDetail>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE status IN ('pending', 'preparing', 'ready')
            ORDER BY created_at ASC
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(sales).await
    }

    async fn attach_items(&self, sales: Vec<Sale>) -> DbResult<Vec<SaleDetail>> {
        if sales.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id IN ("
        ));
        let mut ids = qb.separated(", ");
        for sale in &sales {
            ids.push_bind(sale.id.clone());
        }
        ids.push_unseparated(") ORDER BY rowid");

        let rows = qb
            .build_query_as::<SaleItem>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
        for item in rows {
            by_sale.entry(item.sale_id.clone()).or_default().push(item);
        }

        Ok(sales
            .into_iter()
            .map(|sale| {
                let items = by_sale.remove(&sale.id).unwrap_or_default();
                SaleDetail::new(sale, items)
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Moves an order along the kitchen lifecycle.
    ///
    /// The UPDATE is guarded on the status that was checked, so two staff
    /// racing on the same order cannot both succeed.
    pub async fn transition_status(
        &self,
        id: &str,
        to: OrderStatus,
        role: Role,
    ) -> DbResult<SaleDetail> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        ensure_status_update(current.status, to, role)?;

        let result = sqlx::query(
            "UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(to)
        .bind(Utc::now())
        .bind(current.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let now: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(match now {
                Some(from) => CoreError::InvalidTransition { from, to }.into(),
                None => CoreError::OrderNotFound(id.to_string()).into(),
            });
        }

        info!(id = %id, from = %current.status, to = %to, role = %role, "Order status changed");
        self.get_detail(id).await
    }

    /// Bills a ready or served order: applies the final discount, records
    /// payment, completes the order and credits loyalty.
    ///
    /// `user_id` is recorded as the settling staff member.
    pub async fn settle_bill(
        &self,
        settlement: Settlement,
        user_id: &str,
        role: Role,
    ) -> DbResult<SaleDetail> {
        ensure_settlement_method(settlement.payment_method)?;
        if let Some(discount) = settlement.discount_cents {
            validate_amount_cents("discountCents", discount)?;
        }
        if let Some(received) = settlement.received_cents {
            validate_amount_cents("receivedCents", received)?;
        }

        let id = settlement.order_id.as_str();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Claim the row for writing before reading it.
        let claimed: Option<OrderStatus> = sqlx::query_scalar(
            r#"
            UPDATE sales SET updated_at = ?2
            WHERE id = ?1 AND status IN ('ready', 'served')
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let from = match claimed {
            Some(status) => status,
            None => {
                let current: Option<OrderStatus> =
                    sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1")
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match current {
                    Some(from) => CoreError::InvalidTransition {
                        from,
                        to: OrderStatus::Completed,
                    }
                    .into(),
                    None => CoreError::OrderNotFound(id.to_string()).into(),
                });
            }
        };

        ensure_transition(from, OrderStatus::Completed, role)?;

        let sale = fetch_sale(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        let discount = settlement
            .discount_cents
            .map(Money::from_cents)
            .unwrap_or(Money::from_cents(sale.discount_cents));
        let totals = OrderTotals::from_parts(sale.subtotal(), discount, Money::from_cents(sale.tax_cents))?;
        verify_client_total(totals.total, settlement.final_total_cents)?;
        let note: PaymentNote = settle(
            totals.total,
            settlement.payment_method,
            settlement.received_cents.map(Money::from_cents),
        )?;

        sqlx::query(
            r#"
            UPDATE sales SET
                discount_cents = ?2,
                total_cents = ?3,
                payment_method = ?4,
                status = 'completed',
                received_cents = ?5,
                change_cents = ?6,
                completed_at = ?7,
                updated_at = ?7,
                settled_by = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(totals.discount.cents())
        .bind(totals.total.cents())
        .bind(settlement.payment_method)
        .bind(note.received_cents)
        .bind(note.change_cents)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if let Some(customer_id) = &sale.customer_id {
            customer::credit_loyalty(&mut tx, customer_id, loyalty_points(totals.total)).await?;
        }

        tx.commit().await?;

        info!(
            id = %id,
            invoice = %sale.invoice_number,
            by = %user_id,
            method = %settlement.payment_method,
            total_cents = totals.total.cents(),
            change_cents = note.change_cents,
            "Bill settled"
        );
        self.get_detail(id).await
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    let sql = format!(
        r#"
        INSERT INTO sales ({SALE_COLUMNS})
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
        "#
    );

    sqlx::query(&sql)
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(sale.invoice_seq)
        .bind(&sale.customer_id)
        .bind(&sale.customer_name)
        .bind(&sale.user_id)
        .bind(&sale.table_number)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(&sale.notes)
        .bind(sale.received_cents)
        .bind(sale.change_cents)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .bind(&sale.settled_by)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO sale_items ({SALE_ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    );

    sqlx::query(&sql)
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::customer::NewCustomer;
    use crate::repository::product::NewProduct;
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};
    use bistro_core::AccessError;

    struct Fixture {
        db: Database,
        waiter: String,
        cashier: String,
        /// 100.00, 10 in stock
        biryani: String,
        /// 50.00, 5 in stock
        lassi: String,
        customer: String,
    }

    async fn fixture_with(config: DbConfig) -> Fixture {
        let db = Database::new(config).await.unwrap();

        let mut staff = Vec::new();
        for (email, role) in [
            ("waiter@restaurant.com", Role::Waiter),
            ("cashier@restaurant.com", Role::Cashier),
        ] {
            let user = db
                .users()
                .insert(NewUser {
                    email: email.to_string(),
                    password: "secret123".to_string(),
                    name: email.to_string(),
                    role,
                })
                .await
                .unwrap();
            staff.push(user.id);
        }

        let category = db.categories().insert("Main Course", None).await.unwrap();
        let mut products = Vec::new();
        for (sku, price, stock) in [("MAIN-001", 10000, 10), ("BEV-001", 5000, 5)] {
            let p = db
                .products()
                .insert(NewProduct {
                    name: sku.to_string(),
                    description: None,
                    sku: sku.to_string(),
                    barcode: None,
                    price_cents: price,
                    cost_price_cents: price / 2,
                    stock,
                    min_stock: Some(2),
                    category_id: category.id.clone(),
                    image_url: None,
                })
                .await
                .unwrap();
            products.push(p.id);
        }

        let customer = db
            .customers()
            .insert(NewCustomer {
                name: "Asha".to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();

        Fixture {
            db,
            waiter: staff[0].clone(),
            cashier: staff[1].clone(),
            biryani: products[0].clone(),
            lassi: products[1].clone(),
            customer: customer.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(DbConfig::in_memory()).await
    }

    fn line(product_id: &str, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product_id.to_string(),
            quantity,
            discount_cents: 0,
        }
    }

    fn table_order(f: &Fixture, items: Vec<OrderLine>) -> NewOrder {
        NewOrder {
            table_number: Some("T4".to_string()),
            customer_id: Some(f.customer.clone()),
            items,
            tax_cents: 1250,
            ..NewOrder::default()
        }
    }

    fn cash(order_id: &str, received: i64) -> Settlement {
        Settlement {
            order_id: order_id.to_string(),
            payment_method: PaymentMethod::Cash,
            discount_cents: None,
            final_total_cents: None,
            received_cents: Some(received),
        }
    }

    async fn stock_of(f: &Fixture, id: &str) -> i64 {
        f.db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    async fn loyalty_of(f: &Fixture) -> i64 {
        f.db.customers()
            .get_by_id(&f.customer)
            .await
            .unwrap()
            .unwrap()
            .loyalty_points
    }

    async fn serve(f: &Fixture, id: &str) {
        let sales = f.db.sales();
        sales.transition_status(id, OrderStatus::Preparing, Role::Chef).await.unwrap();
        sales.transition_status(id, OrderStatus::Ready, Role::Chef).await.unwrap();
        sales.transition_status(id, OrderStatus::Served, Role::Waiter).await.unwrap();
    }

    #[tokio::test]
    async fn test_order_to_bill_end_to_end() {
        let f = fixture().await;
        let sales = f.db.sales();

        let order = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 2), line(&f.lassi, 1)]))
            .await
            .unwrap();

        assert_eq!(order.sale.invoice_number, "INV-000001");
        assert_eq!(order.sale.status, OrderStatus::Pending);
        assert_eq!(order.sale.payment_method, PaymentMethod::Pending);
        assert_eq!(order.sale.subtotal_cents, 25000);
        assert_eq!(order.sale.total_cents, 26250);
        assert_eq!(order.sale.customer_name.as_deref(), Some("Asha"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].total_cents, 20000);
        assert!(order.payment_note.is_none());

        assert_eq!(stock_of(&f, &f.biryani).await, 8);
        assert_eq!(stock_of(&f, &f.lassi).await, 4);

        serve(&f, &order.sale.id).await;

        let billed = sales
            .settle_bill(cash(&order.sale.id, 30000), &f.cashier, Role::Cashier)
            .await
            .unwrap();
        assert_eq!(billed.sale.status, OrderStatus::Completed);
        assert_eq!(billed.sale.payment_method, PaymentMethod::Cash);
        assert!(billed.sale.completed_at.is_some());
        assert_eq!(
            billed.payment_note,
            Some(PaymentNote {
                received_cents: 30000,
                change_cents: 3750
            })
        );
        assert_eq!(loyalty_of(&f).await, 262);
        assert_eq!(billed.sale.user_id, f.waiter);
        assert_eq!(billed.sale.settled_by.as_deref(), Some(f.cashier.as_str()));

        // The cashier's own sales include orders they billed but did not take.
        let cashier_sales = sales
            .list(&SaleFilter {
                status: Some(OrderStatus::Completed),
                user_id: Some(f.cashier.clone()),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(cashier_sales.len(), 1);

        // Billing does not move stock again.
        assert_eq!(stock_of(&f, &f.biryani).await, 8);
        assert_eq!(stock_of(&f, &f.lassi).await, 4);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_whole_order() {
        let f = fixture().await;
        let sales = f.db.sales();

        let err = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 1), line(&f.lassi, 6)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));

        assert_eq!(stock_of(&f, &f.biryani).await, 10);
        assert_eq!(stock_of(&f, &f.lassi).await, 5);
        assert!(sales.list(&SaleFilter::default()).await.unwrap().is_empty());

        // The failed attempt did not burn an invoice number.
        let next = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 5)]))
            .await
            .unwrap();
        assert_eq!(next.sale.invoice_number, "INV-000001");
        assert_eq!(stock_of(&f, &f.lassi).await, 0);
    }

    #[tokio::test]
    async fn test_repeated_product_lines_share_the_floor() {
        let f = fixture().await;
        let err = f
            .db
            .sales()
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 3), line(&f.lassi, 3)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(stock_of(&f, &f.lassi).await, 5);
    }

    #[tokio::test]
    async fn test_allow_negative_stock_policy() {
        let f = fixture_with(DbConfig::in_memory().stock_policy(StockPolicy::AllowNegative)).await;
        f.db.sales()
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 7)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&f, &f.lassi).await, -2);
    }

    #[tokio::test]
    async fn test_invalid_orders_rejected() {
        let f = fixture().await;
        let sales = f.db.sales();

        let err = sales.create_order(&f.waiter, table_order(&f, vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyOrder)));

        let mut born_ready = table_order(&f, vec![line(&f.biryani, 1)]);
        born_ready.status = Some(OrderStatus::Ready);
        let err = sales.create_order(&f.waiter, born_ready).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = sales
            .create_order(&f.waiter, table_order(&f, vec![line("no-such-product", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let mut unknown_customer = table_order(&f, vec![line(&f.biryani, 1)]);
        unknown_customer.customer_id = Some("ghost".to_string());
        let err = sales.create_order(&f.waiter, unknown_customer).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
        assert_eq!(stock_of(&f, &f.biryani).await, 10);
    }

    #[tokio::test]
    async fn test_huge_amounts_rejected_before_any_write() {
        let f = fixture().await;
        let sales = f.db.sales();

        let mut huge_tax = table_order(&f, vec![line(&f.biryani, 1)]);
        huge_tax.tax_cents = i64::MAX;
        let err = sales.create_order(&f.waiter, huge_tax).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut huge_discount = table_order(&f, vec![line(&f.biryani, 1)]);
        huge_discount.items[0].discount_cents = i64::MAX;
        assert!(sales.create_order(&f.waiter, huge_discount).await.is_err());
        assert_eq!(stock_of(&f, &f.biryani).await, 10);

        let order = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 1)]))
            .await
            .unwrap();
        serve(&f, &order.sale.id).await;
        let err = sales
            .settle_bill(cash(&order.sale.id, i64::MAX), &f.cashier, Role::Cashier)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(loyalty_of(&f).await, 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_product_cannot_be_ordered() {
        let f = fixture().await;
        f.db.products().soft_delete(&f.lassi).await.unwrap();
        let err = f
            .db
            .sales()
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_direct_sale_completes_and_credits_loyalty() {
        let f = fixture().await;
        let sale = f
            .db
            .sales()
            .create_sale(
                &f.cashier,
                NewSale {
                    customer_id: Some(f.customer.clone()),
                    customer_name: None,
                    items: vec![line(&f.biryani, 3)],
                    payment_method: PaymentMethod::Upi,
                    tax_cents: 0,
                    discount_cents: 500,
                    notes: None,
                    received_cents: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(sale.sale.status, OrderStatus::Completed);
        assert_eq!(sale.sale.total_cents, 29500);
        assert_eq!(
            sale.payment_note,
            Some(PaymentNote {
                received_cents: 29500,
                change_cents: 0
            })
        );
        assert_eq!(loyalty_of(&f).await, 295);
        assert_eq!(stock_of(&f, &f.biryani).await, 7);
    }

    #[tokio::test]
    async fn test_direct_sale_requires_a_real_payment_method() {
        let f = fixture().await;
        let err = f
            .db
            .sales()
            .create_sale(
                &f.cashier,
                NewSale {
                    customer_id: None,
                    customer_name: None,
                    items: vec![line(&f.biryani, 1)],
                    payment_method: PaymentMethod::Pending,
                    tax_cents: 0,
                    discount_cents: 0,
                    notes: None,
                    received_cents: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(stock_of(&f, &f.biryani).await, 10);
    }

    #[tokio::test]
    async fn test_lifecycle_rules() {
        let f = fixture().await;
        let sales = f.db.sales();
        let order = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 1)]))
            .await
            .unwrap();
        let id = order.sale.id.as_str();

        // Skipping the kitchen.
        let err = sales
            .transition_status(id, OrderStatus::Served, Role::Waiter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Served
            })
        ));

        // Right edge, wrong role.
        let err = sales
            .transition_status(id, OrderStatus::Preparing, Role::Waiter)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Access(AccessError::Forbidden { .. }))
        ));

        sales.transition_status(id, OrderStatus::Preparing, Role::Chef).await.unwrap();
        let ready = sales.transition_status(id, OrderStatus::Ready, Role::Chef).await.unwrap();
        assert_eq!(ready.sale.status, OrderStatus::Ready);

        // The status endpoint never completes an order.
        let err = sales
            .transition_status(id, OrderStatus::Completed, Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransition { .. })));

        let err = sales
            .transition_status("missing", OrderStatus::Preparing, Role::Chef)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_bill_rules() {
        let f = fixture().await;
        let sales = f.db.sales();
        let order = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 2), line(&f.lassi, 1)]))
            .await
            .unwrap();
        let id = order.sale.id.as_str();

        // Not ready yet.
        let err = sales.settle_bill(cash(id, 30000), &f.cashier, Role::Cashier).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Completed
            })
        ));

        serve(&f, id).await;

        // Chefs may not bill.
        let err = sales.settle_bill(cash(id, 30000), &f.cashier, Role::Chef).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Access(_))));

        // Short cash leaves the order served.
        let err = sales.settle_bill(cash(id, 20000), &f.cashier, Role::Cashier).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientPayment { .. })));

        // Client disagrees on the total.
        let mut stale = cash(id, 30000);
        stale.final_total_cents = Some(25000);
        let err = sales.settle_bill(stale, &f.cashier, Role::Cashier).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let after = sales.get_detail(id).await.unwrap();
        assert_eq!(after.sale.status, OrderStatus::Served);
        assert_eq!(loyalty_of(&f).await, 0);

        // A bill-time discount replaces the order's.
        let mut discounted = cash(id, 25000);
        discounted.discount_cents = Some(1250);
        discounted.final_total_cents = Some(25000);
        let billed = sales.settle_bill(discounted, &f.cashier, Role::Manager).await.unwrap();
        assert_eq!(billed.sale.discount_cents, 1250);
        assert_eq!(billed.sale.total_cents, 25000);
        assert_eq!(billed.payment_note.map(|n| n.change_cents), Some(0));
        assert_eq!(loyalty_of(&f).await, 250);

        // Second billing is refused and credits nothing.
        let err = sales.settle_bill(cash(id, 30000), &f.cashier, Role::Cashier).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidTransition {
                from: OrderStatus::Completed,
                ..
            })
        ));
        assert_eq!(loyalty_of(&f).await, 250);

        let err = sales.settle_bill(cash("missing", 1), &f.cashier, Role::Cashier).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_card_bill_from_ready() {
        let f = fixture().await;
        let sales = f.db.sales();
        let order = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 1)]))
            .await
            .unwrap();
        let id = order.sale.id.as_str();
        sales.transition_status(id, OrderStatus::Preparing, Role::Chef).await.unwrap();
        sales.transition_status(id, OrderStatus::Ready, Role::Chef).await.unwrap();

        let billed = sales
            .settle_bill(
                Settlement {
                    order_id: id.to_string(),
                    payment_method: PaymentMethod::Card,
                    discount_cents: None,
                    final_total_cents: Some(6250),
                    received_cents: None,
                },
                &f.cashier,
                Role::Cashier,
            )
            .await
            .unwrap();
        assert_eq!(billed.payment_note.map(|n| n.received_cents), Some(6250));
    }

    #[tokio::test]
    async fn test_kitchen_queue_and_list_filters() {
        let f = fixture().await;
        let sales = f.db.sales();

        let first = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.biryani, 1)]))
            .await
            .unwrap();
        let second = sales
            .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 1)]))
            .await
            .unwrap();
        sales
            .create_sale(
                &f.cashier,
                NewSale {
                    customer_id: None,
                    customer_name: Some("Walk-in".to_string()),
                    items: vec![line(&f.lassi, 1)],
                    payment_method: PaymentMethod::Cash,
                    tax_cents: 0,
                    discount_cents: 0,
                    notes: None,
                    received_cents: Some(10000),
                },
            )
            .await
            .unwrap();
        serve(&f, &second.sale.id).await;

        let queue = sales.kitchen_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].sale.id, first.sale.id);
        assert_eq!(queue[0].items.len(), 1);

        let mine = sales
            .list(&SaleFilter {
                user_id: Some(f.waiter.clone()),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let completed = sales
            .list(&SaleFilter {
                status: Some(OrderStatus::Completed),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].payment_note.map(|n| n.change_cents), Some(5000));

        let limited = sales
            .list(&SaleFilter {
                limit: Some(2),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_get_distinct_invoices() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("bistro.db"))
            .max_connections(8)
            .sale_retries(5);
        let f = fixture_with(config).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = f.db.clone();
            let waiter = f.waiter.clone();
            let biryani = f.biryani.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .create_order(
                        &waiter,
                        NewOrder {
                            items: vec![OrderLine {
                                product_id: biryani,
                                quantity: 1,
                                discount_cents: 0,
                            }],
                            ..NewOrder::default()
                        },
                    )
                    .await
            }));
        }

        let mut seqs = Vec::new();
        for handle in handles {
            let detail = handle.await.unwrap().unwrap();
            seqs.push(detail.sale.invoice_seq);
        }
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=8).collect::<Vec<i64>>());
        assert_eq!(stock_of(&f, &f.biryani).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_accumulate_loyalty() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("bistro.db"))
            .max_connections(8)
            .sale_retries(5);
        let f = fixture_with(config).await;

        // Four table orders (50.00 + 12.50 tax = 62 points each), served and
        // waiting for the till.
        let mut open_orders = Vec::new();
        for _ in 0..4 {
            let order = f
                .db
                .sales()
                .create_order(&f.waiter, table_order(&f, vec![line(&f.lassi, 1)]))
                .await
                .unwrap();
            serve(&f, &order.sale.id).await;
            open_orders.push(order.sale.id);
        }

        let mut handles = Vec::new();
        for id in open_orders {
            let db = f.db.clone();
            let cashier = f.cashier.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .settle_bill(cash(&id, 10000), &cashier, Role::Cashier)
                    .await
            }));
        }
        // Six counter sales (100.00 = 100 points each) racing the bills.
        for _ in 0..6 {
            let db = f.db.clone();
            let cashier = f.cashier.clone();
            let sale = NewSale {
                customer_id: Some(f.customer.clone()),
                customer_name: None,
                items: vec![line(&f.biryani, 1)],
                payment_method: PaymentMethod::Card,
                tax_cents: 0,
                discount_cents: 0,
                notes: None,
                received_cents: None,
            };
            handles.push(tokio::spawn(async move {
                db.sales().create_sale(&cashier, sale).await
            }));
        }

        let mut expected = 0;
        for handle in handles {
            let detail = handle.await.unwrap().unwrap();
            assert_eq!(detail.sale.status, OrderStatus::Completed);
            expected += loyalty_points(detail.sale.total());
        }

        assert_eq!(expected, 4 * 62 + 6 * 100);
        assert_eq!(loyalty_of(&f).await, expected);
        assert_eq!(stock_of(&f, &f.biryani).await, 4);
    }
}
