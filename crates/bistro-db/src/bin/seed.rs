//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant: one account per staff
//! role, the menu, two customers and two suppliers.
//!
//! ## Usage
//! ```bash
//! # Seed ./bistro.db (or $DATABASE_PATH)
//! cargo run -p bistro-db --bin seed
//!
//! # Specify database path
//! cargo run -p bistro-db --bin seed -- --db ./data/bistro.db
//! ```
//!
//! Running it twice is harmless: anything that already exists (matched by
//! email, category name or SKU) is left alone.
//!
//! ## Demo Accounts
//! | Email                    | Password   | Role    |
//! |--------------------------|------------|---------|
//! | admin@restaurant.com     | admin123   | ADMIN   |
//! | manager@restaurant.com   | manager123 | MANAGER |
//! | waiter@restaurant.com    | waiter123  | WAITER  |
//! | chef@restaurant.com      | chef123    | CHEF    |
//! | cashier@restaurant.com   | cashier123 | CASHIER |

use std::collections::HashMap;
use std::env;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bistro_core::Role;
use bistro_db::repository::customer::NewCustomer;
use bistro_db::repository::product::NewProduct;
use bistro_db::repository::supplier::NewSupplier;
use bistro_db::repository::user::NewUser;
use bistro_db::{Database, DbConfig};

const STAFF: &[(&str, &str, &str, Role)] = &[
    ("admin@restaurant.com", "admin123", "Admin User", Role::Admin),
    ("manager@restaurant.com", "manager123", "Restaurant Manager", Role::Manager),
    ("waiter@restaurant.com", "waiter123", "Waiter User", Role::Waiter),
    ("chef@restaurant.com", "chef123", "Head Chef", Role::Chef),
    ("cashier@restaurant.com", "cashier123", "Cashier User", Role::Cashier),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Appetizers", "Starters and snacks"),
    ("Main Course", "Main dishes and meals"),
    ("Beverages", "Drinks and refreshments"),
    ("Desserts", "Sweet treats and desserts"),
    ("Breads", "Fresh baked breads"),
];

/// (category, name, description, sku, price, cost, stock), money in rupees.
const MENU: &[(&str, &str, &str, &str, i64, i64, i64)] = &[
    ("Appetizers", "Paneer Tikka", "Grilled cottage cheese with spices", "APP-001", 250, 100, 50),
    ("Appetizers", "Chicken Wings", "Crispy fried chicken wings", "APP-002", 300, 120, 40),
    ("Main Course", "Chicken Biryani", "Aromatic basmati rice with tender chicken", "MAIN-001", 350, 150, 100),
    ("Main Course", "Butter Chicken", "Creamy tomato curry with chicken", "MAIN-002", 320, 140, 80),
    ("Main Course", "Dal Tadka", "Yellow lentils with spices", "MAIN-003", 180, 70, 90),
    ("Breads", "Butter Naan", "Soft flatbread with butter", "BREAD-001", 40, 15, 200),
    ("Breads", "Garlic Naan", "Naan with garlic and herbs", "BREAD-002", 50, 20, 180),
    ("Beverages", "Mango Lassi", "Sweet mango yogurt drink", "BEV-001", 80, 30, 150),
    ("Beverages", "Masala Chai", "Spiced Indian tea", "BEV-002", 40, 15, 200),
    ("Desserts", "Gulab Jamun", "Sweet milk dumplings in syrup", "DES-001", 120, 50, 100),
    ("Desserts", "Kulfi", "Traditional Indian ice cream", "DES-002", 100, 40, 80),
];

const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("John Doe", "john@example.com", "+1234567890", "123 Main St, City"),
    ("Jane Smith", "jane@example.com", "+1234567891", "456 Oak Ave, City"),
];

const SUPPLIERS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "Fresh Vegetables Co.",
        "supplier1@example.com",
        "+91-9876543210",
        "Market Road, Fresh Produce District",
        "Rajesh Kumar",
    ),
    (
        "Spice Traders Ltd.",
        "supplier2@example.com",
        "+91-9876543211",
        "Spice Market, Old City",
        "Priya Sharma",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| String::from("./bistro.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bistro POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH or ./bistro.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bistro POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Staff
    let mut created = 0;
    for (email, password, name, role) in STAFF {
        if db.users().get_by_email(email).await?.is_some() {
            continue;
        }
        db.users()
            .insert(NewUser {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                role: *role,
            })
            .await
            .with_context(|| format!("creating user {email}"))?;
        created += 1;
    }
    println!("✓ Staff accounts: {} created", created);

    // Categories
    let mut category_ids: HashMap<String, String> = db
        .categories()
        .list()
        .await?
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect();

    for (name, description) in CATEGORIES {
        if category_ids.contains_key(*name) {
            continue;
        }
        let category = db
            .categories()
            .insert(name, Some(description.to_string()))
            .await
            .with_context(|| format!("creating category {name}"))?;
        category_ids.insert(category.name, category.id);
    }
    println!("✓ Categories: {}", category_ids.len());

    // Menu
    let mut created = 0;
    for (category, name, description, sku, price, cost, stock) in MENU {
        if db.products().get_by_sku(sku).await?.is_some() {
            continue;
        }
        let Some(category_id) = category_ids.get(*category) else {
            warn!(sku = %sku, category = %category, "Category missing, skipping menu item");
            continue;
        };

        db.products()
            .insert(NewProduct {
                name: name.to_string(),
                description: Some(description.to_string()),
                sku: sku.to_string(),
                barcode: None,
                price_cents: price * 100,
                cost_price_cents: cost * 100,
                stock: *stock,
                min_stock: None,
                category_id: category_id.clone(),
                image_url: None,
            })
            .await
            .with_context(|| format!("creating menu item {sku}"))?;
        created += 1;
    }
    println!("✓ Menu items: {} created", created);

    // Customers
    let mut created = 0;
    for (name, email, phone, address) in CUSTOMERS {
        if !db.customers().list(Some(*email)).await?.is_empty() {
            continue;
        }
        db.customers()
            .insert(NewCustomer {
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: Some(phone.to_string()),
                address: Some(address.to_string()),
            })
            .await?;
        created += 1;
    }
    println!("✓ Customers: {} created", created);

    // Suppliers
    let existing = db.suppliers().list().await?;
    let mut created = 0;
    for (name, email, phone, address, contact) in SUPPLIERS {
        if existing.iter().any(|s| s.email.as_deref() == Some(*email)) {
            continue;
        }
        db.suppliers()
            .insert(NewSupplier {
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: Some(phone.to_string()),
                address: Some(address.to_string()),
                contact_person: Some(contact.to_string()),
            })
            .await?;
        created += 1;
    }
    println!("✓ Suppliers: {} created", created);

    info!(products = db.products().count().await?, "Seed complete");
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
