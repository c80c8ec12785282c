//! # Seed Data Generator
//!
//! Populates a development database with products and employees.
//!
//! ## Usage
//! ```bash
//! # 200 products (default)
//! cargo run -p mizan-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p mizan-db --bin seed -- --count 1000 --db ./data/mizan.db
//! ```
//!
//! Every product with opening stock gets an INITIAL_STOCK history row in the
//! same transaction, so a freshly seeded database already replays cleanly.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use mizan_core::{Employee, InventoryAction, Product, DEFAULT_MIN_QUANTITY};
use mizan_db::{Database, DbConfig, EmployeeRepository, InventoryRepository, ProductRepository, StockMovement};

/// Product families: (SKU prefix, names)
const CATEGORIES: &[(&str, &[&str])] = &[
    ("BEV", &["Cola", "Orange Soda", "Mineral Water", "Iced Tea", "Mango Juice"]),
    ("SNK", &["Salted Chips", "Chocolate Bar", "Butter Cookies", "Peanuts"]),
    ("DRY", &["Whole Milk", "Yogurt", "Cheddar", "Butter"]),
    ("GRO", &["Basmati Rice", "Red Lentils", "Sugar", "Flour", "Cooking Oil"]),
];

/// Pack sizes and their price add-on in cents
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 100), ("Large", 250), ("Family", 500)];

const EMPLOYEES: &[(&str, &str, i64)] = &[
    ("Sara Ahmed", "Cashier", 3_000_00),
    ("Bilal Khan", "Storekeeper", 2_500_00),
    ("Hina Malik", "Manager", 6_000_00),
];

const SEED_USER: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./mizan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mizan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./mizan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mizan Seed Data Generator");
    println!("Database: {}", db_path);
    println!("Products: {}", count);

    let db = Database::new(DbConfig::new(&db_path)).await?;

    if !db.products().list_active(1).await?.is_empty() {
        println!("Database already has products; skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut tx = db.begin_immediate().await?;
    let mut generated = 0;

    for slot in catalog_slots(count) {
        let product = generate_product(&slot);
        let opening = product.quantity;

        // Inserted at zero, then brought up through the guard so the
        // opening balance is on the trail.
        ProductRepository::insert(&mut tx, &Product { quantity: 0, ..product.clone() }).await?;
        if opening > 0 {
            let movement = StockMovement {
                product_id: &product.id,
                action: InventoryAction::InitialStock,
                reference_id: None,
                reason: Some("Opening balance"),
                user_id: SEED_USER,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, opening, Utc::now()).await?;
        }
        generated += 1;
    }

    for (name, position, salary) in EMPLOYEES {
        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            position: Some(position.to_string()),
            salary_cents: *salary,
            remaining_salary_cents: None,
            last_payment_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        EmployeeRepository::insert(&mut tx, &employee).await?;
    }

    tx.commit().await?;

    println!(
        "Generated {} products and {} employees in {:?}",
        generated,
        EMPLOYEES.len(),
        start.elapsed()
    );
    println!("Low stock: {} products", db.products().low_stock().await?.len());

    db.close().await;
    Ok(())
}

/// One catalog position: a category, name and size, repeated per batch.
#[derive(Debug, Clone, Copy)]
struct Slot {
    prefix: &'static str,
    name: &'static str,
    size: &'static str,
    addon: i64,
    batch: usize,
    seed: usize,
}

/// The first `count` catalog positions. One pass covers every category,
/// name and size; later passes repeat it as numbered batches.
fn catalog_slots(count: usize) -> Vec<Slot> {
    let mut pass = Vec::new();
    for (category_idx, (prefix, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                pass.push((*prefix, *name, *size, *addon, category_idx * 1000 + name_idx * 20 + size_idx));
            }
        }
    }

    (0..count)
        .map(|n| {
            let (prefix, name, size, addon, base) = pass[n % pass.len()];
            let batch = n / pass.len();
            Slot {
                prefix,
                name,
                size,
                addon,
                batch,
                seed: batch * 10_000 + base,
            }
        })
        .collect()
}

/// Deterministic pseudo-random product from its position in the catalog.
fn generate_product(slot: &Slot) -> Product {
    let now = Utc::now();
    let seed = slot.seed;
    let cost = 50 + ((seed * 37) % 900) as i64 + slot.addon;
    let margin = 10 + (seed % 4) as i64 * 10;

    Product {
        id: Uuid::new_v4().to_string(),
        sku: format!("{}-{:05}", slot.prefix, seed),
        barcode: Some(format!("200{:010}", seed)),
        name: match slot.batch {
            0 => format!("{} {}", slot.name, slot.size),
            n => format!("{} {} #{}", slot.name, slot.size, n + 1),
        },
        quantity: ((seed * 13) % 60) as i64,
        min_quantity: DEFAULT_MIN_QUANTITY,
        cost_price_cents: cost,
        selling_price_cents: cost + cost * margin / 100,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
