//! # Seed Data Generator
//!
//! Creates a demo business for development: one branch, an owner and a
//! cashier account, a small grocery catalog and a couple of members.
//!
//! ## Usage
//! ```bash
//! # Seed ./kasir_dev.db with password "rahasia123"
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path and account password
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db --password s3cret!
//! ```
//!
//! Running it twice is a no-op once the owner account exists.

use std::env;

use anyhow::Context;
use kasir_core::{MemberTier, Role};
use kasir_db::{Database, DbConfig, NewBranch, NewMember, NewProduct, NewUser};
use tracing::{info, warn};

const OWNER_EMAIL: &str = "owner@kasir.local";
const CASHIER_EMAIL: &str = "kasir@kasir.local";

/// (name, barcode, retail, member price, cost, stock)
const CATALOG: &[(&str, &str, i64, Option<i64>, i64, i64)] = &[
    ("Beras Pandan Wangi 5kg", "8992761100015", 78_000, Some(75_000), 70_000, 25),
    ("Minyak Goreng 2L", "8993496101021", 38_000, Some(36_500), 33_000, 30),
    ("Gula Pasir 1kg", "8998866100018", 17_500, None, 15_000, 40),
    ("Telur Ayam 1kg", "TELUR-1KG", 29_000, Some(28_000), 26_000, 12),
    ("Kopi Kapal Api 165g", "8991002101234", 14_000, None, 12_000, 50),
    ("Teh Celup Sariwangi", "8999999036041", 7_500, None, 6_200, 60),
    ("Indomie Goreng", "089686010947", 3_500, Some(3_200), 2_900, 200),
    ("Susu UHT 1L", "8993007000113", 19_000, None, 16_500, 4),
    ("Sabun Mandi Lifebuoy", "8999999001377", 4_500, None, 3_600, 3),
    ("Air Mineral 600ml", "8886008101053", 4_000, None, 2_800, 120),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./kasir_dev.db");
    let mut password = String::from("rahasia123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--password" | "-p" if i + 1 < args.len() => {
                password = args[i + 1].clone();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./kasir_dev.db)");
                println!("  -p, --password <PASS>    Password for seeded accounts (default: rahasia123)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");
    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    if db.users().get_by_email(OWNER_EMAIL).await?.is_some() {
        warn!(email = OWNER_EMAIL, "Database already seeded, nothing to do");
        return Ok(());
    }

    let business = db
        .businesses()
        .create("Toko Sembako Makmur", Some("Budi Santoso"), true)
        .await?;
    let branch = db
        .branches()
        .create(
            &business.id,
            &NewBranch {
                name: "Cabang Pusat".to_string(),
                address: Some("Jl. Merdeka No. 10, Bandung".to_string()),
                phone: Some("022-4201234".to_string()),
            },
        )
        .await?;

    let owner = NewUser {
        name: "Budi Santoso".to_string(),
        email: OWNER_EMAIL.to_string(),
        password: password.clone(),
        role: Role::Owner,
        branch_id: None,
    };
    db.users().create(&business.id, &owner).await?;
    db.users()
        .create(
            &business.id,
            &NewUser {
                name: "Sari Kasir".to_string(),
                email: CASHIER_EMAIL.to_string(),
                password,
                role: Role::Cashier,
                branch_id: Some(branch.id.clone()),
            },
        )
        .await?;

    for (name, barcode, retail, member, cost, stock) in CATALOG {
        db.products()
            .create(
                &business.id,
                &branch.id,
                &NewProduct {
                    name: name.to_string(),
                    barcode: Some(barcode.to_string()),
                    retail_price: *retail,
                    member_price: *member,
                    cost_price: Some(*cost),
                    stock: *stock,
                },
            )
            .await
            .with_context(|| format!("inserting {name}"))?;
    }

    for (name, phone, tier) in [
        ("Rina Wulandari", "081234567890", MemberTier::Gold),
        ("Agus Pratama", "085711223344", MemberTier::Regular),
    ] {
        db.members()
            .create(
                &business.id,
                &NewMember {
                    name: name.to_string(),
                    phone: Some(phone.to_string()),
                    email: None,
                    tier,
                },
            )
            .await?;
    }

    let products = db.products().count(&branch.id).await?;
    info!(
        business_id = %business.id,
        branch_id = %branch.id,
        products,
        owner = OWNER_EMAIL,
        cashier = CASHIER_EMAIL,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
