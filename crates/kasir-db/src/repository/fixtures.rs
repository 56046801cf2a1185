//! Shared setup for repository tests: an in-memory database with one
//! business, one branch, an owner and a cashier.

use chrono::Utc;
use kasir_core::{Branch, Business, Member, MemberTier, Product, Role, User};

use super::{generate_id, NewBranch, NewMember, NewProduct};
use crate::{Database, DbConfig};

/// Placeholder hash; fixture accounts never log in.
const FIXTURE_HASH: &str = "fixture-no-login";

pub(crate) struct Fixture {
    pub db: Database,
    pub business: Business,
    pub branch: Branch,
    pub owner: User,
    pub cashier: User,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let business = db
            .businesses()
            .create("Toko Makmur", Some("Pak Budi"), false)
            .await
            .unwrap();
        let branch = db
            .branches()
            .create(
                &business.id,
                &NewBranch {
                    name: "Cabang Pusat".to_string(),
                    address: None,
                    phone: None,
                },
            )
            .await
            .unwrap();

        let owner = insert_user(&db, &business.id, None, "owner@makmur.id", Role::Owner).await;
        let cashier = insert_user(
            &db,
            &business.id,
            Some(branch.id.clone()),
            "kasir@makmur.id",
            Role::Cashier,
        )
        .await;

        Fixture {
            db,
            business,
            branch,
            owner,
            cashier,
        }
    }

    pub async fn enable_points(&mut self) {
        self.business = self
            .db
            .businesses()
            .set_points_enabled(&self.business.id, true)
            .await
            .unwrap();
    }

    pub async fn add_branch(&self, name: &str) -> Branch {
        self.db
            .branches()
            .create(
                &self.business.id,
                &NewBranch {
                    name: name.to_string(),
                    address: None,
                    phone: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn add_product(&self, name: &str, retail_price: i64, stock: i64) -> Product {
        self.add_product_in(&self.branch.id, name, None, retail_price, None, stock)
            .await
    }

    pub async fn add_product_in(
        &self,
        branch_id: &str,
        name: &str,
        barcode: Option<&str>,
        retail_price: i64,
        member_price: Option<i64>,
        stock: i64,
    ) -> Product {
        self.db
            .products()
            .create(
                &self.business.id,
                branch_id,
                &NewProduct {
                    name: name.to_string(),
                    barcode: barcode.map(str::to_string),
                    retail_price,
                    member_price,
                    cost_price: None,
                    stock,
                },
            )
            .await
            .unwrap()
    }

    pub async fn add_member(&self, name: &str) -> Member {
        self.db
            .members()
            .create(
                &self.business.id,
                &NewMember {
                    name: name.to_string(),
                    phone: None,
                    email: None,
                    tier: MemberTier::Regular,
                },
            )
            .await
            .unwrap()
    }
}

async fn insert_user(
    db: &Database,
    business_id: &str,
    branch_id: Option<String>,
    email: &str,
    role: Role,
) -> User {
    let now = Utc::now();
    let user = User {
        id: generate_id(),
        business_id: business_id.to_string(),
        branch_id,
        name: email.to_string(),
        email: email.to_string(),
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&user, FIXTURE_HASH).await.unwrap();
    user
}
