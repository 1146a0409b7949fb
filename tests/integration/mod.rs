// Tests that need postgres are ignored by default. Run them with
// TEST_DATABASE_URL=postgres://... cargo test --test integration -- --ignored

mod bootstrap;
mod constraints;
mod queries;

use restaurant_management::{
    types::{self, Config},
    utils::database::{self, schema, Database},
};
use sqlx::{PgConnection, Postgres, Transaction};

pub fn test_config(url: String) -> Config {
    Config::from_lookup(move |var: &str| match var {
        "DATABASE_URL" => Some(url.clone()),
        "DATABASE_CONNECT_TIMEOUT_SECS" => Some(String::from("5")),
        _ => None,
    })
    .unwrap()
}

pub fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for database tests")
}

// The transaction rolls back on drop
pub async fn setup() -> (Database, Transaction<'static, Postgres>) {
    let ctx = types::bootstrap(test_config(database_url()))
        .await
        .unwrap_or_else(|err| panic!("Failed to bootstrap test database: {}", err));
    let mut tx = ctx.db.begin().await.unwrap();
    database::apply_schema(&mut tx).await.unwrap();

    (ctx.db, tx)
}

// Ids well above anything a shared test database is likely to hold
pub const BASE: i32 = 1_900_000_000;

pub struct Seed {
    pub user_id: i32,
    pub restaurant_id: i32,
    pub menu_item_ids: [i32; 2],
    pub order_ids: [i32; 2],
}

pub async fn seed(db: &Database, conn: &mut PgConnection) -> Seed {
    let seed = Seed {
        user_id: BASE + 1,
        restaurant_id: BASE + 1,
        menu_item_ids: [BASE + 1, BASE + 2],
        order_ids: [BASE + 1, BASE + 2],
    };

    db.insert(&schema::STATE)
        .value("id", BASE + 1)
        .value("name", "Lagos")
        .value("code", "LA")
        .execute(&mut *conn)
        .await
        .unwrap();
    db.insert(&schema::CITY)
        .value("id", BASE + 1)
        .value("name", "Ikeja")
        .value("state_id", BASE + 1)
        .execute(&mut *conn)
        .await
        .unwrap();
    db.insert(&schema::USERS)
        .value("id", seed.user_id)
        .value("name", "Ada")
        .value("email", "ada@example.com")
        .execute(&mut *conn)
        .await
        .unwrap();
    db.insert(&schema::RESTAURANT)
        .value("id", seed.restaurant_id)
        .value("name", "Mama Put")
        .value("city_id", BASE + 1)
        .execute(&mut *conn)
        .await
        .unwrap();
    db.insert(&schema::CATEGORY)
        .value("id", BASE + 1)
        .value("name", "Rice")
        .execute(&mut *conn)
        .await
        .unwrap();

    for (i, menu_item_id) in seed.menu_item_ids.iter().enumerate() {
        db.insert(&schema::MENU_ITEM)
            .value("id", *menu_item_id)
            .value("name", format!("Dish {}", i))
            .value("restaurant_id", seed.restaurant_id)
            .value("category_id", BASE + 1)
            .value("price", 1500)
            .value("active", true)
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    for order_id in seed.order_ids {
        db.insert(&schema::ORDERS)
            .value("id", order_id)
            .value("restaurant_id", seed.restaurant_id)
            .value("user_id", seed.user_id)
            .value("price", 3000)
            .value("discount", 0)
            .value("final_price", 3000)
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    seed
}
