use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use restaurant_management::utils::{
    database::{
        models::{Driver, MenuItem, Order},
        query::Direction,
        schema,
    },
    pagination::Pagination,
};

use crate::{seed, setup, BASE};

#[tokio::test]
#[ignore = "requires database"]
async fn inserted_rows_come_back_typed() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let order: Order = db
        .select(&schema::ORDERS)
        .filter("id", seed.order_ids[0])
        .fetch_optional(&mut *tx)
        .await
        .unwrap()
        .expect("order should exist");

    assert_eq!(order.restaurant_id, Some(seed.restaurant_id));
    assert_eq!(order.final_price, Some(BigDecimal::from(3000)));
    assert_eq!(order.driver_id, None);
    assert!(order.created_at.is_some());
    assert_eq!(order.created_at, order.updated_at);
}

#[tokio::test]
#[ignore = "requires database"]
async fn returning_gives_back_the_new_row() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let driver: Driver = db
        .insert(&schema::DRIVER)
        .value("id", BASE + 7)
        .value("user_id", seed.user_id)
        .value("car_year", 2019)
        .returning(&mut *tx)
        .await
        .unwrap();

    assert_eq!(driver.id, BASE + 7);
    assert_eq!(driver.car_year, Some(2019));
    assert_eq!(driver.online, None);
    assert_eq!(driver.delivering, None);
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_changes_only_matching_rows() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let updated = db
        .update(&schema::MENU_ITEM)
        .set("price", BigDecimal::from_str("1999.99").unwrap())
        .set("active", false)
        .filter("id", seed.menu_item_ids[1])
        .execute(&mut *tx)
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let items: Vec<MenuItem> = db
        .select(&schema::MENU_ITEM)
        .filter("restaurant_id", seed.restaurant_id)
        .order_by("id", Direction::Asc)
        .fetch_all(&mut *tx)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].price, Some(BigDecimal::from(1500)));
    assert_eq!(items[0].active, Some(true));
    assert_eq!(items[1].price, Some(BigDecimal::from_str("1999.99").unwrap()));
    assert_eq!(items[1].active, Some(false));
}

#[tokio::test]
#[ignore = "requires database"]
async fn pages_report_the_full_total() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let page = db
        .select(&schema::ORDERS)
        .filter("user_id", seed.user_id)
        .order_by("id", Direction::Desc)
        .fetch_page::<Order>(&mut tx, &Pagination { page: 1, per_page: 1 })
        .await
        .unwrap();

    assert_eq!(page.meta.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, seed.order_ids[1]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn explicit_dates_are_kept() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;
    let eta = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap();

    db.update(&schema::ORDERS)
        .set("estimated_delivery_time", eta)
        .filter("id", seed.order_ids[0])
        .execute(&mut *tx)
        .await
        .unwrap();

    let order: Order = db
        .select(&schema::ORDERS)
        .filter("estimated_delivery_time", eta)
        .fetch_optional(&mut *tx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.id, seed.order_ids[0]);
}
