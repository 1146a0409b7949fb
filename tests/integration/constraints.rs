use restaurant_management::utils::database::{query::Error, schema};

use crate::{seed, setup, BASE};

#[tokio::test]
#[ignore = "requires database"]
async fn order_menu_item_links_many_orders_to_many_items() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let links = [
        (BASE + 1, seed.order_ids[0], seed.menu_item_ids[0]),
        (BASE + 2, seed.order_ids[1], seed.menu_item_ids[0]),
        (BASE + 3, seed.order_ids[0], seed.menu_item_ids[1]),
    ];
    for (id, order_id, menu_item_id) in links {
        db.insert(&schema::ORDER_MENU_ITEM)
            .value("id", id)
            .value("order_id", order_id)
            .value("menu_item_id", menu_item_id)
            .value("quantity", 1)
            .execute(&mut *tx)
            .await
            .unwrap();
    }

    let orders_with_first_item = db
        .select(&schema::ORDER_MENU_ITEM)
        .filter("menu_item_id", seed.menu_item_ids[0])
        .count(&mut *tx)
        .await
        .unwrap();
    let items_in_first_order = db
        .select(&schema::ORDER_MENU_ITEM)
        .filter("order_id", seed.order_ids[0])
        .count(&mut *tx)
        .await
        .unwrap();

    assert_eq!(orders_with_first_item, 2);
    assert_eq!(items_in_first_order, 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn order_for_missing_restaurant_is_rejected() {
    let (db, mut tx) = setup().await;

    let err = db
        .insert(&schema::ORDERS)
        .value("id", BASE + 50)
        .value("restaurant_id", BASE + 999)
        .execute(&mut *tx)
        .await
        .unwrap_err();

    match err {
        Error::ForeignKeyViolation { constraint } => {
            assert_eq!(constraint, "orders_restaurant_id_restaurant_id_fk")
        }
        other => panic!("expected a foreign key violation, got {}", other),
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn second_driver_for_same_user_is_rejected() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    db.insert(&schema::DRIVER)
        .value("id", BASE + 1)
        .value("user_id", seed.user_id)
        .value("car_make", "Toyota")
        .execute(&mut *tx)
        .await
        .unwrap();

    let err = db
        .insert(&schema::DRIVER)
        .value("id", BASE + 2)
        .value("user_id", seed.user_id)
        .execute(&mut *tx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UniqueViolation { ref constraint } if constraint == "driver_user_id_unique"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn deleting_an_order_removes_its_items_and_statuses() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    db.insert(&schema::STATUS_CATALOG)
        .value("id", BASE + 1)
        .value("name", "PLACED")
        .execute(&mut *tx)
        .await
        .unwrap();
    db.insert(&schema::ORDER_STATUS)
        .value("id", BASE + 1)
        .value("order_id", seed.order_ids[0])
        .value("status_catalog_id", BASE + 1)
        .execute(&mut *tx)
        .await
        .unwrap();
    db.insert(&schema::ORDER_MENU_ITEM)
        .value("id", BASE + 1)
        .value("order_id", seed.order_ids[0])
        .value("menu_item_id", seed.menu_item_ids[0])
        .execute(&mut *tx)
        .await
        .unwrap();

    let deleted = db
        .delete(&schema::ORDERS)
        .filter("id", seed.order_ids[0])
        .execute(&mut *tx)
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    for table in [&schema::ORDER_STATUS, &schema::ORDER_MENU_ITEM] {
        let remaining = db
            .select(table)
            .filter("order_id", seed.order_ids[0])
            .count(&mut *tx)
            .await
            .unwrap();
        assert_eq!(remaining, 0, "{}", table.name);
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn restaurant_with_orders_cannot_be_deleted() {
    let (db, mut tx) = setup().await;
    let seed = seed(&db, &mut tx).await;

    let err = db
        .delete(&schema::RESTAURANT)
        .filter("id", seed.restaurant_id)
        .execute(&mut *tx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ForeignKeyViolation { .. }));
}
