use std::time::Duration;

use restaurant_management::{types, utils::database};

use crate::{database_url, setup, test_config};

#[tokio::test]
async fn invalid_connection_string_is_reported_not_raised() {
    let result = types::bootstrap(test_config(String::from("postgres//missing-colon"))).await;
    assert!(matches!(result, Err(database::Error::Connect(_))));
}

#[tokio::test]
#[ignore = "requires database"]
async fn valid_connection_is_usable_within_bounded_time() {
    let ctx = tokio::time::timeout(
        Duration::from_secs(10),
        types::bootstrap(test_config(database_url())),
    )
    .await
    .expect("bootstrap timed out")
    .unwrap_or_else(|err| panic!("{}", err));

    let (one,): (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(&ctx.db.conn.pool)
        .await
        .unwrap();
    assert_eq!(one, 1);

    ctx.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn applied_schema_verifies_complete() {
    let (_db, mut tx) = setup().await;

    let report = database::verify(&mut *tx).await.unwrap();
    assert!(report.is_complete(), "{:?}", report);
}

#[tokio::test]
#[ignore = "requires database"]
async fn applying_schema_twice_is_harmless() {
    let (_db, mut tx) = setup().await;

    database::apply_schema(&mut tx).await.unwrap();
}
