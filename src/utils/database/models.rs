use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: Option<String>,
    pub contact_phone: Option<String>,
    pub phone_verified: Option<bool>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub confirmation_code: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct State {
    pub id: i32,
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct StatusCatalog {
    pub id: i32,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct City {
    pub id: i32,
    pub name: Option<String>,
    pub state_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Address {
    pub id: i32,
    pub street_address_1: Option<String>,
    pub street_address_2: Option<String>,
    pub zip_code: Option<String>,
    pub delivery_instructions: Option<String>,
    pub user_id: Option<i32>,
    pub city_id: Option<i32>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Restaurant {
    pub id: i32,
    pub name: Option<String>,
    pub street_address: Option<String>,
    pub zip_code: Option<String>,
    pub city_id: Option<i32>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct RestaurantOwner {
    pub id: i32,
    pub restaurant_id: Option<i32>,
    pub owner_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Driver {
    pub id: i32,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub car_year: Option<i32>,
    pub user_id: Option<i32>,
    pub online: Option<bool>,
    pub delivering: Option<bool>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct MenuItem {
    pub id: i32,
    pub name: Option<String>,
    pub restaurant_id: Option<i32>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub price: Option<BigDecimal>,
    pub active: Option<bool>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Order {
    pub id: i32,
    pub restaurant_id: Option<i32>,
    pub estimated_delivery_time: Option<NaiveDate>,
    pub actual_delivery_time: Option<NaiveDate>,
    pub delivery_address_id: Option<i32>,
    pub user_id: Option<i32>,
    pub driver_id: Option<i32>,
    pub price: Option<BigDecimal>,
    pub discount: Option<BigDecimal>,
    pub final_price: Option<BigDecimal>,
    pub comment: Option<String>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct OrderMenuItem {
    pub id: i32,
    pub order_id: Option<i32>,
    pub menu_item_id: Option<i32>,
    pub quantity: Option<i32>,
    pub item_price: Option<BigDecimal>,
    pub price: Option<BigDecimal>,
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct OrderStatus {
    pub id: i32,
    pub order_id: Option<i32>,
    pub status_catalog_id: Option<i32>,
    pub created_at: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: i32,
    pub order_id: Option<i32>,
    pub user_id: Option<i32>,
    pub comment_text: Option<String>,
    pub is_complaint: Option<bool>,
    pub is_praise: Option<bool>,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}
