pub mod database;
pub mod pagination;
