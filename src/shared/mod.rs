pub mod config;
pub mod database;
pub mod logging;
pub mod models;

pub use database::init_database;
pub use models::AppState;
