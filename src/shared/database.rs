use std::sync::Arc;

use sqlx::MySqlPool;
use tracing::info;

use crate::shared::models::DatabaseError;

/// Connect to MySQL and bring the schema up to date.
pub async fn init_database(database_url: &str) -> Result<Arc<MySqlPool>, DatabaseError> {
    tracing::info!("Initializing database connection");

    let db = Arc::new(MySqlPool::connect(database_url).await.map_err(|e| {
        tracing::error!("Failed to connect to database: {}", e);
        DatabaseError::from(e)
    })?);

    info!("Database connected, running migrations");

    sqlx::migrate!("./db/migrations").run(&*db).await?;

    info!("Database migrations completed");

    Ok(db)
}
