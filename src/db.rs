use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// The sqlx pool backing a SeaORM connection, used for raw SQL.
pub fn pool_of(conn: &OrmConn) -> DbPool {
    conn.get_postgres_connection_pool().clone()
}

/// Apply the SQL migrations in `migrations/` that have not run yet.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(conn.get_postgres_connection_pool())
        .await?;
    Ok(())
}
