use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::env;

// Alias para no escribir "Pool<Postgres>" en todos lados
pub type DbPool = Pool<Postgres>;

pub async fn init_db() -> DbPool {
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL no está definido en .env");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Error al conectar a la Base de Datos. ¿Está corriendo Postgres?");

    // El esquema vive en migrations/ y se aplica al arrancar
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Error al aplicar las migraciones");

    pool
}
