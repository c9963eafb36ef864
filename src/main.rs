mod db;
mod handlers;
mod models;
mod routes;
mod state;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;
use crate::utils::media::HttpMedia;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Si falta el secreto, mejor morir ahora que en el primer login
    std::env::var("JWT_SECRET").expect("JWT_SECRET debe estar en .env");

    let pool = db::init_db().await;
    tracing::info!("✅ Conexión a Postgres exitosa");

    let state = AppState {
        pool,
        media: Arc::new(HttpMedia::from_env()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Las portadas viajan en base64 dentro del JSON: subimos el límite del body
    let app = routes::create_routes(state)
        .layer(axum::extract::DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors);

    let puerto = std::env::var("PORT").unwrap_or("5000".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", puerto)
        .parse()
        .expect("Dirección IP/Puerto inválido");

    tracing::info!("🚀 API del blog corriendo en http://{}", addr);

    let listener = TcpListener::bind(addr).await.expect("Fallo al enlazar el puerto");
    axum::serve(listener, app).await.unwrap();
}
