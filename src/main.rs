use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod game;
mod http;
mod model;
mod room;
mod store;
mod telemetry;
mod user;
mod util;
mod ws;

use crate::http::routes::{self, AppState};
use crate::store::Store;
use crate::ws::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let store = Store::connect(&config::redis_url()).await?;
    let hub = Arc::new(Hub::new());
    let state = AppState { store, hub };

    let app = Router::new()
        .route("/", get(routes::healthz))
        .route("/users", post(routes::create_user))
        .route("/users/:user_id", get(routes::get_user))
        .route("/rooms", post(routes::create_room))
        .route("/rooms/:code/join", post(routes::join_room))
        .route("/rooms/:code/leave", post(routes::leave_room))
        .route("/ws", get(ws::connection::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = config::server_addr();
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
