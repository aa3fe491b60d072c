use std::sync::Arc;
use warp::Filter;

use super::websocket;
use crate::session::SessionServer;

/// `/ws` upgrades to the game session protocol
pub fn session_websocket_route(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_server(server))
        .map(|ws: warp::ws::Ws, server: Arc<SessionServer>| {
            ws.on_upgrade(move |socket| websocket::handle_session_websocket(socket, server))
        })
}

pub fn health_check(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server(server))
        .then(|server: Arc<SessionServer>| async move {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Gang Up Server",
                "version": env!("CARGO_PKG_VERSION"),
                "rooms": server.room_count().await,
            }))
        })
}

/// Websocket and health routes; static client assets are added by the binary
pub fn session_routes(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    session_websocket_route(server.clone()).or(health_check(server))
}

fn with_server(
    server: Arc<SessionServer>,
) -> impl Filter<Extract = (Arc<SessionServer>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || server.clone())
}
