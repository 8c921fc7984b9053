// HTTP server setup (Axum, JSON RPC)
pub mod app;
pub mod error;
pub mod middleware;
pub mod routes;

pub use app::*;
