//! geoveil-server: HTTP front end for the polygon encryption pipeline
//!
//! Accepts GeoJSON feature collections, runs each polygon through
//! [`geoveil_core::Pipeline`] and returns the encrypted collection.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::JwtVerifier;
pub use config::ServerConfig;
pub use error::ServerError;
pub use routes::create_router;
pub use server::{GeoveilServer, ServerBuilder};
pub use state::AppState;
