//! HTTP API handlers for lyra-annotate

pub mod annotate;
pub mod health;

pub use annotate::annotate_routes;
pub use health::health_routes;
