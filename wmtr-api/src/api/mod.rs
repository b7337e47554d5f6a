//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod readings;

pub use auth::{auth_middleware, UserId};
pub use health::health_routes;
pub use readings::{correct_reading, list_readings, read_meter};
