//! Shared library for the WMTR water-meter reading service
//!
//! Holds the pieces both the API binary and its tests need: the error
//! taxonomy, configuration loading, and database initialization/models.

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
