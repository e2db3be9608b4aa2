//! satlog library exports

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod source;
pub mod state;
pub mod store;
pub mod tasks;
