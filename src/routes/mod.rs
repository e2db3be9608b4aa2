//! HTTP route handlers

pub mod export;
pub mod health;
pub mod positions;
pub mod stats;
