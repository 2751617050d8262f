//! HTTP handlers for all web routes.

pub mod actions;
pub mod articles;
pub mod dashboard;
pub mod export;
pub mod graph;
