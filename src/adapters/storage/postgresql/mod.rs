//! PostgreSQL storage integration
//!
//! Submission episodes and the mapping log live in two tables created by
//! `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLStorage;
pub use client::PostgreSQLClient;
