//! Persistence of submission episodes and the mapping log
//!
//! - [`InMemoryStorage`] - process-local, the default backend
//! - [`PostgreSQLStorage`] - pooled PostgreSQL with an embedded migration
//!
//! Use [`create_storage`] to build the configured backend.

pub mod factory;
pub mod memory;
pub mod postgresql;
pub mod traits;

pub use factory::{create_storage, Storage};
pub use memory::InMemoryStorage;
pub use postgresql::{PostgreSQLClient, PostgreSQLStorage};
pub use traits::{InsertOutcome, MappingLogStore, SubmissionFilter, SubmissionStore};
