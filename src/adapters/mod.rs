//! External system integrations for IVR Mapper.
//!
//! - [`clinical`] - clinical record providers (in-memory, JSON fixture)
//! - [`esignature`] - e-signature service abstraction and DocuSeal client
//! - [`ml`] - optional remote field predictor
//! - [`storage`] - submission and mapping log persistence (in-memory, PostgreSQL)
//!
//! # Design Pattern
//!
//! Every external system sits behind a trait so the pipeline can be tested
//! with in-memory implementations. Factories pick the implementation from
//! configuration and hand it out as `Arc<dyn Trait>`.
//!
//! ```rust,no_run
//! use ivr_mapper::adapters::esignature::create_signature_service;
//! use ivr_mapper::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ivr-mapper.toml")?;
//! let docuseal = create_signature_service(&config.docuseal)?;
//! # Ok(())
//! # }
//! ```

pub mod clinical;
pub mod esignature;
pub mod ml;
pub mod storage;
