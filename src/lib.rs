// IVR Mapper - Manufacturer field mapping and IVR submission pipeline
// Copyright (c) 2025 IVR Mapper Contributors
// Licensed under the MIT License

//! # IVR Mapper
//!
//! IVR Mapper turns the clinical record of a wound-care episode into the
//! Insurance Verification Request form a wound-product manufacturer expects,
//! and drives that form through DocuSeal for signature.
//!
//! ## Overview
//!
//! - **Extracting** patient, provider, facility, wound and order data into a
//!   flat bag of source fields
//! - **Matching** each manufacturer target field to a source field, exactly,
//!   by composition, fuzzily or through an optional ML service
//! - **Transforming** values into the manufacturer's formats (dates, phones,
//!   checkboxes, durations)
//! - **Validating** required fields, formats and manufacturer business rules
//! - **Submitting** the prefilled form to DocuSeal and tracking its status
//!   through webhooks
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`api`] - HTTP API served by `ivr-mapper serve`
//! - [`core`] - Business logic (extraction, matching, mapping, submissions)
//! - [`adapters`] - External integrations (clinical records, DocuSeal, ML, storage)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration and the manufacturer catalog
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ivr_mapper::cli::commands::build_services;
//! use ivr_mapper::config::load_config;
//! use ivr_mapper::domain::{EpisodeId, SourceFieldBag};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("ivr-mapper.toml")?;
//!     let services = build_services(&config).await?;
//!
//!     let episode = EpisodeId::new(1001)?;
//!     let outcome = services
//!         .gateway
//!         .create_or_update(episode, "acz-associates", &SourceFieldBag::new())
//!         .await?;
//!
//!     println!("Submission {} is {}", outcome.submission.id, outcome.ivr_episode.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`], whose error type is
//! [`domain::IvrError`]. DocuSeal failures keep their HTTP classification in
//! [`domain::DocuSealError`] and are wrapped with episode and manufacturer
//! context before they leave the submission gateway.
//!
//! ## Logging
//!
//! Logging uses the `tracing` crate with JSON output; see [`logging`].

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
