//! Core business logic for IVR Mapper.
//!
//! # Modules
//!
//! - [`extract`] - flattening clinical records into a source field bag
//! - [`matching`] - resolving target fields from the bag
//! - [`transform`] - formatting resolved values for the form
//! - [`validate`] - required fields, business rules and format checks
//! - [`mapping`] - the mapping pipeline for one episode and manufacturer
//! - [`submission`] - e-signature submissions and their callbacks
//! - [`analytics`] - submission statistics
//! - [`batch`] - per-item outcome accounting for batch operations
//!
//! # Mapping Workflow
//!
//! 1. **Extract**: read the episode and its linked records
//! 2. **Match**: resolve every target field of the manufacturer profile
//! 3. **Transform**: apply the field's formatting rule
//! 4. **Validate**: report errors and warnings
//! 5. **Score**: compute completeness
//! 6. **Submit** (optional): create or update the DocuSeal submission
//!
//! # Example
//!
//! ```rust,no_run
//! use ivr_mapper::cli::commands::build_services;
//! use ivr_mapper::config::load_config;
//! use ivr_mapper::domain::{EpisodeId, SourceFieldBag};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ivr-mapper.toml")?;
//! let services = build_services(&config).await?;
//!
//! let episode_id = EpisodeId::new(42)?;
//! let result = services
//!     .mapping
//!     .map_episode(episode_id, "acz-associates", &SourceFieldBag::new())
//!     .await?;
//!
//! println!("Completeness: {}%", result.completeness.percentage);
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod batch;
pub mod extract;
pub mod mapping;
pub mod matching;
pub mod submission;
pub mod transform;
pub mod validate;
