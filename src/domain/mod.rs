//! Domain models and types.
//!
//! This module contains the core domain models, types, and business rules of the
//! mapping and submission pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`EpisodeId`], [`ManufacturerId`], [`SubmissionId`])
//! - **Field bag types** ([`FieldKey`], [`FieldValue`], [`SourceFieldBag`])
//! - **Manufacturer profiles** ([`ManufacturerProfile`], [`SourceExpression`], [`TransformRule`])
//! - **Pipeline outputs** ([`MappingResult`], [`SubmissionEpisode`])
//! - **Error types** ([`IvrError`], [`DocuSealError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so an episode id can never be passed where
//! a submission id is expected:
//!
//! ```rust
//! use ivr_mapper::domain::{EpisodeId, SubmissionId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let episode = EpisodeId::new(42)?;
//! let submission = SubmissionId::new("1879")?;
//! # Ok(())
//! # }
//! ```

pub mod clinical;
pub mod errors;
pub mod field;
pub mod ids;
pub mod mapping;
pub mod profile;
pub mod result;
pub mod submission;

// Re-export commonly used types for convenience
pub use clinical::{
    ClinicalSummary, Coverage, EpisodeRecord, FacilityRecord, OrderRecord, OrderedProduct,
    PatientRecord, ProviderRecord,
};
pub use errors::{DocuSealError, IvrError, SubmissionErrorDetail};
pub use field::{FieldKey, FieldValue, SourceFieldBag};
pub use ids::{EpisodeId, ManufacturerId, SubmissionId};
pub use mapping::{
    Candidate, Completeness, FieldMapping, MappingLogEntry, MappingPurpose, MappingResult,
    ResolutionMethod, ValidationReport,
};
pub use profile::{
    BooleanStyle, BusinessRule, CheckboxSpec, DurationUnit, ManufacturerDetail,
    ManufacturerProfile, ManufacturerSummary, Severity, SourceExpression, TargetField,
    TransformRule,
};
pub use result::Result;
pub use submission::{Signer, SubmissionEpisode, SubmissionStatus};
