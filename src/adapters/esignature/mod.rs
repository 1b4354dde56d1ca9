//! E-signature adapters
//!
//! The gateway talks to the signing service through [`SignatureService`];
//! [`DocuSealClient`] is the production implementation.

pub mod docuseal;
pub mod traits;

pub use docuseal::DocuSealClient;
pub use traits::{PrefillField, RemoteSubmission, SignatureService, SubmissionRequest};

use crate::config::DocuSealConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Creates the signature service for the configured backend
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn create_signature_service(config: &DocuSealConfig) -> Result<Arc<dyn SignatureService>> {
    tracing::info!(base_url = %config.base_url, "Creating DocuSeal client");
    Ok(Arc::new(DocuSealClient::new(config)?))
}
