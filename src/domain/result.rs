//! Result type alias
//!
//! This module provides a convenient Result type alias that uses IvrError
//! as the error type.

use super::errors::IvrError;

/// Result type alias for pipeline operations
///
/// # Examples
///
/// ```
/// use ivr_mapper::domain::result::Result;
/// use ivr_mapper::domain::errors::IvrError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(IvrError::MalformedInput("episode id must be numeric".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, IvrError>;
