//! Result type alias for PLUTO operations

use crate::error::PlutoError;

/// Standard Result type for PLUTO operations
pub type Result<T> = std::result::Result<T, PlutoError>;
