//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: The dataset could not be fetched or decoded, or output failed
//! - 2: Configuration, catalog or usage error

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Dataset fetch failure or other runtime error
pub const EXIT_FETCH_ERROR: i32 = 1;

/// Configuration or catalog error
pub const EXIT_CONFIG_ERROR: i32 = 2;
