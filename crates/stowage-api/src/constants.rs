/// API version segment used in routes and documentation.
pub const API_VERSION: &str = "v0";

/// Path prefix for all versioned endpoints.
pub const API_PREFIX: &str = "/api/v0";
