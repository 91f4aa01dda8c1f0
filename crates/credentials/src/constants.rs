//! Auth endpoint paths, relative to the configured API base URL

/// Exchanges email + password for a token pair
pub const LOGIN_PATH: &str = "/auth/login";

/// Exchanges a refresh token for a new access token
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Revokes the refresh token server-side
pub const LOGOUT_PATH: &str = "/auth/logout";

/// File name used when no credential path is configured
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
