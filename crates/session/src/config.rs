//! Session manager configuration

/// Session manager configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seconds before expiry at which a held token becomes due for
    /// refresh. Boundary inclusive: `exp - now <= window` is due.
    pub refresh_window_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_window_secs: 5 * 60,
        }
    }
}

impl SessionConfig {
    /// Create session config from environment variables, falling back to
    /// the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let refresh_window_secs = std::env::var("BLOODBANK_REFRESH_WINDOW_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(5 * 60);

        Self {
            refresh_window_secs,
        }
    }
}
