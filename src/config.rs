//! Process-wide configuration.
//!
//! Loaded once at startup and read-only afterwards; the values are handed to
//! [`crate::ticket::service::TicketService`] at construction time.

use std::env;
use std::time::Duration;

use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::share::markers::MarkerBorder;

/// Default signing secret for local development.
pub const DEV_SIGNING_SECRET: &str = "dev-secret-change-me";
/// Default ticket lifetime.
pub const DEFAULT_TICKET_TTL: Duration = Duration::from_secs(86_400);
/// Default per-code debounce window between verification attempts.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(3);

/// HMAC signing key; wiped on drop and never printed
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Zeroizing::new(secret.as_ref().to_vec()))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Ticket service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Payload signing key
    pub signing_secret: SigningSecret,
    /// Lifetime of a freshly issued ticket
    pub ticket_ttl: Duration,
    /// Minimum spacing between verification attempts for one check-in code
    pub rate_limit_window: Duration,
    /// Fiducial border stamped on both shares (`None` disables it)
    pub marker_border: Option<MarkerBorder>,
}

impl Config {
    /// Configuration with the given secret and default timings
    pub fn new(signing_secret: SigningSecret) -> Self {
        Self {
            signing_secret,
            ticket_ttl: DEFAULT_TICKET_TTL,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            marker_border: Some(MarkerBorder::default()),
        }
    }

    /// Read `SIGNING_SECRET`, `TICKET_TTL_SECONDS` and `RATE_LIMIT_WINDOW`
    pub fn from_env() -> Result<Self> {
        let signing_secret = match env::var("SIGNING_SECRET") {
            Ok(value) if !value.is_empty() => SigningSecret::new(value),
            _ => {
                warn!("SIGNING_SECRET not set, using the development secret");
                SigningSecret::new(DEV_SIGNING_SECRET)
            }
        };

        let mut config = Self::new(signing_secret);
        if let Some(ttl) = seconds_from_env("TICKET_TTL_SECONDS")? {
            config.ticket_ttl = ttl;
        }
        if let Some(window) = seconds_from_env("RATE_LIMIT_WINDOW")? {
            config.rate_limit_window = window;
        }
        Ok(config)
    }

    pub fn with_ticket_ttl(mut self, ttl: Duration) -> Self {
        self.ticket_ttl = ttl;
        self
    }

    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    pub fn with_marker_border(mut self, border: Option<MarkerBorder>) -> Self {
        self.marker_border = border;
        self
    }
}

fn seconds_from_env(key: &str) -> Result<Option<Duration>> {
    match env::var(key) {
        Ok(value) => parse_seconds(key, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            Error::Config(format!(
                "{key} must be a whole number of seconds, got {value:?}"
            ))
        })
}
