//! Runtime settings loaded via OrthoConfig, plus the derived server config.
//!
//! Every setting reads from `VOUCHER_*` environment variables, a config
//! file, or command-line flags. The idempotency TTL is read separately from
//! `VOUCHER_IDEMPOTENCY_TTL_HOURS` by the domain configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;

use voucher_backend::domain::{DEFAULT_MAX_DISTANCE_METERS, DEFAULT_QR_TTL_SECS, QrRedemptionConfig};
use voucher_backend::inbound::http::session_config::SessionToggles;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 60;

/// Settings for the voucher backend process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "VOUCHER")]
pub struct VoucherSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Largest number of pooled database connections.
    pub db_pool_max_size: Option<u32>,
    /// Redis URL for shared rate limit counters; memory is used when unset.
    pub redis_url: Option<String>,
    /// Path to the cookie signing key.
    pub session_key_file: Option<PathBuf>,
    /// Whether session cookies carry the `Secure` flag.
    pub session_cookie_secure: Option<bool>,
    /// `SameSite` policy for session cookies.
    pub session_same_site: Option<String>,
    /// Permit a generated session key when the key file is unreadable.
    pub session_allow_ephemeral: Option<bool>,
    /// Lifetime of issued QR codes in seconds.
    pub qr_token_ttl_secs: Option<u32>,
    /// Furthest a QR scan may be from the offer's place, in metres.
    pub max_distance_meters: Option<f64>,
    /// Seconds between maintenance sweeps.
    pub maintenance_interval_secs: Option<u64>,
}

/// Invalid settings detected before start-up.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `bind_addr` is not a socket address.
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// No database URL was configured.
    #[error("VOUCHER_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    /// A numeric setting is outside its accepted range.
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },
}

impl VoucherSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns [`SettingsError::BindAddr`] for a malformed address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Configured database URL.
    ///
    /// # Errors
    /// Returns [`SettingsError::MissingDatabaseUrl`] when unset.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Configured Redis URL, treating an empty value as unset.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Token lifetime and proximity limit for QR redemption.
    ///
    /// # Errors
    /// Returns [`SettingsError::NotPositive`] for a zero TTL or a
    /// non-positive distance.
    pub fn qr_config(&self) -> Result<QrRedemptionConfig, SettingsError> {
        let token_ttl_secs = self.qr_token_ttl_secs.unwrap_or(DEFAULT_QR_TTL_SECS);
        if token_ttl_secs == 0 {
            return Err(SettingsError::NotPositive {
                name: "qr_token_ttl_secs",
            });
        }
        let max_distance_meters = self
            .max_distance_meters
            .unwrap_or(DEFAULT_MAX_DISTANCE_METERS);
        if !max_distance_meters.is_finite() || max_distance_meters <= 0.0 {
            return Err(SettingsError::NotPositive {
                name: "max_distance_meters",
            });
        }
        Ok(QrRedemptionConfig {
            token_ttl_secs,
            max_distance_meters,
        })
    }

    /// Interval between maintenance sweeps.
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(
            self.maintenance_interval_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_MAINTENANCE_INTERVAL_SECS),
        )
    }

    /// Session toggles for validation.
    pub fn session_toggles(&self) -> SessionToggles {
        SessionToggles {
            key_file: self.session_key_file.clone(),
            cookie_secure: self.session_cookie_secure,
            same_site: self.session_same_site.clone(),
            allow_ephemeral: self.session_allow_ephemeral,
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Construct a server configuration from validated session settings.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
        }
    }
}
