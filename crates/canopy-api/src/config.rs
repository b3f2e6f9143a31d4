//! Server configuration.
//!
//! Configuration is loaded from `CANOPY_*` environment variables. In debug
//! mode the in-memory store and header-based identity are allowed; in
//! production a JWT secret is required so bearer tokens can be verified.

use serde::{Deserialize, Serialize};

use canopy_core::error::{Error, Result};

/// JWT verification configuration.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtConfig {
    /// HS256 shared secret for bearer-token verification.
    #[serde(default)]
    pub hs256_secret: Option<String>,
    /// Expected `iss` claim, when set.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected `aud` claim, when set.
    #[serde(default)]
    pub audience: Option<String>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("hs256_secret", &self.hs256_secret.as_ref().map(|_| "[REDACTED]"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin; empty disables CORS.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Debug mode: enables header-based identity and the in-memory store.
    pub debug: bool,
    /// HTTP listen port.
    pub http_port: u16,
    /// Path to the SQLite database file. When unset, the in-memory store is
    /// used (debug only).
    pub database_path: Option<String>,
    /// JWT verification settings.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: true,
            http_port: 8080,
            database_path: None,
            jwt: JwtConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `CANOPY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unparseable, or if the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        let debug = env_bool("CANOPY_DEBUG")?.unwrap_or(false);
        let http_port = match std::env::var("CANOPY_HTTP_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                Error::validation(format!("CANOPY_HTTP_PORT '{raw}' is not a valid port"))
            })?,
            Err(_) => 8080,
        };

        let cors = CorsConfig {
            allowed_origins: match std::env::var("CANOPY_CORS_ALLOWED_ORIGINS") {
                Ok(raw) => raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                Err(_) => CorsConfig::default().allowed_origins,
            },
            max_age_seconds: match std::env::var("CANOPY_CORS_MAX_AGE_SECONDS") {
                Ok(raw) => raw.parse().map_err(|_| {
                    Error::validation(format!(
                        "CANOPY_CORS_MAX_AGE_SECONDS '{raw}' is not a valid duration"
                    ))
                })?,
                Err(_) => CorsConfig::default().max_age_seconds,
            },
        };

        let config = Self {
            debug,
            http_port,
            database_path: std::env::var("CANOPY_DATABASE_PATH").ok(),
            jwt: JwtConfig {
                hs256_secret: std::env::var("CANOPY_JWT_SECRET").ok(),
                issuer: std::env::var("CANOPY_JWT_ISSUER").ok(),
                audience: std::env::var("CANOPY_JWT_AUDIENCE").ok(),
            },
            cors,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when production mode lacks a JWT secret or a
    /// database path.
    pub fn validate(&self) -> Result<()> {
        if !self.debug && self.jwt.hs256_secret.is_none() {
            return Err(Error::validation(
                "CANOPY_JWT_SECRET is required when CANOPY_DEBUG=false",
            ));
        }
        if !self.debug && self.database_path.is_none() {
            return Err(Error::validation(
                "CANOPY_DATABASE_PATH is required when CANOPY_DEBUG=false",
            ));
        }
        Ok(())
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(Error::validation(format!(
                "{name} '{raw}' is not a valid boolean"
            ))),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_requires_jwt_secret() {
        let config = Config {
            debug: false,
            database_path: Some("/var/lib/canopy/canopy.db".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_requires_database_path() {
        let config = Config {
            debug: false,
            jwt: JwtConfig {
                hs256_secret: Some("secret".to_string()),
                ..JwtConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn jwt_secret_is_redacted_in_debug_output() {
        let config = JwtConfig {
            hs256_secret: Some("super-secret".to_string()),
            ..JwtConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
