//! Request context extraction and identity resolution.
//!
//! Identity is optional on every `/trees` route: a missing, malformed, or
//! invalid credential resolves to [`Identity::Anonymous`] rather than
//! rejecting the request. This backward-compatibility policy keeps legacy
//! unauthenticated clients working; downstream rules (attribution,
//! achievement eligibility, ownership) branch on the resolved variant.
//!
//! In production, identity comes from a verified HS256 JWT with `sub`,
//! `name`, and optional `graduation` claims. In debug mode the
//! `X-Planter-Id` / `X-Planter-Name` / `X-Graduation-Year` headers stand in
//! for a token during local development.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use ulid::Ulid;

use canopy_core::id::PlanterId;
use canopy_core::model::{Identity, Planter};

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context: correlation ID plus the resolved identity.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The resolved caller identity. `Anonymous` when no valid credential
    /// was presented.
    pub identity: Identity,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            request_id_from_headers(headers).unwrap_or_else(|| Ulid::new().to_string());

        let identity = resolve_identity(headers, state);

        let ctx = Self {
            identity,
            request_id,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

/// Resolves the caller identity from request headers.
///
/// Never fails: every resolution problem (absent credential, bad token,
/// missing server-side secret) collapses to `Anonymous` and is logged.
fn resolve_identity(headers: &HeaderMap, state: &AppState) -> Identity {
    if state.config.debug {
        if let Some(identity) = identity_from_debug_headers(headers) {
            return identity;
        }
    }

    let Some(token) = bearer_token(headers) else {
        return Identity::Anonymous;
    };

    match verify_token(&token, &state.config.jwt) {
        Ok(planter) => Identity::Planter(planter),
        Err(reason) => {
            tracing::debug!(reason, "bearer token did not resolve; treating as anonymous");
            Identity::Anonymous
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    name: Option<String>,
    graduation: Option<i32>,
}

fn verify_token(token: &str, jwt: &JwtConfig) -> Result<Planter, &'static str> {
    let Some(secret) = jwt.hs256_secret.as_deref() else {
        return Err("no JWT secret configured");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    if let Some(iss) = jwt.issuer.as_deref() {
        validation.set_issuer(&[iss]);
    }
    if let Some(aud) = jwt.audience.as_deref() {
        validation.set_audience(&[aud]);
    } else {
        validation.validate_aud = false;
    }

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| "token verification failed")?;

    let claims = data.claims;
    let id = PlanterId::new(&claims.sub).map_err(|_| "empty sub claim")?;
    let name = claims
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| claims.sub.clone());

    Ok(Planter {
        id,
        name,
        graduation_year: claims.graduation,
    })
}

/// Debug-mode identity from headers (local development only).
fn identity_from_debug_headers(headers: &HeaderMap) -> Option<Identity> {
    let raw_id = header_string(headers, "X-Planter-Id")?;
    let Ok(id) = PlanterId::new(&raw_id) else {
        tracing::debug!("blank X-Planter-Id header; treating as anonymous");
        return Some(Identity::Anonymous);
    };

    let name = header_string(headers, "X-Planter-Name").unwrap_or_else(|| raw_id.clone());
    let graduation_year =
        header_string(headers, "X-Graduation-Year").and_then(|raw| raw.parse().ok());

    Some(Identity::Planter(Planter {
        id,
        name,
        graduation_year,
    }))
}

fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    header_string(headers, "X-Request-Id").or_else(|| header_string(headers, "X-Request-ID"))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(header_value_to_string)
}

fn header_value_to_string(value: &HeaderValue) -> Option<String> {
    value.to_str().ok().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        name: String,
        graduation: Option<i32>,
        exp: i64,
    }

    fn token(secret: &str, sub: &str) -> String {
        let claims = TestClaims {
            sub: sub.to_string(),
            name: "Jane".to_string(),
            graduation: Some(2019),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn jwt_config(secret: &str) -> JwtConfig {
        JwtConfig {
            hs256_secret: Some(secret.to_string()),
            ..JwtConfig::default()
        }
    }

    #[test]
    fn valid_token_resolves_a_planter() {
        let planter = verify_token(&token("s3cret", "jane-1"), &jwt_config("s3cret")).unwrap();
        assert_eq!(planter.id.as_str(), "jane-1");
        assert_eq!(planter.name, "Jane");
        assert_eq!(planter.graduation_year, Some(2019));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        assert!(verify_token(&token("s3cret", "jane-1"), &jwt_config("other")).is_err());
    }

    #[test]
    fn missing_secret_is_rejected() {
        assert!(verify_token(&token("s3cret", "jane-1"), &JwtConfig::default()).is_err());
    }

    #[test]
    fn debug_headers_resolve_a_planter() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Planter-Id", HeaderValue::from_static("jane-1"));
        headers.insert("X-Graduation-Year", HeaderValue::from_static("2019"));

        let identity = identity_from_debug_headers(&headers).unwrap();
        let planter = identity.planter().unwrap();
        assert_eq!(planter.id.as_str(), "jane-1");
        assert_eq!(planter.name, "jane-1");
        assert_eq!(planter.graduation_year, Some(2019));
    }

    #[test]
    fn absent_debug_headers_defer_to_token_resolution() {
        assert!(identity_from_debug_headers(&HeaderMap::new()).is_none());
    }
}
