//! Bearer Token Middleware
//!
//! Protected routes require `Authorization: Bearer <token>` matching the
//! configured shared token. An empty configured token disables the check.
//!
//! - missing header → 401 `UNAUTHORIZED`
//! - wrong scheme or token → 401 `INVALID_TOKEN`

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Shared state for the auth middleware. `Debug` never prints the token.
#[derive(Debug, Clone)]
pub struct AuthState {
    token: Arc<SecretString>,
}

impl AuthState {
    pub fn new(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self::from_secret(SecretString::new(token.into()))
    }

    pub fn from_secret(token: SecretString) -> Self {
        Self {
            token: Arc::new(token),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.expose_secret().is_empty()
    }

    /// Check an `Authorization` header value against the configured token.
    pub fn check(&self, header: Option<&str>) -> Result<(), ApiError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let value = header.ok_or_else(|| {
            ApiError::unauthorized("Authentication required: provide Authorization header")
        })?;
        let token = value.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::invalid_token("Authorization header must use Bearer scheme")
        })?;
        if constant_time_eq(token.trim().as_bytes(), self.token.expose_secret().as_bytes()) {
            Ok(())
        } else {
            Err(ApiError::invalid_token("Invalid bearer token"))
        }
    }
}

/// Compares two byte slices in constant time.
///
/// Slices of different length compare unequal without inspecting contents,
/// so only the configured token's length is observable.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Axum middleware rejecting requests without the shared bearer token.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    if let Err(err) = state.check(header) {
        tracing::debug!(code = %err.code, path = %request.uri().path(), "request rejected");
        return Err(err);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_empty_token_disables_auth() {
        let state = AuthState::new("");
        assert!(!state.is_enabled());
        assert!(state.check(None).is_ok());
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = AuthState::new("secret").check(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_wrong_scheme_or_token_is_invalid() {
        let state = AuthState::new("secret");
        assert_eq!(
            state.check(Some("Basic c2VjcmV0")).unwrap_err().code,
            ErrorCode::InvalidToken
        );
        assert_eq!(
            state.check(Some("Bearer nope")).unwrap_err().code,
            ErrorCode::InvalidToken
        );
        assert!(state.check(Some("Bearer secret")).is_ok());
    }

    #[test]
    fn test_token_length_mismatch_is_invalid() {
        let state = AuthState::new("secret");
        for candidate in ["Bearer secre", "Bearer secret!", "Bearer "] {
            assert_eq!(
                state.check(Some(candidate)).unwrap_err().code,
                ErrorCode::InvalidToken,
                "{candidate:?}"
            );
        }
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let state = AuthState::new("hunter2-token");
        let rendered = format!("{:?}", state);
        assert!(!rendered.contains("hunter2-token"), "{rendered}");
    }
}
