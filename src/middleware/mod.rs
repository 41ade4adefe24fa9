use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity, taken from the `X-User-Id` header set by the gateway in
/// front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

pub fn parse_user_id(raw: Option<&str>) -> Result<AuthUser, AppError> {
    let raw = raw.ok_or_else(|| AppError::Unauthorized("missing X-User-Id header".to_string()))?;
    match raw.trim().parse::<i64>() {
        Ok(user_id) if user_id > 0 => Ok(AuthUser { user_id }),
        _ => Err(AppError::Unauthorized(format!("invalid X-User-Id '{}'", raw))),
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok());
        parse_user_id(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_numeric_ids() {
        assert_eq!(parse_user_id(Some(" 7 ")).ok(), Some(AuthUser { user_id: 7 }));
    }

    #[test]
    fn rejects_missing_or_malformed_ids() {
        assert!(matches!(parse_user_id(None), Err(AppError::Unauthorized(_))));
        assert!(matches!(parse_user_id(Some("abc")), Err(AppError::Unauthorized(_))));
        assert!(matches!(parse_user_id(Some("0")), Err(AppError::Unauthorized(_))));
    }
}
