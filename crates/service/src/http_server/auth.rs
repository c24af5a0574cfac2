//! The caller's identity, as attached by the authenticating transport in
//!  front of this server. Requests without it never reach a handler.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::StatusCode;

pub const USER_HEADER: &str = "x-jailbird-user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing x-jailbird-user header")]
    MissingUser,
    #[error("malformed x-jailbird-user header")]
    MalformedUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!("rejecting unauthenticated request: {}", self);
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .ok_or(AuthError::MissingUser)?
            .to_str()
            .map_err(|_| AuthError::MalformedUser)?
            .trim();
        if value.is_empty() {
            return Err(AuthError::MissingUser);
        }
        Ok(AuthenticatedUser(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    async fn extract(request: Request<()>) -> Result<AuthenticatedUser, AuthError> {
        let (mut parts, _) = request.into_parts();
        AuthenticatedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_user_from_header() {
        let request = Request::builder()
            .header(USER_HEADER, "alice")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().id(), "alice");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AuthError::MissingUser)));

        let request = Request::builder()
            .header(USER_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(AuthError::MissingUser)));
    }
}
