//! Authentication extractors for admin.
//!
//! Provides extractors for requiring an operator login in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentOperator, session_keys};

/// Paths answered with 401 instead of a redirect: the live feed and the
/// order actions called from script.
const API_PREFIX: &str = "/admin/orders/";

/// Extractor that requires an operator login.
///
/// If nobody is logged in, returns a redirect to the login page for HTML
/// requests, or 401 Unauthorized for the stream and order API.
pub struct RequireOperator(pub CurrentOperator);

/// Error returned when a login is required but missing.
#[derive(Debug, PartialEq, Eq)]
pub enum OperatorAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API and stream requests).
    Unauthorized,
}

impl IntoResponse for OperatorAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/admin").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

fn rejection_for(path: &str) -> OperatorAuthRejection {
    if path.starts_with(API_PREFIX) {
        OperatorAuthRejection::Unauthorized
    } else {
        OperatorAuthRejection::RedirectToLogin
    }
}

async fn current_operator(session: &Session) -> Option<CurrentOperator> {
    session
        .get(session_keys::CURRENT_OPERATOR)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireOperator
where
    S: Send + Sync,
{
    type Rejection = OperatorAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(OperatorAuthRejection::Unauthorized)?;

        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path());

        let operator = current_operator(session)
            .await
            .ok_or_else(|| rejection_for(path))?;

        Ok(Self(operator))
    }
}

/// Extractor that optionally gets the current operator.
///
/// Used by `/admin`, which shows the login form instead of redirecting.
pub struct OptionalOperator(pub Option<CurrentOperator>);

impl<S> FromRequestParts<S> for OptionalOperator
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator = match parts.extensions.get::<Session>() {
            Some(session) => current_operator(session).await,
            None => None,
        };

        Ok(Self(operator))
    }
}

/// Helper to set the current operator in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_operator(
    session: &Session,
    operator: &CurrentOperator,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_OPERATOR, operator)
        .await
}

/// Helper to clear the current operator from the session (logout).
///
/// Returns the operator that was logged in, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_operator(
    session: &Session,
) -> Result<Option<CurrentOperator>, tower_sessions::session::Error> {
    session
        .remove::<CurrentOperator>(session_keys::CURRENT_OPERATOR)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_for_paths() {
        assert_eq!(
            rejection_for("/admin/orders/stream"),
            OperatorAuthRejection::Unauthorized
        );
        assert_eq!(
            rejection_for("/admin/orders/abc/delivered"),
            OperatorAuthRejection::Unauthorized
        );
        assert_eq!(
            rejection_for("/admin/products"),
            OperatorAuthRejection::RedirectToLogin
        );
    }

    #[test]
    fn test_rejection_responses() {
        assert_eq!(
            OperatorAuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        let redirect = OperatorAuthRejection::RedirectToLogin.into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect.headers()["location"], "/admin");
    }
}
