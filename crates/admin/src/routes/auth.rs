//! Operator login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{clear_current_operator, set_current_operator};
use crate::models::CurrentOperator;
use crate::services::verify_password;
use crate::state::AppState;

const WRONG_PASSWORD_MESSAGE: &str = "Wrong password";

/// Login page template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// Check the password and start an operator session.
///
/// The session id is cycled on success so a pre-login cookie cannot be
/// carried into the authenticated session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let hash = state.config().password_hash().to_owned();
    let password = form.password;
    // Argon2 is deliberately slow; keep it off the async workers.
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check failed to run: {e}")))?;

    if verified.is_err() {
        tracing::warn!("operator login rejected");
        let template = LoginTemplate {
            error: Some(WRONG_PASSWORD_MESSAGE.to_string()),
        };
        return Ok((StatusCode::UNAUTHORIZED, template).into_response());
    }

    session.cycle_id().await?;
    let operator = CurrentOperator::new_login();
    set_current_operator(&session, &operator).await?;

    let login_id = operator.login_id.to_string();
    add_breadcrumb("auth", "Operator logged in", Some(&[("login_id", login_id.as_str())]));
    tracing::info!(login_id = %login_id, "operator logged in");

    Ok(Redirect::to("/admin").into_response())
}

/// End the operator session and close its live feeds.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    if let Some(operator) = clear_current_operator(&session).await? {
        let closed_feeds = state.feeds().revoke(operator.login_id);
        tracing::info!(login_id = %operator.login_id, closed_feeds, "operator logged out");
    }
    session.flush().await?;
    Ok(Redirect::to("/admin"))
}
