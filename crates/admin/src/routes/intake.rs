//! Product intake route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::middleware::RequireOperator;
use crate::services::{ImageUpload, IntakeError, IntakeFields, IntakeForm, add_product};
use crate::state::AppState;

/// Largest accepted intake submission, image included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ADD_FAILED_MESSAGE: &str = "Failed to add product. Please try again.";

/// Add product template.
#[derive(Template, WebTemplate, Default)]
#[template(path = "product_add.html")]
pub struct ProductAddTemplate {
    pub form: IntakeFields,
    pub error: Option<String>,
}

const fn validation_message(err: &IntakeError) -> &'static str {
    match err {
        IntakeError::MissingField(_) => "All fields are required.",
        IntakeError::InvalidPrice(_) => "Price must be a number of zero or more.",
        IntakeError::InvalidStock(_) => "Stock must be a whole number of zero or more.",
        IntakeError::NotAnImage(_) => "Please upload a valid image.",
        IntakeError::Malformed(_) => "The form could not be read. Please try again.",
        IntakeError::Upload(_) | IntakeError::Store(_) => ADD_FAILED_MESSAGE,
    }
}

async fn text(field: Field<'_>) -> Result<String, IntakeError> {
    field
        .text()
        .await
        .map_err(|e| IntakeError::Malformed(e.body_text()))
}

/// Collect the multipart parts into an [`IntakeForm`]. Unknown parts are ignored.
async fn read_intake_form(mut multipart: Multipart) -> Result<IntakeForm, IntakeError> {
    let mut form = IntakeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IntakeError::Malformed(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "name" => form.fields.name = text(field).await?,
            "price" => form.fields.price = text(field).await?,
            "stock" => form.fields.stock = text(field).await?,
            "category" => form.fields.category = text(field).await?,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| IntakeError::Malformed(e.body_text()))?;
                form.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!(part = other, "ignoring unknown form part"),
        }
    }

    Ok(form)
}

/// Show the empty intake form.
pub async fn show(RequireOperator(_operator): RequireOperator) -> ProductAddTemplate {
    ProductAddTemplate::default()
}

/// Validate, upload the image, create the product.
///
/// Any failure re-renders the form with the entered text values.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    RequireOperator(_operator): RequireOperator,
    multipart: Multipart,
) -> Response {
    let form = match read_intake_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            tracing::warn!(error = %err, "unreadable intake form");
            let template = ProductAddTemplate {
                form: IntakeFields::default(),
                error: Some(validation_message(&err).to_string()),
            };
            return (StatusCode::BAD_REQUEST, template).into_response();
        }
    };
    let entered = form.fields.clone();

    match add_product(state.store(), state.objects(), form, Utc::now()).await {
        Ok(id) => {
            add_breadcrumb("intake", "Product added", Some(&[("product_id", id.as_str())]));
            Redirect::to("/admin/products").into_response()
        }
        Err(err) if err.is_validation() => {
            tracing::debug!(error = %err, "intake form rejected");
            let template = ProductAddTemplate {
                form: entered,
                error: Some(validation_message(&err).to_string()),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
        }
        Err(err) => {
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "product intake failed");
            let template = ProductAddTemplate {
                form: entered,
                error: Some(ADD_FAILED_MESSAGE.to_string()),
            };
            (StatusCode::BAD_GATEWAY, template).into_response()
        }
    }
}
