//! Product intake: validate the form, upload the image, create the product.
//!
//! Validation runs before any remote call. The image upload comes first; the
//! product document is only created once the image has a URL. Neither step
//! is retried.

use chrono::{DateTime, Utc};
use pg_delivery_core::{NewProduct, PRODUCTS, Price, PriceError, ProductId};
use pg_delivery_docstore::{
    DocumentStore, ObjectStorage, ObjectStorageError, StoreError, fields_of, product_image_key,
};
use thiserror::Error;
use tracing::instrument;

/// A form field of the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeField {
    Name,
    Price,
    Stock,
    Category,
    Image,
}

impl IntakeField {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Stock => "stock",
            Self::Category => "category",
            Self::Image => "image",
        }
    }
}

/// Errors that can occur during product intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("missing field: {}", .0.label())]
    MissingField(IntakeField),

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("stock must be a whole number of units (got {0:?})")]
    InvalidStock(String),

    #[error("not an image upload: {0}")]
    NotAnImage(String),

    #[error("malformed form submission: {0}")]
    Malformed(String),

    #[error("image upload failed: {0}")]
    Upload(#[from] ObjectStorageError),

    #[error("failed to save product: {0}")]
    Store(#[from] StoreError),
}

impl IntakeError {
    /// Whether the error was caught before any remote call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Upload(_) | Self::Store(_))
    }
}

/// Text fields of the intake form, as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeFields {
    pub name: String,
    pub price: String,
    pub stock: String,
    pub category: String,
}

/// The uploaded image part.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A submitted intake form.
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    pub fields: IntakeFields,
    pub image: Option<ImageUpload>,
}

struct ValidIntake {
    name: String,
    price: Price,
    stock: u32,
    category: String,
    image: ImageUpload,
}

fn required(value: &str, field: IntakeField) -> Result<(), IntakeError> {
    if value.trim().is_empty() {
        return Err(IntakeError::MissingField(field));
    }
    Ok(())
}

impl IntakeForm {
    fn validate(self) -> Result<ValidIntake, IntakeError> {
        let IntakeFields {
            name,
            price,
            stock,
            category,
        } = self.fields;

        required(&name, IntakeField::Name)?;
        required(&price, IntakeField::Price)?;
        required(&stock, IntakeField::Stock)?;
        required(&category, IntakeField::Category)?;

        let price: Price = price.parse()?;
        let stock = stock
            .trim()
            .parse::<u32>()
            .map_err(|_| IntakeError::InvalidStock(stock.clone()))?;

        let image = self
            .image
            .filter(|image| !image.bytes.is_empty())
            .ok_or(IntakeError::MissingField(IntakeField::Image))?;
        if !image.content_type.starts_with("image/") {
            return Err(IntakeError::NotAnImage(image.content_type));
        }

        Ok(ValidIntake {
            name,
            price,
            stock,
            category,
            image,
        })
    }
}

/// Validate the form, upload the image and create the product.
///
/// # Errors
///
/// - Validation variants before any remote call
/// - `IntakeError::Upload` if the image upload fails (no product is created)
/// - `IntakeError::Store` if the product document cannot be created
#[instrument(skip_all, fields(product_id = tracing::field::Empty))]
pub async fn add_product(
    store: &dyn DocumentStore,
    objects: &dyn ObjectStorage,
    form: IntakeForm,
    now: DateTime<Utc>,
) -> Result<ProductId, IntakeError> {
    let intake = form.validate()?;

    let key = product_image_key(now.timestamp_millis(), &intake.image.filename);
    let image_url = objects
        .upload(&key, &intake.image.content_type, intake.image.bytes)
        .await?;
    tracing::debug!(key, "product image uploaded");

    let product = NewProduct::new(
        &intake.name,
        intake.price,
        intake.stock,
        &intake.category,
        image_url,
        now,
    );
    let id = ProductId::new(store.create(PRODUCTS, fields_of(&product)?).await?);
    tracing::Span::current().record("product_id", id.as_str());
    tracing::info!(name = %product.name, "product added");

    Ok(id)
}
