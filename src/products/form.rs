use std::str::FromStr;

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use validator::Validate;

use super::repo::{ProductStore, NAME_TAKEN};
use crate::{
    error::{AppError, AppResult, ValidationErrors},
    images::services::{inspect, ImageCheck, ImageUpload},
};

pub const MAX_IMAGE_KB: usize = 2048;
const IMAGE_TYPES: &str = "The image must be a file of type: jpg, png, jpeg.";

/// Multipart product fields as sent. Text values are trimmed and blank ones
/// count as absent.
#[derive(Debug, Default, Validate)]
pub struct ProductForm {
    #[validate(length(min = 2, max = 50, message = "The name must be between 2 and 50 characters."))]
    pub name: Option<String>,
    #[validate(length(
        min = 10,
        max = 500,
        message = "The description must be between 10 and 500 characters."
    ))]
    pub description: Option<String>,
    pub available: Option<String>,
    pub price: Option<String>,
    pub image: Option<RawUpload>,
}

#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update { id: i64 },
}

#[derive(Debug, Clone)]
pub struct ValidatedProduct {
    pub name: String,
    pub description: Option<String>,
    pub available: bool,
    pub price: Decimal,
    pub image: Option<ImageUpload>,
}

/// Only the exact string `"false"` makes a product unavailable; `"0"`, `"no"`
/// and a missing field all mean available.
// FIXME: almost certainly a bug in the public contract, but existing clients send "false".
pub fn coerce_available(raw: Option<&str>) -> bool {
    raw != Some("false")
}

fn bad_multipart(e: MultipartError) -> AppError {
    match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(e.body_text()),
        _ => AppError::BadRequest(e.body_text()),
    }
}

impl ProductForm {
    pub async fn from_multipart(mut mp: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(bad_multipart)?;
                form.image = (!body.is_empty()).then_some(RawUpload { file_name, body });
                continue;
            }
            let slot = match name.as_str() {
                "name" => &mut form.name,
                "description" => &mut form.description,
                "available" => &mut form.available,
                "price" => &mut form.price,
                _ => continue,
            };
            let text = field.text().await.map_err(bad_multipart)?;
            *slot = Some(text.trim().to_string()).filter(|v| !v.is_empty());
        }
        Ok(form)
    }

    pub fn available(&self) -> bool {
        coerce_available(self.available.as_deref())
    }

    /// Runs every rule and reports all failures at once.
    pub async fn validate_for(
        self,
        mode: FormMode,
        store: &dyn ProductStore,
    ) -> AppResult<ValidatedProduct> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e.into(),
        };

        match self.name.as_deref() {
            None => errors.add("name", "The name field is required."),
            Some(name) => {
                let except = match mode {
                    FormMode::Create => None,
                    FormMode::Update { id } => Some(id),
                };
                if store.name_taken(name, except).await? {
                    errors.add("name", NAME_TAKEN);
                }
            }
        }

        let available = self.available();
        let image = check_image(self.image, mode == FormMode::Create, &mut errors);
        let price = match parse_price(self.price.as_deref()) {
            Ok(p) => Some(p),
            Err(msg) => {
                errors.add("price", msg);
                None
            }
        };

        errors.into_result()?;
        match (self.name, price) {
            (Some(name), Some(price)) => Ok(ValidatedProduct {
                name,
                description: self.description,
                available,
                price,
                image,
            }),
            _ => Err(anyhow::anyhow!("product form incomplete after validation").into()),
        }
    }
}

fn check_image(
    upload: Option<RawUpload>,
    required: bool,
    errors: &mut ValidationErrors,
) -> Option<ImageUpload> {
    let Some(raw) = upload else {
        if required {
            errors.add("image", "The image field is required.");
        }
        return None;
    };

    let format = match inspect(&raw.body) {
        ImageCheck::Accepted(f) => Some(f),
        ImageCheck::WrongType(_) => {
            errors.add("image", IMAGE_TYPES);
            None
        }
        ImageCheck::NotAnImage => {
            errors.add("image", "The image must be an image.");
            errors.add("image", IMAGE_TYPES);
            None
        }
    };
    if raw.body.len() > MAX_IMAGE_KB * 1024 {
        errors.add(
            "image",
            format!("The image must not be greater than {MAX_IMAGE_KB} kilobytes."),
        );
        return None;
    }
    format.map(|f| ImageUpload::new(raw.file_name, f, raw.body))
}

/// Accepts plain and scientific notation; stored with two decimals.
fn parse_price(raw: Option<&str>) -> Result<Decimal, &'static str> {
    let raw = raw.ok_or("The price field is required.")?;
    let price = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| "The price must be a number.")?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err("The price must be at least 0.");
    }
    if price > Decimal::new(99_999_999_99, 2) {
        return Err("The price must not be greater than 99999999.99.");
    }
    Ok(price.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        products::{repo::MemoryProductStore, repo_types::NewProduct},
        test_support::{jpeg_bytes, png_bytes},
    };

    fn valid_form() -> ProductForm {
        ProductForm {
            name: Some("Widget".into()),
            description: Some("A simple widget for testing".into()),
            available: None,
            price: Some("9.99".into()),
            image: Some(RawUpload {
                file_name: "widget.jpg".into(),
                body: jpeg_bytes(10 * 1024),
            }),
        }
    }

    async fn store_with(name: &str) -> (MemoryProductStore, i64) {
        let store = MemoryProductStore::default();
        let p = store
            .insert(NewProduct {
                name: name.into(),
                image: "x.png".into(),
                description: None,
                available: true,
                price: Decimal::ONE,
            })
            .await
            .unwrap();
        (store, p.id)
    }

    fn errors(err: AppError) -> ValidationErrors {
        match err {
            AppError::Validation(e) => e,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn available_only_false_string_disables() {
        assert!(coerce_available(None));
        assert!(coerce_available(Some("0")));
        assert!(coerce_available(Some("no")));
        assert!(coerce_available(Some("False")));
        assert!(coerce_available(Some("true")));
        assert!(!coerce_available(Some("false")));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price(Some("9.99")), Ok(Decimal::new(999, 2)));
        assert_eq!(parse_price(Some("10")), Ok(Decimal::new(10, 0)));
        assert_eq!(parse_price(Some("1e2")), Ok(Decimal::new(100, 0)));
        assert_eq!(parse_price(Some("0")), Ok(Decimal::ZERO));
        assert_eq!(parse_price(Some("1.005")), Ok(Decimal::new(100, 2)));
        assert_eq!(parse_price(None), Err("The price field is required."));
        assert_eq!(parse_price(Some("cheap")), Err("The price must be a number."));
        assert_eq!(parse_price(Some("-1")), Err("The price must be at least 0."));
        assert!(parse_price(Some("100000000")).is_err());
    }

    #[tokio::test]
    async fn valid_create_form_passes() {
        let store = MemoryProductStore::default();
        let v = valid_form().validate_for(FormMode::Create, &store).await.unwrap();
        assert_eq!(v.name, "Widget");
        assert!(v.available);
        assert_eq!(v.price, Decimal::new(999, 2));
        let image = v.image.unwrap();
        assert_eq!(image.extension, "jpg");
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn collects_every_failure() {
        let store = MemoryProductStore::default();
        let form = ProductForm {
            name: Some("W".into()),
            description: Some("short".into()),
            available: Some("false".into()),
            price: None,
            image: None,
        };
        let errs = errors(form.validate_for(FormMode::Create, &store).await.unwrap_err());
        assert_eq!(errs.get("name").unwrap(), ["The name must be between 2 and 50 characters."]);
        assert_eq!(
            errs.get("description").unwrap(),
            ["The description must be between 10 and 500 characters."]
        );
        assert_eq!(errs.get("price").unwrap(), ["The price field is required."]);
        assert_eq!(errs.get("image").unwrap(), ["The image field is required."]);
        assert!(errs.get("available").is_none());
    }

    #[tokio::test]
    async fn duplicate_name_fails_even_when_everything_else_is_valid() {
        let (store, _) = store_with("Widget").await;
        let errs = errors(valid_form().validate_for(FormMode::Create, &store).await.unwrap_err());
        assert_eq!(errs.get("name").unwrap(), [NAME_TAKEN]);
    }

    #[tokio::test]
    async fn update_may_keep_its_own_name() {
        let (store, id) = store_with("Widget").await;
        let mut form = valid_form();
        form.image = None;
        let v = form.validate_for(FormMode::Update { id }, &store).await.unwrap();
        assert!(v.image.is_none());

        let errs = errors(
            valid_form()
                .validate_for(FormMode::Update { id: id + 1 }, &store)
                .await
                .unwrap_err(),
        );
        assert_eq!(errs.get("name").unwrap(), [NAME_TAKEN]);
    }

    #[tokio::test]
    async fn image_type_and_size_rules() {
        let store = MemoryProductStore::default();

        let mut form = valid_form();
        form.image = Some(RawUpload {
            file_name: "notes.txt".into(),
            body: Bytes::from_static(b"plain text"),
        });
        let errs = errors(form.validate_for(FormMode::Create, &store).await.unwrap_err());
        assert_eq!(errs.get("image").unwrap(), ["The image must be an image.", IMAGE_TYPES]);

        let mut form = valid_form();
        form.image = Some(RawUpload {
            file_name: "anim.gif".into(),
            body: Bytes::from_static(b"GIF89a\x01\x00\x01\x00\x00\x00\x00"),
        });
        let errs = errors(form.validate_for(FormMode::Create, &store).await.unwrap_err());
        assert_eq!(errs.get("image").unwrap(), [IMAGE_TYPES]);

        let mut form = valid_form();
        form.image = Some(RawUpload {
            file_name: "huge.jpg".into(),
            body: jpeg_bytes(MAX_IMAGE_KB * 1024 + 1),
        });
        let errs = errors(form.validate_for(FormMode::Create, &store).await.unwrap_err());
        assert_eq!(
            errs.get("image").unwrap(),
            ["The image must not be greater than 2048 kilobytes."]
        );

        let mut form = valid_form();
        form.image = Some(RawUpload {
            file_name: "logo.png".into(),
            body: png_bytes(),
        });
        assert!(form.validate_for(FormMode::Create, &store).await.is_ok());
    }
}
