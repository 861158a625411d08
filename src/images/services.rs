use anyhow::Context;
use bytes::Bytes;
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::naming::derive_name;
use crate::state::AppState;

/// Blob namespace every product image lives under.
pub const PRODUCT_NAMESPACE: &str = "products";

/// An upload that already passed validation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub extension: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ImageUpload {
    /// Keeps the client's extension when it is sane, otherwise falls back to
    /// the one matching the sniffed format.
    pub fn new(original_name: String, format: ImageFormat, body: Bytes) -> Self {
        let extension = client_extension(&original_name)
            .or_else(|| ext_from_format(format).map(str::to_string))
            .unwrap_or_else(|| "bin".into());
        Self {
            original_name,
            extension,
            content_type: format.to_mime_type(),
            body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCheck {
    /// jpg, jpeg or png.
    Accepted(ImageFormat),
    /// An image, but not one of the accepted types.
    WrongType(ImageFormat),
    NotAnImage,
}

/// Classifies by content, not by the name the client sent.
pub fn inspect(body: &[u8]) -> ImageCheck {
    match image::guess_format(body) {
        Ok(f @ (ImageFormat::Jpeg | ImageFormat::Png)) => ImageCheck::Accepted(f),
        Ok(f @ (ImageFormat::Gif | ImageFormat::WebP | ImageFormat::Bmp)) => ImageCheck::WrongType(f),
        _ => ImageCheck::NotAnImage,
    }
}

fn ext_from_format(f: ImageFormat) -> Option<&'static str> {
    match f {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Bmp => Some("bmp"),
        _ => None,
    }
}

fn client_extension(original_name: &str) -> Option<String> {
    lazy_static! {
        static ref EXT_RE: Regex = Regex::new(r"^[A-Za-z0-9]{1,10}$").unwrap();
    }
    std::path::Path::new(original_name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| EXT_RE.is_match(e))
        .map(str::to_ascii_lowercase)
}

pub fn blob_key(filename: &str) -> String {
    format!("{PRODUCT_NAMESPACE}/{filename}")
}

/// Writes the upload under a derived name and returns that name.
pub async fn store_product_image(st: &AppState, upload: &ImageUpload) -> anyhow::Result<String> {
    let filename = derive_name(&upload.original_name, &upload.extension, st.clock.as_ref());
    let key = blob_key(&filename);
    st.storage
        .put_object(&key, upload.body.clone(), upload.content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;
    debug!(%key, bytes = upload.body.len(), "product image stored");
    Ok(filename)
}

pub async fn delete_product_image(st: &AppState, filename: &str) -> anyhow::Result<()> {
    let key = blob_key(filename);
    st.storage
        .delete_object(&key)
        .await
        .with_context(|| format!("delete_object {key}"))?;
    debug!(%key, "product image deleted");
    Ok(())
}
