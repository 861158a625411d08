//! Helpers shared by the HTTP tests.

use std::io::Cursor;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

use crate::{auth::password::hash_password, auth::repo::UserStore, state::FakeBackends};

const BOUNDARY: &str = "catalog-test-boundary";

/// JPEG magic followed by zero padding, `len` bytes in total.
pub fn jpeg_bytes(len: usize) -> Bytes {
    let mut body = vec![0xFF, 0xD8, 0xFF, 0xE0];
    body.resize(len.max(body.len()), 0);
    Bytes::from(body)
}

/// A real 2x2 PNG.
pub fn png_bytes() -> Bytes {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    Bytes::from(out.into_inner())
}

pub async fn seed_user(fakes: &FakeBackends, email: &str, password: &str) {
    let hash = hash_password(password).unwrap();
    fakes.users.create(email, &hash).await.unwrap();
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn post_json(app: &Router, path: &str, body: Value) -> Response<Body> {
    let req = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn post_raw(
    app: &Router,
    path: &str,
    content_type: Option<&str>,
    body: &str,
) -> Response<Body> {
    let mut req = Request::post(path);
    if let Some(content_type) = content_type {
        req = req.header(header::CONTENT_TYPE, content_type);
    }
    let req = req.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn post_with_token(app: &Router, path: &str, token: Option<&str>) -> Response<Body> {
    send(app, "POST", path, token, None).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let res = post_json(
        app,
        "/api/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(res.status(), axum::http::StatusCode::OK);
    body_json(res).await["access_token"].as_str().unwrap().to_string()
}

pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    form: Option<MultipartBuilder>,
) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match form {
        Some(form) => {
            req = req.header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
            Body::from(form.finish())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

enum Part {
    Text(String, String),
    File {
        name: String,
        file_name: String,
        content_type: String,
        body: Bytes,
    },
}

/// Builds a `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBuilder {
    parts: Vec<Part>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(Part::Text(name.into(), value.into()));
        self
    }

    /// Replaces an existing text field, or adds it.
    pub fn replace_text(mut self, name: &str, value: &str) -> Self {
        self.parts
            .retain(|p| !matches!(p, Part::Text(n, _) if n == name));
        self.text(name, value)
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, body: Bytes) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            body,
        });
        self
    }

    fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in self.parts {
            out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    body,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(&body);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }
}
