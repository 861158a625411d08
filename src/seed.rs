use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{password::hash_password, repo_types::User},
    images::services::{blob_key, PRODUCT_NAMESPACE},
    products::repo_types::NewProduct,
    state::AppState,
};

const ADJECTIVES: &[&str] = &["Sturdy", "Compact", "Deluxe", "Classic", "Portable", "Quiet"];
const NOUNS: &[&str] = &["Lamp", "Kettle", "Chair", "Backpack", "Speaker", "Clock"];

struct SampleProduct {
    name: String,
    description: String,
    available: bool,
    price: Decimal,
    color: [u8; 3],
}

fn samples(count: usize) -> Vec<SampleProduct> {
    let mut rng = rand::thread_rng();
    (1..=count)
        .map(|i| {
            let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
            let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
            SampleProduct {
                name: format!("{adjective} {noun} {i}"),
                description: format!("A {} {} for everyday use.", adjective.to_lowercase(), noun.to_lowercase()),
                available: rng.gen_bool(0.8),
                price: Decimal::new(rng.gen_range(100..100_000), 2),
                color: rng.gen(),
            }
        })
        .collect()
}

/// Solid-colour PNG used as a stand-in product photo.
fn placeholder_png(color: [u8; 3]) -> anyhow::Result<Bytes> {
    let img = RgbImage::from_pixel(64, 64, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .context("encode placeholder png")?;
    Ok(Bytes::from(out.into_inner()))
}

/// Replaces the whole catalog with `count` sample products.
pub async fn seed_products(st: &AppState, count: usize) -> anyhow::Result<()> {
    st.storage
        .clear_namespace(PRODUCT_NAMESPACE)
        .await
        .context("clear product images")?;
    let removed = st.products.delete_all().await?;
    info!(removed, "catalog cleared");

    for sample in samples(count) {
        let filename = format!("{}.png", Uuid::new_v4().simple());
        let key = blob_key(&filename);
        st.storage
            .put_object(&key, placeholder_png(sample.color)?, "image/png")
            .await
            .with_context(|| format!("put_object {key}"))?;
        st.products
            .insert(NewProduct {
                name: sample.name,
                image: filename,
                description: Some(sample.description),
                available: sample.available,
                price: sample.price,
            })
            .await
            .map_err(anyhow::Error::from)?;
    }
    info!(count, "catalog seeded");
    Ok(())
}

pub async fn create_user(st: &AppState, email: &str, password: &str) -> anyhow::Result<User> {
    let email = email.trim().to_lowercase();
    anyhow::ensure!(!password.is_empty(), "password must not be empty");
    let hash = hash_password(password)?;
    let user = st.users.create(&email, &hash).await?;
    info!(user_id = %user.id, %email, "user created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, images::services::inspect, images::services::ImageCheck};

    #[tokio::test]
    async fn seeding_replaces_catalog_and_images() {
        let (state, fakes) = AppState::fake_parts();
        seed_products(&state, 5).await.unwrap();
        assert_eq!(fakes.products.len().await, 5);
        assert_eq!(fakes.storage.len().await, 5);

        seed_products(&state, 3).await.unwrap();
        assert_eq!(fakes.products.len().await, 3);
        assert_eq!(fakes.storage.len().await, 3);

        let page = state.products.paginate(10, 0).await.unwrap();
        for p in page.items {
            let image = p.image.unwrap();
            assert!(image.ends_with(".png"));
            assert!(fakes.storage.contains(&blob_key(&image)).await);
        }
    }

    #[test]
    fn placeholder_is_a_png() {
        let body = placeholder_png([1, 2, 3]).unwrap();
        assert_eq!(inspect(&body), ImageCheck::Accepted(ImageFormat::Png));
    }

    #[test]
    fn sample_names_are_unique() {
        let names: std::collections::HashSet<_> = samples(50).into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 50);
    }

    #[tokio::test]
    async fn create_user_normalizes_email() {
        let (state, _) = AppState::fake_parts();
        let user = create_user(&state, " Admin@Example.com ", "secret-pass").await.unwrap();
        assert_eq!(user.email, "admin@example.com");
        assert!(verify_password("secret-pass", &user.password_hash).unwrap());
        assert!(create_user(&state, "admin@example.com", "other").await.is_err());
    }
}
