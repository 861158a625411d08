use tracing::warn;

use super::{
    form::ValidatedProduct,
    repo_types::{NewProduct, Product, ProductPatch},
};
use crate::{
    error::{AppError, AppResult},
    images::services::{delete_product_image, store_product_image},
    state::AppState,
};

/// Stores the image first, then the row.
pub async fn create_product(st: &AppState, input: ValidatedProduct) -> AppResult<Product> {
    let Some(upload) = input.image else {
        return Err(anyhow::anyhow!("create without a validated image").into());
    };
    let filename = store_product_image(st, &upload).await?;

    let inserted = st
        .products
        .insert(NewProduct {
            name: input.name,
            image: filename.clone(),
            description: input.description,
            available: input.available,
            price: input.price,
        })
        .await;

    match inserted {
        Ok(product) => Ok(product),
        Err(e) => {
            // The row never existed, so its blob has no owner.
            if let Err(cleanup) = delete_product_image(st, &filename).await {
                warn!(error = %cleanup, %filename, "orphaned product image");
            }
            Err(e.into())
        }
    }
}

/// Merges `input` into `existing`. A new image replaces the old blob.
pub async fn update_product(
    st: &AppState,
    existing: &Product,
    input: ValidatedProduct,
) -> AppResult<Product> {
    let mut patch = ProductPatch {
        name: Some(input.name),
        image: None,
        description: input.description,
        available: Some(input.available),
        price: Some(input.price),
    };

    if let Some(upload) = input.image {
        if let Some(old) = existing.image.as_deref() {
            delete_product_image(st, old).await?;
        }
        patch.image = Some(store_product_image(st, &upload).await?);
    }

    st.products
        .update(existing.id, patch)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound("Product"))
}

/// Removes the blob (when there is one) before the row.
pub async fn destroy_product(st: &AppState, product: &Product) -> AppResult<()> {
    if let Some(image) = product.image.as_deref() {
        delete_product_image(st, image).await?;
    }
    if !st.products.delete(product.id).await? {
        return Err(AppError::NotFound("Product"));
    }
    Ok(())
}
