use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewProduct, Page, Product, ProductPatch};
use crate::error::{AppError, ValidationErrors};

pub const NAME_TAKEN: &str = "The name has already been taken.";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("product name already taken")]
    NameTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NameTaken => {
                let mut errors = ValidationErrors::new();
                errors.add("name", NAME_TAKEN);
                AppError::Validation(errors)
            }
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Rows ordered by id.
    async fn paginate(&self, limit: i64, offset: i64) -> anyhow::Result<Page<Product>>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>>;
    /// Whether another product (other than `except_id`) already uses `name`.
    async fn name_taken(&self, name: &str, except_id: Option<i64>) -> anyhow::Result<bool>;
    async fn insert(&self, new: NewProduct) -> Result<Product, StoreError>;
    /// `Ok(None)` when `id` does not exist.
    async fn update(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>, StoreError>;
    /// `Ok(false)` when `id` does not exist.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    async fn delete_all(&self) -> anyhow::Result<u64>;
}

pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, image, description, available, price, created_at";

/// SQLSTATE 23505 on the name constraint becomes `NameTaken`.
fn classify(err: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some("products_name_key")
        {
            return StoreError::NameTaken;
        }
    }
    StoreError::Other(anyhow::Error::new(err).context(what))
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn paginate(&self, limit: i64, offset: i64) -> anyhow::Result<Page<Product>> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await
            .context("count products")?;

        let items = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list products")?;

        Ok(Page { items, total })
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find product")?;
        Ok(product)
    }

    async fn name_taken(&self, name: &str, except_id: Option<i64>) -> anyhow::Result<bool> {
        let (taken,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM products
                WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(except_id)
        .fetch_one(&self.db)
        .await
        .context("check product name")?;
        Ok(taken)
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, image, description, available, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(new.name)
        .bind(new.image)
        .bind(new.description)
        .bind(new.available)
        .bind(new.price)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify(e, "insert product"))
    }

    async fn update(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name        = COALESCE($2, name),
                image       = COALESCE($3, image),
                description = COALESCE($4, description),
                available   = COALESCE($5, available),
                price       = COALESCE($6, price),
                updated_at  = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.image)
        .bind(patch.description)
        .bind(patch.available)
        .bind(patch.price)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "update product"))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let affected = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?
            .rows_affected();
        Ok(affected == 1)
    }

    async fn delete_all(&self) -> anyhow::Result<u64> {
        let affected = sqlx::query("DELETE FROM products")
            .execute(&self.db)
            .await
            .context("delete all products")?
            .rows_affected();
        Ok(affected)
    }
}

#[cfg(test)]
pub use memory::MemoryProductStore;


#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            image: format!("{}-1.png", name.to_lowercase()),
            description: None,
            available: true,
            price: Decimal::new(500, 2),
        }
    }

    #[tokio::test]
    async fn memory_store_enforces_unique_names() {
        let store = MemoryProductStore::default();
        store.insert(new_product("Lamp")).await.unwrap();
        let err = store.insert(new_product("Lamp")).await.unwrap_err();
        assert!(matches!(err, StoreError::NameTaken));
    }

    #[tokio::test]
    async fn name_taken_ignores_own_row() {
        let store = MemoryProductStore::default();
        let lamp = store.insert(new_product("Lamp")).await.unwrap();
        assert!(store.name_taken("Lamp", None).await.unwrap());
        assert!(!store.name_taken("Lamp", Some(lamp.id)).await.unwrap());
        assert!(!store.name_taken("Desk", None).await.unwrap());
    }

    #[tokio::test]
    async fn paginate_counts_everything() {
        let store = MemoryProductStore::default();
        for i in 0..12 {
            store.insert(new_product(&format!("P{i}"))).await.unwrap();
        }
        let page = store.paginate(10, 10).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, 11);
    }

    #[test]
    fn name_taken_maps_to_name_validation_error() {
        match AppError::from(StoreError::NameTaken) {
            AppError::Validation(errors) => {
                assert_eq!(errors.get("name").unwrap()[0], NAME_TAKEN)
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
