use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image: Option<String>, // filename under the products namespace
    pub description: Option<String>,
    pub available: bool,
    pub price: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub image: String,
    pub description: Option<String>,
    pub available: bool,
    pub price: Decimal,
}

/// Partial update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
    pub price: Option<Decimal>,
}

/// Same merge the COALESCE update in `PgProductStore` performs.
#[cfg(test)]
impl ProductPatch {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(image) = self.image {
            product.image = Some(image);
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(available) = self.available {
            product.available = available;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
    }
}

/// One page of rows plus the size of the whole set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}
