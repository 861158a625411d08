use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{ItemResponse, ListQuery, Meta, PaginatedResponse, Pagination, PER_PAGE},
    form::{FormMode, ProductForm},
    repo_types::Product,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

/// Room for a max-size image plus the text fields, so oversize images reach
/// validation. Bodies past this are a 413.
const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(show_product)
                .put(update_product)
                .patch(update_product)
                .delete(destroy_product),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Non-numeric ids can't exist, so they are simply not found.
async fn load(state: &AppState, raw_id: &str) -> AppResult<Product> {
    let id: i64 = raw_id.parse().map_err(|_| AppError::NotFound("Product"))?;
    state
        .products
        .find(id)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let page = query.page().map_err(AppError::Validation)?;
    let result = state.products.paginate(PER_PAGE, (page - 1) * PER_PAGE).await?;
    let pagination = Pagination::new(
        result.total,
        result.items.len(),
        page,
        &format!("{}/api/products", state.config.app_url),
    );
    Ok(Json(PaginatedResponse {
        data: result.items,
        meta: Meta { pagination },
    }))
}

#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<Json<ItemResponse<Product>>> {
    let input = ProductForm::from_multipart(mp)
        .await?
        .validate_for(FormMode::Create, state.products.as_ref())
        .await?;
    let product = services::create_product(&state, input).await?;
    info!(%user_id, product_id = product.id, image = ?product.image, "product created");
    Ok(Json(ItemResponse { data: product }))
}

#[instrument(skip(state))]
pub async fn show_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ItemResponse<Product>>> {
    let product = load(&state, &id).await?;
    Ok(Json(ItemResponse { data: product }))
}

#[instrument(skip(state, mp))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    mp: Multipart,
) -> AppResult<Json<ItemResponse<Product>>> {
    let existing = load(&state, &id).await?;
    let input = ProductForm::from_multipart(mp)
        .await?
        .validate_for(FormMode::Update { id: existing.id }, state.products.as_ref())
        .await?;
    let product = services::update_product(&state, &existing, input).await?;
    info!(%user_id, product_id = product.id, "product updated");
    Ok(Json(ItemResponse { data: product }))
}

#[instrument(skip(state))]
pub async fn destroy_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let product = load(&state, &id).await?;
    services::destroy_product(&state, &product).await?;
    info!(%user_id, product_id = product.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
