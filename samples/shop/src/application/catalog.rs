//! Catalog use cases.

use std::sync::Arc;

use rust_decimal::Decimal;
use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use crate::domain::catalog::{NewProduct, Product, ProductImage, ProductStatus, Variant};
use crate::domain::inventory::StockItem;
use crate::infrastructure::images::ImageStore;

pub fn product_not_found(product_id: Uuid) -> ErrorInfo {
    ErrorInfo::not_found(format!("Product {product_id} was not found."))
}

/// Include keys accepted by product reads.
pub fn product_includes() -> IncludeRegistry<Product> {
    IncludeRegistry::new()
        .with_path("variants", "variants")
        .with_path("images", "images")
}

// =============================================================================
// Commands
// =============================================================================

/// Creates a draft product, its variants and an empty stock record per
/// variant. A cover image is uploaded after the insert is staged; a failed
/// upload rolls the whole product back.
pub fn create_product(input: NewProduct, images: Arc<dyn ImageStore>) -> ShopPipeline<Product> {
    let slug = input.slug.trim().to_owned();
    let conflict = ErrorInfo::conflict(format!("A product with slug '{slug}' already exists."));
    let after_insert: Vec<AfterInsert<Product>> = input
        .cover_image
        .clone()
        .map(|bytes| upload_cover(images, bytes))
        .into_iter()
        .collect();

    pipeline! {
        _ <= ensure_absent(move |product: &Product| product.slug == slug, conflict);
        product <= add_entity_with(input, Product::create, after_insert);
        _ <= Pipeline::sequence(product.variants.iter().cloned().map(add_entity::<MemoryContext, Variant>));
        _ <= Pipeline::sequence(product.variants.iter().map(|variant| {
            add_entity::<MemoryContext, StockItem>(StockItem::empty(variant.id, variant.sku.clone()))
        }));
        _ <= Pipeline::sequence(cover_image_row(&product).map(add_entity::<MemoryContext, ProductImage>));
        Pipeline::succeed(product)
    }
}

fn upload_cover(images: Arc<dyn ImageStore>, bytes: Vec<u8>) -> AfterInsert<Product> {
    Box::new(move |mut product: Product| {
        let key = format!("products/{}/cover", product.id);
        images.upload(key, bytes).fmap(move |uploaded: Fin<String>| -> Fin<Product> {
            product.cover_image_url = Some(uploaded?);
            Ok(product)
        })
    })
}

fn cover_image_row(product: &Product) -> Option<ProductImage> {
    product.cover_image_url.clone().map(|url| ProductImage {
        id: Uuid::new_v4(),
        product_id: product.id,
        url,
        position: 0,
    })
}

/// Moves a product through its lifecycle.
pub fn change_product_status(product_id: Uuid, status: ProductStatus) -> ShopPipeline<Product> {
    get_update_entity(
        move |product: &Product| product.id == product_id,
        product_not_found(product_id),
        QueryOptions::new(),
        [Transition::pure(move |product: Product| product.change_status(status))],
    )
}

// =============================================================================
// Queries
// =============================================================================

/// Loads one product with the requested comma-separated includes.
pub fn get_product(product_id: Uuid, includes: &str) -> ShopPipeline<Product> {
    let options = product_includes().apply(QueryOptions::new().as_no_tracking(), includes);
    pipeline! {
        options <= Pipeline::from_result(options);
        get_entity(move |product: &Product| product.id == product_id, product_not_found(product_id), options)
    }
}

/// Filters and paging for [`list_products`].
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub page: i64,
    pub size: i64,
    pub includes: String,
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
}

/// A row of the product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: ProductStatus,
    pub variant_count: usize,
    pub price_from: Option<Decimal>,
    pub image_count: usize,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            price_from: product.variants.iter().map(|variant| variant.price).min(),
            variant_count: product.variants.len(),
            image_count: product.images.len(),
            id: product.id,
            name: product.name,
            slug: product.slug,
            status: product.status,
        }
    }
}

/// Lists products by name, one page at a time.
///
/// Counts and prices are only filled for the includes requested.
pub fn list_products(query: ProductQuery, config: &PipelineConfig) -> ShopPipeline<Page<ProductSummary>> {
    let request = config.page_request(query.page, query.size);
    let options = product_includes().apply(
        QueryOptions::new()
            .add_order_by("name", |product: &Product| product.name.to_lowercase().into())
            .as_no_tracking(),
        &query.includes,
    );
    let search = query.search.map(|term| term.trim().to_lowercase());
    let status = query.status;

    pipeline! {
        (request, options) <= Pipeline::from_result(combine2(request, options, |request, options| (request, options)));
        get_entities_with_pagination(
            move |product: &Product| {
                status.is_none_or(|status| product.status == status)
                    && search.as_deref().is_none_or(|term| product.name.to_lowercase().contains(term))
            },
            options,
            request,
            ProductSummary::from,
        )
    }
}
