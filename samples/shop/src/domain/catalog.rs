//! Catalog aggregate: products, their variants and images.

use rust_decimal::Decimal;
use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

use super::required;

status_machine! {
    /// Lifecycle of a product listing.
    pub enum ProductStatus: "product status" {
        unknown: Unknown = 0,
        Draft = 1, "Draft" => [Active, Discontinued],
        Active = 2, "Active" => [Discontinued],
        Discontinued = 3, "Discontinued" => [],
    }
}

// =============================================================================
// Events
// =============================================================================

/// Raised when a product is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCreated {
    pub product_id: Uuid,
    pub slug: String,
}

impl DomainEvent for ProductCreated {
    fn name(&self) -> &'static str {
        "catalog.product_created"
    }
}

/// Raised when a product changes status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductStatusChanged {
    pub product_id: Uuid,
    pub from: String,
    pub to: String,
}

impl DomainEvent for ProductStatusChanged {
    fn name(&self) -> &'static str {
        "catalog.product_status_changed"
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: Decimal,
}

impl Entity for Variant {
    type Id = Uuid;
    const NAME: &'static str = "Variant";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// An image reference stored by the image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub position: u32,
}

impl Entity for ProductImage {
    type Id = Uuid;
    const NAME: &'static str = "ProductImage";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Input for one variant of a new product.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
}

/// Input for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub variants: Vec<NewVariant>,
    /// Raw bytes of the cover image, uploaded after the insert is staged.
    pub cover_image: Option<Vec<u8>>,
}

/// The product aggregate root.
///
/// `variants` and `images` are navigations: they are filled by the
/// `variants` and `images` includes and never written with the product row.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: ProductStatus,
    pub cover_image_url: Option<String>,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Product {
    /// Builds a draft product together with its variants.
    ///
    /// # Errors
    ///
    /// Returns one `Validation` failure listing every invalid field.
    pub fn create(input: NewProduct) -> Fin<Self> {
        let id = Uuid::new_v4();
        let variants = validate_variants(id, input.variants);
        accumulate3(
            required(&input.name, "Product name is required."),
            validate_slug(&input.slug),
            variants,
            |name, slug, variants| {
                let mut product = Self {
                    id,
                    name,
                    slug: slug.clone(),
                    status: ProductStatus::Draft,
                    cover_image_url: None,
                    variants,
                    images: Vec::new(),
                    audit: AuditInfo::default(),
                    events: DomainEvents::default(),
                };
                product.events.raise(ProductCreated {
                    product_id: id,
                    slug,
                });
                product
            },
        )
    }

    /// Moves the product to `status`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for an illegal transition.
    pub fn change_status(mut self, status: ProductStatus) -> Fin<Self> {
        let from = self.status;
        self.status = from.transition_to(status)?;
        self.events.raise(ProductStatusChanged {
            product_id: self.id,
            from: from.to_string(),
            to: status.to_string(),
        });
        Ok(self)
    }

    /// Looks up a loaded variant.
    pub fn variant(&self, variant_id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.id == variant_id)
    }
}

impl Entity for Product {
    type Id = Uuid;
    const NAME: &'static str = "Product";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }

    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        Some(&mut self.events)
    }

    fn clear_navigations(&mut self) {
        self.variants.clear();
        self.images.clear();
    }
}

fn validate_slug(slug: &str) -> Fin<String> {
    let slug = required(slug, "Product slug is required.")?;
    if slug
        .chars()
        .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-')
    {
        Ok(slug)
    } else {
        fail(ErrorInfo::validation(format!(
            "Product slug '{slug}' may only contain lowercase letters, digits and '-'."
        )))
    }
}

fn validate_variants(product_id: Uuid, variants: Vec<NewVariant>) -> Fin<Vec<Variant>> {
    if variants.is_empty() {
        return fail(ErrorInfo::validation("A product needs at least one variant."));
    }
    let checked: Vec<Fin<Variant>> = variants
        .into_iter()
        .map(|variant| {
            let price = if variant.price > Decimal::ZERO {
                Ok(variant.price)
            } else {
                fail(ErrorInfo::validation(format!(
                    "Price of '{}' must be greater than zero.",
                    variant.sku
                )))
            };
            accumulate3(
                required(&variant.sku, "Variant SKU is required."),
                required(&variant.name, "Variant name is required."),
                price,
                |sku, name, price| Variant {
                    id: Uuid::new_v4(),
                    product_id,
                    sku,
                    name,
                    price,
                },
            )
        })
        .collect();

    let failures = accumulate(
        checked
            .iter()
            .map(|variant| variant.as_ref().map(|_| ()).map_err(Clone::clone)),
    );
    failures.map(|()| checked.into_iter().flatten().collect())
}
