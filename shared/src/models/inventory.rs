//! Inventory Model: categories, products and variants

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{double_option, non_negative};

/// Photo URLs allowed per product or variant
pub const MAX_PHOTOS: usize = 10;
/// Default size of the top-products list in the inventory summary
pub const TOP_PRODUCTS_LIMIT: i64 = 5;

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub descriptor: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub descriptor: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub descriptor: Option<String>,
}

/// Category descriptors are compared trimmed and lowercased.
pub fn normalize_category_descriptor(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub description: Option<String>,
    pub photos: Vec<String>,
    pub category_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Present on detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<Variant>>,
}

/// Variant entity (a purchasable SKU)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub business_id: String,
    pub product_id: String,
    /// `"{product name} - {code}"`
    pub name: String,
    pub code: String,
    pub sku: String,
    pub photos: Vec<String>,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub currency: String,
    pub stock_quantity: i32,
    pub stock_quantity_alert: i32,
    pub stock_status: StockStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

fn photo_limit(photos: &Vec<String>) -> Result<(), ValidationError> {
    if photos.len() > MAX_PHOTOS {
        return Err(ValidationError::new("too_many_photos")
            .with_message(format!("at most {MAX_PHOTOS} photos are allowed").into()));
    }
    Ok(())
}

/// Variant payload used when creating a product together with its variants
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantInput {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    /// Generated when empty
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "photo_limit"))]
    pub photos: Vec<String>,
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub sale_price: Decimal,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[validate(range(min = 0))]
    pub stock_quantity_alert: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "photo_limit"))]
    pub photos: Vec<String>,
    #[validate(length(min = 1))]
    pub category_id: String,
    #[validate(length(min = 1), nested)]
    pub variants: Vec<ProductVariantInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[validate(custom(function = "photo_limit"))]
    pub photos: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub category_id: Option<String>,
}

/// Add a variant to an existing product
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantCreate {
    #[serde(flatten)]
    #[validate(nested)]
    pub variant: ProductVariantInput,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantUpdate {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(custom(function = "photo_limit"))]
    pub photos: Option<Vec<String>>,
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub sale_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub stock_quantity_alert: Option<i32>,
}

text_enum! {
    pub enum StockStatus {
        InStock => "in_stock",
        LowStock => "low_stock",
        OutOfStock => "out_of_stock",
    }
}

impl StockStatus {
    pub fn classify(quantity: i32, alert: i32) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= alert {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category_id: Option<String>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantFilter {
    pub product_id: Option<String>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product: Product,
    pub inventory_value: Decimal,
}

/// GET .../inventory/summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub products_count: i64,
    pub variants_count: i64,
    pub low_stock_variants_count: i64,
    pub out_of_stock_variants_count: i64,
    pub total_stock_units: i64,
    /// Σ cost price × stock quantity
    pub inventory_value: Decimal,
    pub currency: String,
    pub top_products_by_inventory_value: Vec<TopProduct>,
}

/// Display name of a variant
pub fn variant_name(product_name: &str, code: &str) -> String {
    format!("{product_name} - {code}")
}

/// First three ASCII alphanumerics of `source`, uppercased, padded with `X`.
pub fn sku_segment(source: &str) -> String {
    let mut segment: String = source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while segment.len() < 3 {
        segment.push('X');
    }
    segment
}

/// `BUS-PRO-VAR-NNNN` where the last segment is random digits.
pub fn generate_sku(business_descriptor: &str, product_name: &str, variant_code: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        sku_segment(business_descriptor),
        sku_segment(product_name),
        sku_segment(variant_code),
        crate::util::random_digits(4)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(3, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::classify(1, 0), StockStatus::InStock);
    }

    #[test]
    fn test_sku_generation() {
        assert_eq!(sku_segment("my-shop"), "MYS");
        assert_eq!(sku_segment("T"), "TXX");
        assert_eq!(sku_segment(""), "XXX");
        let sku = generate_sku("acme", "Blue T-Shirt", "xl");
        assert!(sku.starts_with("ACM-BLU-XLX-"), "{sku}");
        assert_eq!(sku.len(), "ACM-BLU-XLX-".len() + 4);
    }

    #[test]
    fn test_variant_name_and_descriptor() {
        assert_eq!(variant_name("Hoodie", "M"), "Hoodie - M");
        assert_eq!(normalize_category_descriptor("  Summer-Wear "), "summer-wear");
    }

    #[test]
    fn test_product_create_validation() {
        let no_variants: ProductCreate =
            serde_json::from_str(r#"{"name":"Hoodie","categoryId":"cat_1","variants":[]}"#).unwrap();
        assert!(no_variants.validate().is_err());

        let bad_variant: ProductCreate = serde_json::from_str(
            r#"{"name":"Hoodie","categoryId":"cat_1","variants":[
                {"code":"M","costPrice":"10","salePrice":"-1","stockQuantity":-2,"stockQuantityAlert":1}
            ]}"#,
        )
        .unwrap();
        assert!(bad_variant.validate().is_err());

        let photos: Vec<String> = (0..11).map(|i| format!("https://cdn/{i}.jpg")).collect();
        let too_many = ProductCreate {
            name: "Hoodie".into(),
            description: None,
            photos,
            category_id: "cat_1".into(),
            variants: vec![],
        };
        let errors = too_many.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("photos"));
    }

    #[test]
    fn test_variant_create_flattened() {
        let req: VariantCreate = serde_json::from_str(
            r#"{"code":"L","costPrice":"12.50","salePrice":"25","stockQuantity":4,"stockQuantityAlert":2}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.variant.code, "L");
        assert!(req.variant.photos.is_empty());
    }
}
