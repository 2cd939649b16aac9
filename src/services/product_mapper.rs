use std::str::FromStr;

use serde_json::Value;

use crate::models::analysis::{split_tags, ProductOverrides, StructuredRecord, TagsInput};
use crate::models::product::{
    AgeGroup, Gender, NewProduct, ProductAttribute, ProductImage, MAX_COLORS, MAX_SIZES,
};

/// Name given to products when neither the caller nor the model supplies one.
pub const PLACEHOLDER_NAME: &str = "Analyzed Product";

const PRODUCTS: &str = "products";

/// Product fields resolved from an analysis and caller overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub product_type: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub gender: Option<String>,
    pub target_age_group: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub brand: Option<String>,
    pub collection: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub attributes: Vec<ProductAttribute>,
    pub price: f64,
    pub stock: i32,
    pub images: Vec<ProductImage>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty_list(value: &Option<Vec<String>>) -> Option<Vec<String>> {
    value.as_ref().filter(|items| !items.is_empty()).cloned()
}

/// Override first, then the first `products` entry carrying the field.
fn resolve(overridden: &Option<String>, record: &StructuredRecord, field: &str) -> Option<String> {
    non_empty(overridden).or_else(|| {
        record
            .first_str(PRODUCTS, field)
            .map(|value| value.trim().to_string())
    })
}

fn tags_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(joined) => split_tags(joined),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Tags from the first `products` entry whose `tags` yields any.
fn record_tags(record: &StructuredRecord) -> Vec<String> {
    record
        .entries(PRODUCTS)
        .iter()
        .filter_map(|entry| entry.get("tags"))
        .map(tags_from_value)
        .find(|tags| !tags.is_empty())
        .unwrap_or_default()
}

/// `name` of every entry in a category, deduplicated and capped.
fn record_names(record: &StructuredRecord, category: &str, cap: usize) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in record
        .entries(category)
        .iter()
        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names.truncate(cap);
    names
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn confidence_score(value: Option<&Value>) -> f64 {
    let score = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    score
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

/// Every object entry under `attributes`, with scalar fields coerced to
/// the attribute's types.
fn record_attributes(record: &StructuredRecord) -> Vec<ProductAttribute> {
    record
        .entries("attributes")
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| ProductAttribute {
            name: scalar_text(entry.get("name")),
            value: scalar_text(entry.get("value")),
            confidence_score: confidence_score(entry.get("confidence_score")),
        })
        .collect()
}

/// Images in input order; the first one is primary.
pub fn images_from_urls(image_urls: &[String]) -> Vec<ProductImage> {
    image_urls
        .iter()
        .enumerate()
        .map(|(idx, url)| ProductImage {
            url: url.clone(),
            alt: Some(format!("Product image {}", idx + 1)),
            is_primary: idx == 0,
        })
        .collect()
}

/// Fold an analysis into a product draft. Caller overrides win over
/// AI-derived values; unset required text fields stay `None`.
pub fn map_product_draft(
    record: &StructuredRecord,
    overrides: &ProductOverrides,
    image_urls: &[String],
) -> ProductDraft {
    let tags = overrides
        .tags()
        .cloned()
        .map(TagsInput::into_tags)
        .unwrap_or_else(|| record_tags(record));

    let brand = non_empty(&overrides.brand).or_else(|| {
        record
            .first_str("brands", "name")
            .map(|b| b.trim().to_string())
    });
    let collection = non_empty(&overrides.collection).or_else(|| {
        record
            .first_str("collections", "name")
            .map(|c| c.trim().to_string())
    });

    let attributes = overrides
        .attributes
        .as_ref()
        .filter(|attrs| !attrs.is_empty())
        .cloned()
        .unwrap_or_else(|| record_attributes(record));

    ProductDraft {
        name: resolve(&overrides.name, record, "name")
            .unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
        product_type: resolve(&overrides.product_type, record, "product_type"),
        category: resolve(&overrides.category, record, "category"),
        subcategory: resolve(&overrides.subcategory, record, "subcategory"),
        gender: resolve(&overrides.gender, record, "gender"),
        target_age_group: resolve(&overrides.target_age_group, record, "target_age_group"),
        description: resolve(&overrides.description, record, "description"),
        tags,
        brand,
        collection,
        colors: non_empty_list(&overrides.colors)
            .unwrap_or_else(|| record_names(record, "colors", MAX_COLORS)),
        sizes: non_empty_list(&overrides.sizes)
            .unwrap_or_else(|| record_names(record, "sizes", MAX_SIZES)),
        attributes,
        price: overrides.price.unwrap_or(0.0),
        stock: overrides.stock.unwrap_or(0),
        images: images_from_urls(image_urls),
    }
}

impl ProductDraft {
    /// Convert into a persistable product, listing every missing or
    /// unrecognized required field.
    pub fn into_new_product(self) -> Result<NewProduct, Vec<String>> {
        let mut problems = Vec::new();

        let mut required = |field: &str, value: Option<String>| {
            value.unwrap_or_else(|| {
                problems.push(format!("{field}: could not be determined from the images"));
                String::new()
            })
        };
        let product_type = required("product_type", self.product_type);
        let category = required("category", self.category);
        let subcategory = required("subcategory", self.subcategory);
        let description = required("description", self.description);
        let gender_raw = required("gender", self.gender);
        let age_raw = required("target_age_group", self.target_age_group);

        let gender = Gender::from_str(&gender_raw).ok();
        if gender.is_none() && !gender_raw.is_empty() {
            problems.push(format!("gender: unrecognized value '{gender_raw}'"));
        }
        let target_age_group = AgeGroup::from_str(&age_raw).ok();
        if target_age_group.is_none() && !age_raw.is_empty() {
            problems.push(format!("target_age_group: unrecognized value '{age_raw}'"));
        }

        match (gender, target_age_group) {
            (Some(gender), Some(target_age_group)) if problems.is_empty() => Ok(NewProduct {
                name: self.name,
                product_type,
                category,
                subcategory,
                gender,
                target_age_group,
                description,
                tags: self.tags,
                brand: self.brand,
                collection: self.collection,
                colors: self.colors,
                sizes: self.sizes,
                attributes: self.attributes,
                price: Some(self.price),
                stock: self.stock,
                images: self.images,
            }),
            _ => Err(problems),
        }
    }
}
