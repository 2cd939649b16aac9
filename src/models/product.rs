use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Product types accepted by the catalog.
pub const PRODUCT_TYPES: &[&str] = &[
    // Tops
    "Top", "T-Shirt", "Shirt", "Blouse", "Tank Top", "Camisole", "Crop Top", "Tube Top",
    "Halter Top", "Off-Shoulder Top", "Bodysuit", "Corset", "Bustier",
    // Bottoms
    "Bottom", "Pants", "Jeans", "Trousers", "Leggings", "Shorts", "Skirt", "Mini Skirt",
    "Midi Skirt", "Maxi Skirt", "A-Line Skirt", "Pencil Skirt", "Pleated Skirt",
    // Dresses & one-pieces
    "Dress", "Maxi Dress", "Mini Dress", "Midi Dress", "Cocktail Dress", "Evening Gown",
    "Sundress", "Wrap Dress", "Shift Dress", "A-Line Dress", "Bodycon Dress", "Jumpsuit",
    "Romper", "Playsuit",
    // Outerwear
    "Jacket", "Blazer", "Coat", "Trench Coat", "Overcoat", "Parka", "Bomber Jacket",
    "Denim Jacket", "Leather Jacket", "Cardigan", "Sweater", "Hoodie", "Sweatshirt", "Poncho",
    "Cape", "Vest", "Waistcoat",
    // Footwear
    "Shoe", "Sneakers", "Athletic Shoes", "Running Shoes", "Basketball Shoes", "Tennis Shoes",
    "Boots", "Ankle Boots", "Knee-High Boots", "Combat Boots", "Chelsea Boots", "Riding Boots",
    "Heels", "Stilettos", "Wedges", "Platform Shoes", "Flats", "Ballet Flats", "Loafers",
    "Oxfords", "Moccasins", "Sandals", "Flip Flops", "Slides", "Clogs", "Espadrilles",
    "Mary Janes", "Pumps", "Mules", "Slip-Ons",
    // Bags
    "Bag", "Handbag", "Purse", "Clutch", "Tote Bag", "Shoulder Bag", "Crossbody Bag",
    "Backpack", "Messenger Bag", "Satchel", "Hobo Bag", "Bucket Bag", "Fanny Pack", "Belt Bag",
    "Evening Bag", "Travel Bag", "Duffle Bag", "Laptop Bag",
    // Accessories
    "Accessory", "Belt", "Scarf", "Shawl", "Hat", "Cap", "Beanie", "Fedora", "Beret",
    "Headband", "Hair Clip", "Hair Tie", "Sunglasses", "Eyeglasses", "Watch", "Bracelet",
    "Necklace", "Earrings", "Ring", "Brooch", "Pin", "Cufflinks", "Tie", "Bow Tie",
    "Pocket Square", "Gloves", "Mittens", "Socks", "Stockings", "Tights", "Pantyhose",
    // Undergarments & intimates
    "Bra", "Sports Bra", "Bralette", "Underwear", "Panties", "Briefs", "Boxers", "Boxer Briefs",
    "Thong", "Lingerie", "Teddy", "Babydoll", "Chemise", "Slip", "Undershirt", "Shapewear",
    "Garter", "Hosiery",
    // Activewear & swim
    "Activewear", "Athletic Top", "Workout Shirt", "Yoga Pants", "Athletic Shorts",
    "Track Pants", "Sweatpants", "Joggers", "Compression Wear", "Swimwear", "Bikini",
    "One-Piece Swimsuit", "Swim Shorts", "Rashguard", "Wetsuit",
    // Sleepwear & loungewear
    "Sleepwear", "Pajamas", "Nightgown", "Robe", "Bathrobe", "Loungewear", "Sleep Shirt",
    "Sleep Shorts", "Onesie", "Nightshirt",
    // Formal
    "Formal Wear", "Tuxedo", "Suit", "Dress Shirt", "Formal Dress", "Wedding Dress",
    "Bridesmaid Dress", "Prom Dress",
    // Traditional
    "Traditional Wear", "Ethnic Wear", "Kimono", "Sari", "Lehenga", "Salwar Kameez", "Kurta",
    "Kaftan", "Dashiki", "Serape",
    // Maternity & baby
    "Maternity Wear", "Maternity Top", "Maternity Bottom", "Maternity Dress", "Nursing Bra",
    "Baby Wear", "Baby Romper", "Baby Dress", "Baby Shoes",
    "Other",
];

pub const MAX_TAGS: usize = 20;
pub const MAX_COLORS: usize = 10;
pub const MAX_SIZES: usize = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
    Unisex,
    Kids,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
pub enum AgeGroup {
    Adult,
    Teen,
    Child,
    Infant,
}

/// A descriptive feature of a product, usually produced by image analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProductAttribute {
    #[garde(length(max = 50))]
    #[serde(default)]
    pub name: Option<String>,

    #[garde(length(max = 100))]
    #[serde(default)]
    pub value: Option<String>,

    #[garde(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProductImage {
    #[garde(length(min = 1))]
    pub url: String,

    #[garde(length(max = 200))]
    #[serde(default)]
    pub alt: Option<String>,

    #[garde(skip)]
    #[serde(default, rename = "isPrimary", alias = "is_primary")]
    pub is_primary: bool,
}

/// A persisted catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub product_type: String,
    pub category: String,
    pub subcategory: String,
    pub gender: Gender,
    pub target_age_group: AgeGroup,
    pub description: String,
    pub tags: Vec<String>,
    pub brand: Option<String>,
    pub collection: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub attributes: Vec<ProductAttribute>,
    pub price: Option<f64>,
    pub stock: i32,
    pub images: Vec<ProductImage>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
    }
}

/// Payload for creating or fully replacing a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[garde(length(min = 2, max = 150))]
    pub name: String,

    #[garde(custom(validate_product_type))]
    pub product_type: String,

    #[garde(length(min = 1))]
    pub category: String,

    #[garde(length(min = 1, max = 50))]
    pub subcategory: String,

    #[garde(skip)]
    pub gender: Gender,

    #[garde(skip)]
    pub target_age_group: AgeGroup,

    #[garde(length(min = 10, max = 1000))]
    pub description: String,

    #[garde(length(max = 20))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[garde(length(max = 50))]
    #[serde(default)]
    pub brand: Option<String>,

    #[garde(length(max = 100))]
    #[serde(default)]
    pub collection: Option<String>,

    #[garde(length(max = 10))]
    #[serde(default)]
    pub colors: Vec<String>,

    #[garde(length(max = 15))]
    #[serde(default)]
    pub sizes: Vec<String>,

    #[garde(dive)]
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,

    #[garde(range(min = 0.0))]
    #[serde(default)]
    pub price: Option<f64>,

    #[garde(range(min = 0))]
    #[serde(default)]
    pub stock: i32,

    #[garde(dive)]
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl NewProduct {
    /// Trim free-text fields and enforce a single primary image.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.subcategory = self.subcategory.trim().to_string();
        self.description = self.description.trim().to_string();
        for field in [&mut self.brand, &mut self.collection] {
            if let Some(value) = field.as_mut() {
                *value = value.trim().to_string();
            }
        }
        normalize_primary_image(&mut self.images);
    }
}

fn validate_product_type(value: &str, _context: &()) -> garde::Result {
    if PRODUCT_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(garde::Error::new(format!("invalid product type '{value}'")))
    }
}

/// Exactly one image is primary whenever the list is non-empty: the first
/// one already marked primary, or the first image if none is.
pub fn normalize_primary_image(images: &mut [ProductImage]) {
    let primary = images.iter().position(|img| img.is_primary).unwrap_or(0);
    for (idx, img) in images.iter_mut().enumerate() {
        img.is_primary = idx == primary;
    }
}

/// Query-string filters for product listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(rename = "minPrice", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(rename = "maxPrice", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl ProductFilter {
    pub fn by_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn by_brand(brand: impl Into<String>) -> Self {
        Self {
            brand: Some(brand.into()),
            ..Self::default()
        }
    }
}

/// Aggregate figures across the whole catalog.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductOverview {
    pub total_products: i64,
    pub total_value: f64,
    pub avg_price: f64,
    pub total_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub count: i64,
    pub avg_price: f64,
    pub total_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub overview: ProductOverview,
    pub category_breakdown: Vec<CategoryStats>,
}
